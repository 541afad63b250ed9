//! Entity identifier.

/// Identifier of a simulation entity (or of a bare simulation context).
///
/// Identifiers are assigned sequentially, starting from zero, in the order the contexts are created.
pub type Id = u32;
