//! Messages exchanged between entities.

use std::fmt;

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::{clone_trait_object, DynClone};
use serde::ser::Serialize;

use crate::component::Id;

/// Trait implemented by message payloads.
///
/// Implemented automatically for every type which is `Clone`, `Serialize` and `'static`.
pub trait MessageData: Downcast + DynClone + erased_serde::Serialize {}

impl_downcast!(MessageData);

clone_trait_object!(MessageData);

erased_serde::serialize_trait_object!(MessageData);

impl<T: Serialize + DynClone + 'static> MessageData for T {}

/// Message delivered to entities via [`Entity::on_message`](crate::Entity::on_message).
#[derive(Clone)]
pub struct Message {
    /// Identifier of the sending entity.
    pub src: Id,
    /// Time at which the message was sent.
    pub sent_at: f64,
    /// User-defined payload.
    pub data: Box<dyn MessageData>,
}

impl Message {
    /// Renders the payload as JSON, for logging.
    pub fn data_json(&self) -> String {
        serde_json::to_string(&self.data).unwrap_or_else(|_| "<unserializable>".to_string())
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("src", &self.src)
            .field("sent_at", &self.sent_at)
            .field("data", &self.data_json())
            .finish()
    }
}

/// Recipients of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets {
    /// Every registered entity except the sender.
    All,
    /// A single entity, which may be the sender itself.
    One(Id),
    /// The listed entities, except the sender.
    Many(Vec<Id>),
}

/// Matches the message payload against the listed types.
///
/// Fields are bound by reference. Payloads of other types are logged as unhandled.
///
/// ```
/// use serde::Serialize;
/// use qsim::{cast, Message};
///
/// #[derive(Clone, Serialize)]
/// struct Ping {
///     seq: u32,
/// }
///
/// fn on_message(message: &Message) -> u32 {
///     let mut got = 0;
///     cast!(match message.data {
///         Ping { seq } => {
///             got = *seq;
///         }
///     });
///     got
/// }
///
/// let message = Message { src: 0, sent_at: 0., data: Box::new(Ping { seq: 7 }) };
/// assert_eq!(on_message(&message), 7);
/// ```
#[macro_export]
macro_rules! cast {
    ( match $message:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if let Some(__value) = $message.data.downcast_ref::<$type>() {
                #[allow(unused_variables)]
                let $type { $($tt)* } = __value;
                $($expr)*
            } else
        )*
        {
            $crate::log::log_unhandled_message(&$message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Clone, Serialize)]
    struct Job {
        size: u32,
    }

    #[derive(Clone, Serialize)]
    struct Stop {}

    fn classify(message: &Message) -> String {
        let mut result = String::from("other");
        cast!(match message.data {
            Job { size } => {
                result = format!("job {}", size);
            }
            Stop {} => {
                result = String::from("stop");
            }
        });
        result
    }

    #[test]
    fn test_cast() {
        let job = Message {
            src: 1,
            sent_at: 0.,
            data: Box::new(Job { size: 3 }),
        };
        let stop = Message {
            src: 1,
            sent_at: 0.,
            data: Box::new(Stop {}),
        };
        let other = Message {
            src: 1,
            sent_at: 0.,
            data: Box::new(42u8),
        };
        assert_eq!(classify(&job), "job 3");
        assert_eq!(classify(&stop), "stop");
        assert_eq!(classify(&other), "other");
    }

    #[test]
    fn test_clone_and_json() {
        let message = Message {
            src: 2,
            sent_at: 1.5,
            data: Box::new(Job { size: 9 }),
        };
        let copy = message.clone();
        assert_eq!(copy.data_json(), r#"{"size":9}"#);
        assert!(copy.data.is::<Job>());
    }
}
