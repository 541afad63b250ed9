//! qsim is a discrete-event simulation framework for queueing models. It advances a logical clock by delivering
//! time-ordered requests to user-defined entities, and provides resource primitives modeling contention between
//! them: facilities with FCFS or preemptive LCFS service, bounded buffers and synchronization events.
//!
//! ## Basic Concepts
//!
//! **Entity.** An entity is a simulated actor with internal state and behavior, defined by implementing the
//! [`Entity`] trait. Each entity is registered under a unique name and assigned an [`Id`]. The simulation calls
//! [`Entity::start`] when the run begins, [`Entity::on_message`] when a message arrives, and [`Entity::finalize`]
//! when the run is over. Entities access the simulation through a [`SimulationContext`] created with
//! [`Simulation::create_context`].
//!
//! **Request.** Every operation which makes an entity wait (a timer, service at a facility, a buffer put or get,
//! waiting on an event, sending a message) creates a [`Request`]. The entity continues when the request is
//! delivered, by means of the callback registered with [`Request::done`]. There is no real concurrency: "waiting"
//! means returning control to the simulation, which invokes the callback later. A request can be cancelled, and can
//! race against alternative wait conditions (_renege clauses_, see [`Request::wait_until`] and
//! [`Request::unless_event`]): whichever is delivered first wins and the others are cancelled.
//!
//! **Simulation.** [`Simulation`] owns the clock and the queue of pending requests. The run loop repeatedly takes the
//! earliest request, advances the clock to its delivery time and delivers it. Requests due at the same time are
//! delivered in the order they were scheduled.
//!
//! **Resources.**
//!
//! - [`Facility`] serves requests for a given duration with one or more servers. Requests finding all servers busy
//!   wait in a queue. See [`Discipline`] for the supported scheduling disciplines.
//! - [`Buffer`] stores a bounded quantity. Puts and gets block until they can be satisfied, each direction is served
//!   strictly in arrival order.
//! - [`Event`] releases all waiting requests, or one queued request, each time it is fired. It can be latched so
//!   that new waits complete immediately.
//!
//! Resources keep statistics of their queues (see [`stats`]).
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use qsim::{Discipline, Entity, Facility, Simulation, SimulationContext, SimulationOps};
//!
//! struct Customer {
//!     ctx: SimulationContext,
//!     counter: Facility,
//! }
//!
//! impl SimulationOps for Customer {
//!     fn context(&self) -> &SimulationContext {
//!         &self.ctx
//!     }
//! }
//!
//! impl Entity for Customer {
//!     fn start(&mut self) {
//!         for _ in 0..3 {
//!             // Each visit takes 2 time units of service, but the customer leaves after waiting for 3
//!             let ctx = self.ctx.clone();
//!             self.use_facility(&self.counter, 2.)
//!                 .done(move |d| ctx.log(&format!("served at {}", d.time)))
//!                 .wait_until(3., |d| println!("left at {}", d.time));
//!         }
//!     }
//! }
//!
//! let mut sim = Simulation::new(123);
//! let counter = sim.create_facility("counter", Discipline::Fcfs, 1);
//! let customer = Customer { ctx: sim.create_context("customer"), counter: counter.clone() };
//! sim.add_entity("customer", Rc::new(RefCell::new(customer))).unwrap();
//! sim.simulate(100.).unwrap();
//!
//! // The third visit would have started service at time 4
//! assert_eq!(counter.system_stats().duration_series().count(), 3);
//! assert_eq!(counter.usage(), 4.);
//! ```
//!
//! ## Logging
//!
//! Diagnostic output goes through the [log](https://crates.io/crates/log) facade, see the `log_*!` macros in
//! [`log`](crate::log). Independently of it, [`Simulation::set_logger`] installs a sink receiving the lines written
//! via [`SimulationContext::log`], prefixed with the simulation time and the entity id.

#![warn(missing_docs)]

pub mod buffer;
pub mod component;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod facility;
pub mod log;
pub mod message;
pub mod request;
pub mod simulation;
mod state;
pub mod stats;
pub mod wait_queue;

pub use colored;
pub use buffer::Buffer;
pub use component::Id;
pub use config::SimulationConfig;
pub use context::SimulationContext;
pub use entity::{Entity, SimulationOps};
pub use error::SimError;
pub use event::Event;
pub use event_queue::EventQueue;
pub use facility::{Discipline, Facility};
pub use message::{Message, MessageData, Targets};
pub use request::{Delivery, Origin, Request, RequestId, Status};
pub use simulation::{Phase, Simulation};
pub use stats::{DataSeries, Population, TimeSeries};
pub use wait_queue::WaitQueue;
