//! Simulation entities.

use crate::buffer::Buffer;
use crate::context::SimulationContext;
use crate::event::Event;
use crate::facility::Facility;
use crate::message::{Message, MessageData, Targets};
use crate::request::Request;

/// Trait implemented by simulation entities.
///
/// The simulation calls [`start`](Entity::start) on every entity when it starts, in registration order, and
/// [`finalize`](Entity::finalize) once it stops. Messages sent to the entity arrive via
/// [`on_message`](Entity::on_message).
pub trait Entity {
    /// Called once at simulation start. Typically schedules the first requests of the entity.
    fn start(&mut self);

    /// Called when a message sent to this entity is delivered. Ignores messages by default.
    fn on_message(&mut self, message: &Message) {
        let _ = message;
    }

    /// Called once after the simulation stops.
    fn finalize(&mut self) {}
}

/// Scheduling operations available to entities.
///
/// Implementors only provide [`context`](SimulationOps::context), every operation has a default implementation
/// delegating to the context. Each operation can be overridden on its own, the remaining ones keep their defaults.
///
/// ```
/// use qsim::{Entity, Request, Simulation, SimulationContext, SimulationOps};
///
/// struct Clock {
///     ctx: SimulationContext,
///     ticks: u32,
/// }
///
/// impl SimulationOps for Clock {
///     fn context(&self) -> &SimulationContext {
///         &self.ctx
///     }
///
///     // all timers of this entity are twice as long
///     fn set_timer(&self, duration: f64) -> Request {
///         self.ctx.set_timer(duration * 2.)
///     }
/// }
///
/// impl Entity for Clock {
///     fn start(&mut self) {
///         let request = self.set_timer(1.);
///         assert_eq!(request.deliver_at(), 2.);
///         self.ticks = self.time() as u32;
///     }
/// }
///
/// let mut sim = Simulation::new(0);
/// let ctx = sim.create_context("clock");
/// let clock = std::rc::Rc::new(std::cell::RefCell::new(Clock { ctx, ticks: 1 }));
/// sim.add_entity("clock", clock.clone()).unwrap();
/// sim.simulate(10.).unwrap();
/// assert_eq!(clock.borrow().ticks, 0);
/// ```
pub trait SimulationOps {
    /// Returns the context of the entity.
    fn context(&self) -> &SimulationContext;

    /// Returns the current simulation time.
    fn time(&self) -> f64 {
        self.context().time()
    }

    /// See [`SimulationContext::set_timer`].
    fn set_timer(&self, duration: f64) -> Request {
        self.context().set_timer(duration)
    }

    /// See [`SimulationContext::wait_event`].
    fn wait_event(&self, event: &Event) -> Request {
        self.context().wait_event(event)
    }

    /// See [`SimulationContext::queue_event`].
    fn queue_event(&self, event: &Event) -> Request {
        self.context().queue_event(event)
    }

    /// See [`SimulationContext::use_facility`].
    fn use_facility(&self, facility: &Facility, duration: f64) -> Request {
        self.context().use_facility(facility, duration)
    }

    /// See [`SimulationContext::put_buffer`].
    fn put_buffer(&self, buffer: &Buffer, amount: f64) -> Request {
        self.context().put_buffer(buffer, amount)
    }

    /// See [`SimulationContext::get_buffer`].
    fn get_buffer(&self, buffer: &Buffer, amount: f64) -> Request {
        self.context().get_buffer(buffer, amount)
    }

    /// See [`SimulationContext::send`].
    fn send<T: MessageData>(&self, data: T, delay: f64, targets: Targets) -> Request {
        self.context().send(data, delay, targets)
    }
}
