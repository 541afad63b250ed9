//! Accessing simulation from entities.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::distributions::Distribution;

use crate::buffer::Buffer;
use crate::component::Id;
use crate::event::Event;
use crate::facility::Facility;
use crate::message::{Message, MessageData, Targets};
use crate::request::{Origin, Request};
use crate::state::SimulationState;

/// A facade for accessing the simulation state and scheduling requests from simulation entities.
///
/// Every scheduling operation returns the created [`Request`], which can be used to register the completion
/// callback, add renege clauses or cancel the request.
#[derive(Clone)]
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
}

impl SimulationContext {
    pub(crate) fn new(id: Id, name: &str, sim_state: Rc<RefCell<SimulationState>>) -> Self {
        Self {
            id,
            name: name.to_string(),
            sim_state,
        }
    }

    /// Returns the identifier of the entity associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of the entity associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    ///
    /// ```
    /// use qsim::Simulation;
    ///
    /// let mut sim = Simulation::new(123);
    /// let ctx = sim.create_context("comp");
    /// assert_eq!(ctx.time(), 0.0);
    /// ```
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_ using the simulation-wide random number generator.
    pub fn rand(&self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns a random value from the specified distribution using the simulation-wide random number generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Passes a line to the simulation logger, if one is set.
    pub fn log(&self, message: &str) {
        self.sim_state.borrow().log(Some(self.id), message);
    }

    /// Schedules a request delivered after `duration` time units.
    pub fn set_timer(&self, duration: f64) -> Request {
        let now = self.time();
        let request = self.new_request(now + duration, Origin::Timer);
        request.schedule_at(now + duration);
        request
    }

    /// Waits for `event` to fire. All requests waiting this way are released by a single firing.
    pub fn wait_event(&self, event: &Event) -> Request {
        let request = self.new_request(self.time(), Origin::Event(event.name()));
        event.add_wait_list(request.clone());
        request
    }

    /// Queues on `event`. Each firing releases only the earliest queued request.
    pub fn queue_event(&self, event: &Event) -> Request {
        let request = self.new_request(self.time(), Origin::Event(event.name()));
        event.add_queue(request.clone());
        request
    }

    /// Asks `facility` for service of `duration` time units. The request is delivered when service completes.
    pub fn use_facility(&self, facility: &Facility, duration: f64) -> Request {
        let request = self.new_request(self.time(), Origin::Facility(facility.name()));
        facility.use_facility(duration, request.clone());
        request
    }

    /// Puts `amount` into `buffer`. The request is delivered once there is room for it.
    pub fn put_buffer(&self, buffer: &Buffer, amount: f64) -> Request {
        let request = self.new_request(self.time(), Origin::Buffer(buffer.name()));
        buffer.put(amount, request.clone());
        request
    }

    /// Takes `amount` from `buffer`. The request is delivered once the amount is available.
    pub fn get_buffer(&self, buffer: &Buffer, amount: f64) -> Request {
        let request = self.new_request(self.time(), Origin::Buffer(buffer.name()));
        buffer.get(amount, request.clone());
        request
    }

    /// Sends a message delivered to `targets` after `delay` time units.
    pub fn send<T>(&self, data: T, delay: f64, targets: Targets) -> Request
    where
        T: MessageData,
    {
        let now = self.time();
        let message = Message {
            src: self.id,
            sent_at: now,
            data: Box::new(data),
        };
        let request = self.new_request(now + delay, Origin::Message);
        request.set_broadcast(message, targets);
        request.schedule_at(now + delay);
        request
    }

    fn new_request(&self, deliver_at: f64, origin: Origin) -> Request {
        let (id, now) = {
            let mut sim_state = self.sim_state.borrow_mut();
            (sim_state.next_request_id(), sim_state.time())
        };
        Request::new(Rc::downgrade(&self.sim_state), id, self.id, now, deliver_at, origin)
    }
}
