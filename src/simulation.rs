//! Simulation configuration and execution.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rustc_hash::FxHashMap;

use crate::buffer::Buffer;
use crate::component::Id;
use crate::config::SimulationConfig;
use crate::context::SimulationContext;
use crate::entity::Entity;
use crate::error::SimError;
use crate::event::Event;
use crate::facility::{Discipline, Facility};
use crate::message::{Message, Targets};
use crate::request::{Dispatch, Request};
use crate::state::SimulationState;

/// Lifecycle phase of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Entities can be added, the run has not started.
    Idle,
    /// The run loop is delivering requests.
    Running,
    /// The run is over and entities have been finalized.
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Running => write!(f, "running"),
            Phase::Finalized => write!(f, "finalized"),
        }
    }
}

/// Represents a simulation, provides methods for its configuration and execution.
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    name_to_id: FxHashMap<String, Id>,
    names: Vec<String>,
    entities: Vec<Option<Rc<RefCell<dyn Entity>>>>,
    registration_order: Vec<Id>,
    phase: Phase,
    end_time: f64,
}

impl Simulation {
    /// Creates a new simulation with specified random seed.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            name_to_id: FxHashMap::default(),
            names: Vec::new(),
            entities: Vec::new(),
            registration_order: Vec::new(),
            phase: Phase::Idle,
            end_time: f64::INFINITY,
        }
    }

    /// Creates a new simulation from the config. [`run`](Simulation::run) uses the configured end time.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut sim = Self::new(config.seed);
        sim.end_time = config.end_time();
        sim
    }

    fn register(&mut self, name: &str) -> Id {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.names.len() as Id;
        self.name_to_id.insert(name.to_owned(), id);
        self.names.push(name.to_owned());
        self.entities.push(None);
        id
    }

    /// Returns the identifier of the entity or context by its name.
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the name of the entity or context by its identifier.
    pub fn lookup_name(&self, id: Id) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Creates a new simulation context with specified name.
    ///
    /// Contexts created with the same name share the identifier, so an entity can be given its context before
    /// being added with [`add_entity`](Simulation::add_entity).
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        SimulationContext::new(id, name.as_ref(), self.sim_state.clone())
    }

    /// Registers the entity under the name and returns its identifier.
    ///
    /// Entities can only be added before the run. The entity's [`start`](Entity::start) is called when the run
    /// begins, in registration order.
    pub fn add_entity<S, E>(&mut self, name: S, entity: Rc<RefCell<E>>) -> Result<Id, SimError>
    where
        S: AsRef<str>,
        E: Entity + 'static,
    {
        self.expect_phase(Phase::Idle)?;
        let name = name.as_ref();
        let id = self.register(name);
        let slot = &mut self.entities[id as usize];
        if slot.is_some() {
            return Err(SimError::DuplicateEntity(name.to_owned()));
        }
        let entity: Rc<RefCell<dyn Entity>> = entity;
        *slot = Some(entity);
        self.registration_order.push(id);
        log::debug!(target: "qsim", "added entity {} with id {}", name, id);
        Ok(id)
    }

    /// Creates a facility with the scheduling discipline and number of servers.
    ///
    /// LCFS facilities always have a single server.
    pub fn create_facility(&mut self, name: &str, discipline: Discipline, servers: usize) -> Facility {
        Facility::new(name, discipline, servers, Rc::downgrade(&self.sim_state))
    }

    /// Creates a buffer with the capacity and initially stored quantity.
    pub fn create_buffer(&mut self, name: &str, capacity: f64, initial: f64) -> Buffer {
        Buffer::new(name, capacity, initial, Rc::downgrade(&self.sim_state))
    }

    /// Creates an event.
    pub fn create_event(&mut self, name: &str) -> Event {
        Event::new(name, Rc::downgrade(&self.sim_state))
    }

    /// Sets the sink receiving lines written via [`log`](Simulation::log) and
    /// [`SimulationContext::log`](crate::SimulationContext::log).
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use qsim::Simulation;
    ///
    /// let lines = Rc::new(RefCell::new(Vec::new()));
    /// let mut sim = Simulation::new(0);
    /// let sink = lines.clone();
    /// sim.set_logger(move |line| sink.borrow_mut().push(line.to_string()));
    /// sim.log("hello");
    /// assert_eq!(lines.borrow()[0], "0.000000    hello\n");
    /// ```
    pub fn set_logger<F>(&mut self, logger: F)
    where
        F: Fn(&str) + 'static,
    {
        self.sim_state.borrow_mut().set_logger(Box::new(logger));
    }

    /// Passes a line which does not belong to any entity to the logger.
    pub fn log(&self, message: &str) {
        self.sim_state.borrow().log(None, message);
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in the range _[0, 1)_ using the simulation-wide random number generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random number in the specified range using the simulation-wide random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Returns the number of entries in the simulation queue, including cancelled and stale ones.
    pub fn pending_requests(&self) -> usize {
        self.sim_state.borrow().pending_requests()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Runs the simulation until the configured end time, or until there are no pending requests.
    pub fn run(&mut self) -> Result<(), SimError> {
        self.simulate(self.end_time)
    }

    /// Starts all entities and delivers requests in time order until there are no pending requests or the next
    /// one is due after `end_time`. Then discards the remaining requests and finalizes all entities.
    ///
    /// A simulation can be run only once.
    pub fn simulate(&mut self, end_time: f64) -> Result<(), SimError> {
        self.expect_phase(Phase::Idle)?;
        self.phase = Phase::Running;
        log::debug!(
            target: "qsim",
            "simulation started with {} entities, end time {}",
            self.registration_order.len(),
            end_time
        );

        for id in self.registration_order.clone() {
            if let Some(entity) = self.entity(id) {
                entity.borrow_mut().start();
            }
        }

        let mut delivered = 0u64;
        while let Some((time, request)) = self.next_due(end_time) {
            self.sim_state.borrow_mut().set_time(time);
            // cancelled, or left behind when a facility rescheduled the request
            if !request.is_pending() || request.deliver_at() != time {
                continue;
            }
            self.dispatch(request);
            delivered += 1;
        }

        self.phase = Phase::Finalized;
        let discarded = self.pending_requests();
        self.sim_state.borrow_mut().clear_queue();
        log::debug!(
            target: "qsim",
            "simulation stopped at {:.3} after {} deliveries, {} queued entries discarded",
            self.time(),
            delivered,
            discarded
        );
        for id in self.registration_order.clone() {
            if let Some(entity) = self.entity(id) {
                entity.borrow_mut().finalize();
            }
        }
        Ok(())
    }

    /// Removes the earliest queue entry unless it is due after `end_time`, in which case it stays queued.
    fn next_due(&self, end_time: f64) -> Option<(f64, Request)> {
        let mut sim_state = self.sim_state.borrow_mut();
        match sim_state.peek_time() {
            Some(time) if time <= end_time => sim_state.dequeue(),
            _ => None,
        }
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), SimError> {
        if self.phase != expected {
            return Err(SimError::InvalidPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    fn entity(&self, id: Id) -> Option<Rc<RefCell<dyn Entity>>> {
        self.entities.get(id as usize).and_then(Clone::clone)
    }

    fn dispatch(&self, request: Request) {
        log::trace!(
            target: "qsim",
            "[{:.3}] delivering request {} of {} ({:?})",
            request.deliver_at(),
            request.id(),
            request.owner(),
            request.origin()
        );
        match request.dispatch() {
            Dispatch::Resume => request.deliver(),
            Dispatch::Broadcast(message, targets) => {
                self.broadcast(&message, targets);
                request.deliver();
            }
            Dispatch::Service(facility) => facility.complete(&request),
        }
    }

    fn broadcast(&self, message: &Message, targets: Targets) {
        let recipients: Vec<Id> = match targets {
            Targets::All => self
                .registration_order
                .iter()
                .copied()
                .filter(|id| *id != message.src)
                .collect(),
            Targets::One(id) => vec![id],
            Targets::Many(ids) => ids.into_iter().filter(|id| *id != message.src).collect(),
        };
        for id in recipients {
            match self.entity(id) {
                Some(entity) => {
                    log::trace!(
                        target: "qsim",
                        "[{:.3}] message from {} to {}: {}",
                        self.time(),
                        message.src,
                        id,
                        message.data_json()
                    );
                    entity.borrow_mut().on_message(message);
                }
                None => log::warn!(
                    target: "qsim",
                    "[{:.3}] message from {} to unknown entity {} is dropped: {}",
                    self.time(),
                    message.src,
                    id,
                    message.data_json()
                ),
            }
        }
    }
}
