use std::cell::RefCell;
use std::rc::Weak;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::component::Id;
use crate::event_queue::EventQueue;
use crate::request::{Request, RequestId};

pub(crate) type Logger = Box<dyn Fn(&str)>;

/// State shared by the simulation and all contexts and resources created from it.
pub(crate) struct SimulationState {
    clock: f64,
    queue: EventQueue<Request>,
    rand: Pcg64,
    request_count: RequestId,
    logger: Option<Logger>,
}

impl SimulationState {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            queue: EventQueue::new(),
            rand: Pcg64::seed_from_u64(seed),
            request_count: 0,
            logger: None,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn set_time(&mut self, time: f64) {
        self.clock = time;
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        dist.sample(&mut self.rand)
    }

    pub fn next_request_id(&mut self) -> RequestId {
        let id = self.request_count;
        self.request_count += 1;
        id
    }

    pub fn enqueue(&mut self, time: f64, request: Request) {
        self.queue.enqueue(time, request);
    }

    pub fn dequeue(&mut self) -> Option<(f64, Request)> {
        self.queue.dequeue()
    }

    pub fn peek_time(&self) -> Option<f64> {
        self.queue.peek_time()
    }

    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = Some(logger);
    }

    pub fn log(&self, entity: Option<Id>, message: &str) {
        if let Some(logger) = self.logger.as_ref() {
            logger(&crate::log::format_line(self.clock, entity, message));
        }
    }
}

/// Returns the current time of the simulation behind a weak handle, if it is still alive.
pub(crate) fn current_time(sim_state: &Weak<RefCell<SimulationState>>) -> Option<f64> {
    let sim_state = sim_state.upgrade()?;
    let time = sim_state.borrow().time();
    Some(time)
}
