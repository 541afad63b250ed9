//! Buffer: a bounded store of some quantity.
//!
//! Entities put amounts into the buffer and get amounts out of it. A put which would exceed the capacity, or a get
//! asking for more than is available, blocks until enough space or quantity appears. Each direction has its own
//! FIFO queue served strictly in arrival order: a blocked request at the head holds back all requests behind it,
//! even those which could be satisfied right away.
//!
//! Capacity and amounts must be non-negative. These are not checked.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::request::Request;
use crate::state::{current_time, SimulationState};
use crate::stats::Population;
use crate::wait_queue::WaitQueue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Put,
    Get,
}

pub(crate) struct BufferState {
    name: String,
    capacity: f64,
    available: f64,
    put_queue: WaitQueue<Request>,
    get_queue: WaitQueue<Request>,
    sim_state: Weak<RefCell<SimulationState>>,
}

impl BufferState {
    fn queue(&mut self, direction: Direction) -> &mut WaitQueue<Request> {
        match direction {
            Direction::Put => &mut self.put_queue,
            Direction::Get => &mut self.get_queue,
        }
    }

    fn fits(&self, direction: Direction, amount: f64) -> bool {
        match direction {
            Direction::Put => amount + self.available <= self.capacity,
            Direction::Get => amount <= self.available,
        }
    }

    fn apply(&mut self, direction: Direction, amount: f64) {
        match direction {
            Direction::Put => self.available += amount,
            Direction::Get => self.available -= amount,
        }
    }
}

/// Handle to a buffer. Clones refer to the same buffer.
#[derive(Clone)]
pub struct Buffer {
    inner: Rc<RefCell<BufferState>>,
}

impl Buffer {
    pub(crate) fn new(name: &str, capacity: f64, initial: f64, sim_state: Weak<RefCell<SimulationState>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BufferState {
                name: name.to_string(),
                capacity,
                available: initial,
                put_queue: WaitQueue::new(),
                get_queue: WaitQueue::new(),
                sim_state,
            })),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<BufferState>>) -> Self {
        Self { inner }
    }

    /// Returns the buffer name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns the quantity currently stored.
    pub fn current(&self) -> f64 {
        self.inner.borrow().available
    }

    /// Returns the capacity.
    pub fn size(&self) -> f64 {
        self.inner.borrow().capacity
    }

    /// Returns the number of blocked put requests.
    pub fn put_queue_len(&self) -> usize {
        self.inner.borrow().put_queue.len()
    }

    /// Returns the number of blocked get requests.
    pub fn get_queue_len(&self) -> usize {
        self.inner.borrow().get_queue.len()
    }

    /// Returns statistics of the put queue.
    pub fn put_stats(&self) -> Population {
        self.inner.borrow().put_queue.stats().clone()
    }

    /// Returns statistics of the get queue.
    pub fn get_stats(&self) -> Population {
        self.inner.borrow().get_queue.stats().clone()
    }

    /// Clears statistics and drops blocked requests. The stored quantity is kept.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.put_queue.reset();
        inner.get_queue.reset();
    }

    /// Closes open statistics intervals at `timestamp`.
    pub fn finalize(&self, timestamp: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.put_queue.finalize(timestamp);
        inner.get_queue.finalize(timestamp);
    }

    pub(crate) fn put(&self, amount: f64, request: Request) {
        self.request(Direction::Put, amount, request);
    }

    pub(crate) fn get(&self, amount: f64, request: Request) {
        self.request(Direction::Get, amount, request);
    }

    /// Serves whatever blocked requests can be served now, in both directions.
    ///
    /// Grants in one direction change the stored quantity, so the directions are served in turn until neither
    /// can make progress.
    pub(crate) fn progress(&self) {
        loop {
            let put = self.progress_queue(Direction::Put);
            let get = self.progress_queue(Direction::Get);
            if !put && !get {
                break;
            }
        }
    }

    fn now(&self) -> f64 {
        let sim_state = self.inner.borrow().sim_state.clone();
        current_time(&sim_state).unwrap_or(0.)
    }

    fn request(&self, direction: Direction, amount: f64, request: Request) {
        let now = self.now();
        request.set_amount(amount);
        request.set_buffer(Rc::downgrade(&self.inner));
        let granted = {
            let mut inner = self.inner.borrow_mut();
            if inner.queue(direction).is_empty() && inner.fits(direction, amount) {
                inner.apply(direction, amount);
                inner.queue(direction).passby(now);
                true
            } else {
                inner.queue(direction).push(request.clone(), now);
                false
            }
        };
        if granted {
            request.cancel_renege_clauses();
            request.schedule_at(now);
            self.progress();
        }
    }

    /// Grants blocked requests of one direction in arrival order. Returns `true` if any was granted.
    fn progress_queue(&self, direction: Direction) -> bool {
        let now = self.now();
        let mut granted_any = false;
        loop {
            let granted = {
                let mut inner = self.inner.borrow_mut();
                let Some(head) = inner.queue(direction).top() else {
                    break;
                };
                if !head.is_pending() {
                    inner.queue(direction).shift(now);
                    continue;
                }
                let amount = head.amount();
                if !inner.fits(direction, amount) {
                    break;
                }
                inner.apply(direction, amount);
                inner.queue(direction).shift(now)
            };
            if let Some(request) = granted {
                request.cancel_renege_clauses();
                request.schedule_at(now);
                granted_any = true;
            }
        }
        granted_any
    }
}
