//! Event: a synchronization point between entities.
//!
//! Requests can wait on an event in two ways. Requests in the _wait list_ are all released when the event fires
//! (broadcast), while requests in the _queue_ are released one per firing, in arrival order (exclusive). An event
//! can also be latched when fired: while latched, any new wait completes immediately, until the event is cleared.
//!
//! Released requests are delivered at the firing time, after the currently running callback returns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::request::Request;
use crate::state::{current_time, SimulationState};

pub(crate) struct EventState {
    name: String,
    wait_list: Vec<Request>,
    queue: VecDeque<Request>,
    fired: bool,
    sim_state: Weak<RefCell<SimulationState>>,
}

/// Handle to an event. Clones refer to the same event.
#[derive(Clone)]
pub struct Event {
    inner: Rc<RefCell<EventState>>,
}

impl Event {
    pub(crate) fn new(name: &str, sim_state: Weak<RefCell<SimulationState>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EventState {
                name: name.to_string(),
                wait_list: Vec::new(),
                queue: VecDeque::new(),
                fired: false,
                sim_state,
            })),
        }
    }

    /// Returns the event name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns `true` if the event is latched.
    pub fn is_fired(&self) -> bool {
        self.inner.borrow().fired
    }

    /// Returns the number of requests in the wait list.
    pub fn waiting(&self) -> usize {
        self.inner.borrow().wait_list.len()
    }

    /// Returns the number of requests in the queue.
    pub fn queued(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Fires the event: releases every request in the wait list and the first live request in the queue.
    ///
    /// With `keep_fired`, the event also becomes latched.
    pub fn fire(&self, keep_fired: bool) {
        let (waiters, lucky) = {
            let mut inner = self.inner.borrow_mut();
            if keep_fired {
                inner.fired = true;
            }
            let waiters = std::mem::take(&mut inner.wait_list);
            let mut lucky = None;
            while let Some(request) = inner.queue.pop_front() {
                if request.is_pending() {
                    lucky = Some(request);
                    break;
                }
            }
            (waiters, lucky)
        };
        log::trace!(
            target: "qsim",
            "[{:.3}] event {} fired: {} waiting, {} queued released",
            self.now(),
            self.name(),
            waiters.len(),
            usize::from(lucky.is_some())
        );
        for request in waiters.into_iter().chain(lucky) {
            self.release(request);
        }
    }

    /// Clears the latch, so that new requests wait for the next firing.
    pub fn clear(&self) {
        self.inner.borrow_mut().fired = false;
    }

    pub(crate) fn add_wait_list(&self, request: Request) {
        if self.is_fired() {
            self.release(request);
            return;
        }
        self.inner.borrow_mut().wait_list.push(request);
    }

    pub(crate) fn add_queue(&self, request: Request) {
        if self.is_fired() {
            self.release(request);
            return;
        }
        self.inner.borrow_mut().queue.push_back(request);
    }

    fn now(&self) -> f64 {
        let sim_state = self.inner.borrow().sim_state.clone();
        current_time(&sim_state).unwrap_or(0.)
    }

    fn release(&self, request: Request) {
        if !request.is_pending() {
            return;
        }
        request.cancel_renege_clauses();
        request.schedule_at(self.now());
    }
}
