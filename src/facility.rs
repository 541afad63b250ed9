//! Facility: a resource serving requests for a given duration.
//!
//! Two scheduling disciplines are supported:
//!
//! - [`Discipline::Fcfs`]: first come, first served, with any number of interchangeable servers. Requests which
//!   find all servers busy wait in a FIFO queue.
//! - [`Discipline::Lcfs`]: last come, first served with preemption and resume, single server. An arriving request
//!   preempts the one in service, which goes back to the queue with its remaining service time and resumes once
//!   the server is free again.
//!
//! A request is committed to the facility when its service starts: its renege clauses are cancelled.
//!
//! A cancelled request stays in the FCFS queue until it reaches the head, where it is discarded without being
//! served. At that moment it leaves both the queue statistics and the system statistics, so its residence in each
//! counts up to the discard time. Its service duration is never added to the busy time.
//!
//! Durations must be non-negative and the number of servers positive. These are not checked.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::request::Request;
use crate::state::{current_time, SimulationState};
use crate::stats::Population;
use crate::wait_queue::WaitQueue;

/// Scheduling discipline of a facility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// First come, first served.
    Fcfs,
    /// Last come, first served, preemptive resume.
    Lcfs,
}

pub(crate) struct FacilityState {
    name: String,
    discipline: Discipline,
    servers: usize,
    free: usize,
    free_servers: Vec<bool>,
    current: Option<Request>,
    queue: WaitQueue<Request>,
    stats: Population,
    busy_duration: f64,
    sim_state: Weak<RefCell<SimulationState>>,
}

/// Handle to a facility. Clones refer to the same facility.
#[derive(Clone)]
pub struct Facility {
    inner: Rc<RefCell<FacilityState>>,
}

impl Facility {
    pub(crate) fn new(
        name: &str,
        discipline: Discipline,
        servers: usize,
        sim_state: Weak<RefCell<SimulationState>>,
    ) -> Self {
        let servers = match discipline {
            Discipline::Fcfs => servers,
            Discipline::Lcfs => 1,
        };
        Self {
            inner: Rc::new(RefCell::new(FacilityState {
                name: name.to_string(),
                discipline,
                servers,
                free: servers,
                free_servers: vec![true; servers],
                current: None,
                queue: WaitQueue::new(),
                stats: Population::new(),
                busy_duration: 0.,
                sim_state,
            })),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<FacilityState>>) -> Self {
        Self { inner }
    }

    /// Returns the facility name.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns the scheduling discipline.
    pub fn discipline(&self) -> Discipline {
        self.inner.borrow().discipline
    }

    /// Returns the number of servers.
    pub fn servers(&self) -> usize {
        self.inner.borrow().servers
    }

    /// Returns the number of idle servers.
    pub fn free(&self) -> usize {
        let inner = self.inner.borrow();
        match inner.discipline {
            Discipline::Fcfs => inner.free,
            Discipline::Lcfs => usize::from(inner.current.is_none()),
        }
    }

    /// Returns the number of requests currently in service.
    pub fn in_service(&self) -> usize {
        self.servers() - self.free()
    }

    /// Returns the number of requests waiting in the queue, including preempted ones.
    pub fn queue_len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Returns statistics of requests present at the facility (waiting or in service).
    pub fn system_stats(&self) -> Population {
        self.inner.borrow().stats.clone()
    }

    /// Returns statistics of the wait queue.
    pub fn queue_stats(&self) -> Population {
        self.inner.borrow().queue.stats().clone()
    }

    /// Returns the cumulative busy time of all servers.
    pub fn usage(&self) -> f64 {
        self.inner.borrow().busy_duration
    }

    /// Clears statistics and drops waiting requests.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.queue.reset();
        inner.stats.reset();
        inner.busy_duration = 0.;
    }

    /// Closes open statistics intervals at `timestamp`.
    pub fn finalize(&self, timestamp: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.stats.finalize(timestamp);
        inner.queue.finalize(timestamp);
    }

    /// Asks for service of `duration` for the request.
    pub(crate) fn use_facility(&self, duration: f64, request: Request) {
        match self.discipline() {
            Discipline::Fcfs => self.use_fcfs(duration, request),
            Discipline::Lcfs => self.use_lcfs(duration, request),
        }
    }

    /// Finishes service of the request and delivers it to its owner.
    pub(crate) fn complete(&self, request: &Request) {
        match self.discipline() {
            Discipline::Fcfs => self.complete_fcfs(request),
            Discipline::Lcfs => self.complete_lcfs(request),
        }
    }

    fn now(&self) -> f64 {
        let sim_state = self.inner.borrow().sim_state.clone();
        current_time(&sim_state).unwrap_or(0.)
    }

    fn use_fcfs(&self, duration: f64, request: Request) {
        let now = self.now();
        request.set_duration(duration);
        {
            let mut inner = self.inner.borrow_mut();
            inner.stats.enter(now);
            inner.queue.push(request, now);
        }
        self.schedule_fcfs(now);
    }

    fn schedule_fcfs(&self, now: f64) {
        loop {
            let (request, server) = {
                let mut inner = self.inner.borrow_mut();
                let Some(server) = inner.free_servers.iter().position(|free| *free) else {
                    break;
                };
                let Some(request) = inner.queue.shift(now) else {
                    break;
                };
                if !request.is_pending() {
                    // reneged while waiting, leaves without being served
                    inner.stats.leave(request.scheduled_at(), now);
                    continue;
                }
                inner.free_servers[server] = false;
                inner.free -= 1;
                inner.busy_duration += request.duration();
                (request, server)
            };
            log::trace!(
                target: "qsim",
                "[{:.3}] facility {}: request {} starts on server {}",
                now,
                self.name(),
                request.id(),
                server
            );
            request.cancel_renege_clauses();
            let duration = request.duration();
            request.begin_service(Rc::downgrade(&self.inner), Some(server), duration, now);
            request.schedule_at(now + duration);
        }
    }

    fn complete_fcfs(&self, request: &Request) {
        let now = self.now();
        {
            let mut inner = self.inner.borrow_mut();
            inner.free += 1;
            if let Some(server) = request.server() {
                inner.free_servers[server] = true;
            }
            inner.stats.leave(request.scheduled_at(), request.deliver_at());
        }
        request.deliver();
        self.schedule_fcfs(now);
    }

    fn use_lcfs(&self, duration: f64, request: Request) {
        let now = self.now();
        let first_time = !request.in_service();
        {
            let mut inner = self.inner.borrow_mut();
            if let Some(current) = inner.current.take() {
                inner.busy_duration += now - current.last_issued();
                current.set_remaining(current.deliver_at() - now);
                log::trace!(
                    target: "qsim",
                    "[{:.3}] facility {}: request {} preempted, {} remaining",
                    now,
                    inner.name,
                    current.id(),
                    current.deliver_at() - now
                );
                inner.queue.push(current, now);
            }
            inner.current = Some(request.clone());
            if first_time {
                inner.stats.enter(now);
            }
        }
        if first_time {
            request.cancel_renege_clauses();
            request.set_duration(duration);
            request.begin_service(Rc::downgrade(&self.inner), None, duration, now);
        }
        request.set_last_issued(now);
        request.schedule_at(now + duration);
    }

    fn complete_lcfs(&self, request: &Request) {
        let now = self.now();
        {
            let mut inner = self.inner.borrow_mut();
            // a preempted request leaves its old entry behind in the simulation queue
            match inner.current.as_ref() {
                Some(current) if current.ptr_eq(request) => {}
                _ => return,
            }
            inner.current = None;
            inner.busy_duration += now - request.last_issued();
            inner.stats.leave(request.scheduled_at(), now);
        }
        request.deliver();
        let next = {
            let mut inner = self.inner.borrow_mut();
            inner.queue.pop(now)
        };
        if let Some(next) = next {
            let remaining = next.remaining();
            self.use_lcfs(remaining, next);
        }
    }
}
