//! Requests: tokens representing scheduled deliveries.
//!
//! Every scheduling operation of [`SimulationContext`](crate::SimulationContext) creates a [`Request`]. The request
//! either goes straight into the simulation queue (timers, messages) or waits inside a resource which schedules it
//! once granted. When the simulation reaches the request's delivery time, the callback registered with
//! [`Request::done`] is invoked, which is how an entity continues after a wait.
//!
//! A request may carry _renege clauses_: alternative wait conditions racing against the main one (see
//! [`Request::wait_until`] and [`Request::unless_event`]). The main request and its clauses form a single choice:
//! whichever is delivered first cancels all the others.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::buffer::{Buffer, BufferState};
use crate::component::Id;
use crate::event::Event;
use crate::facility::{Facility, FacilityState};
use crate::message::{Message, Targets};
use crate::state::{current_time, SimulationState};

/// Request identifier, unique within a simulation.
pub type RequestId = u64;

/// What a request was waiting for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// Timer set via [`set_timer`](crate::SimulationContext::set_timer) or a renege timeout.
    Timer,
    /// Message sent via [`send`](crate::SimulationContext::send).
    Message,
    /// Service at the named facility.
    Facility(String),
    /// Put or get at the named buffer.
    Buffer(String),
    /// Wait or queue on the named event.
    Event(String),
}

/// Lifecycle status of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Waiting to be delivered.
    Pending,
    /// The request has been delivered. Terminal.
    Delivered,
    /// The request has been cancelled and will never be delivered. Terminal.
    Cancelled,
}

/// Information passed to the completion callback.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Delivered request.
    pub request: RequestId,
    /// Delivery time.
    pub time: f64,
    /// What the delivered request was waiting for.
    ///
    /// When a request has renege clauses, this tells which alternative has won.
    pub origin: Origin,
}

type Callback = Box<dyn FnOnce(Delivery)>;

/// Facility bookkeeping attached to a request while it is being serviced.
pub(crate) struct ServiceTicket {
    facility: Weak<RefCell<FacilityState>>,
    server: Option<usize>,
    remaining: f64,
    last_issued: f64,
}

/// Effect performed by the simulation when the request reaches the head of the queue.
pub(crate) enum Effect {
    /// Deliver the request to its owner.
    Resume,
    /// Deliver the message to the targets, then the request to its owner.
    Broadcast { message: Message, targets: Targets },
    /// Let the facility release the server before the request is delivered.
    Service(ServiceTicket),
}

/// Resolved [`Effect`] ready to be executed by the simulation loop.
pub(crate) enum Dispatch {
    Resume,
    Broadcast(Message, Targets),
    Service(Facility),
}

struct RequestInner {
    id: RequestId,
    owner: Id,
    scheduled_at: f64,
    deliver_at: f64,
    status: Status,
    committed: bool,
    origin: Origin,
    effect: Effect,
    callback: Option<Callback>,
    duration: f64,
    amount: f64,
    buffer: Option<Weak<RefCell<BufferState>>>,
    sim_state: Weak<RefCell<SimulationState>>,
    main: Option<Weak<RefCell<RequestInner>>>,
    clauses: Vec<Request>,
}

/// Handle to a scheduled delivery.
///
/// Handles are cheap to clone, all clones refer to the same request.
#[derive(Clone)]
pub struct Request {
    inner: Rc<RefCell<RequestInner>>,
}

impl Request {
    pub(crate) fn new(
        sim_state: Weak<RefCell<SimulationState>>,
        id: RequestId,
        owner: Id,
        scheduled_at: f64,
        deliver_at: f64,
        origin: Origin,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RequestInner {
                id,
                owner,
                scheduled_at,
                deliver_at,
                status: Status::Pending,
                committed: false,
                origin,
                effect: Effect::Resume,
                callback: None,
                duration: 0.,
                amount: 0.,
                buffer: None,
                sim_state,
                main: None,
                clauses: Vec::new(),
            })),
        }
    }

    /// Returns the request identifier.
    pub fn id(&self) -> RequestId {
        self.inner.borrow().id
    }

    /// Returns the identifier of the entity which created the request.
    pub fn owner(&self) -> Id {
        self.inner.borrow().owner
    }

    /// Returns the creation time.
    pub fn scheduled_at(&self) -> f64 {
        self.inner.borrow().scheduled_at
    }

    /// Returns the planned delivery time.
    ///
    /// For requests waiting inside a resource this is meaningful only once the request has been granted.
    pub fn deliver_at(&self) -> f64 {
        self.inner.borrow().deliver_at
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> Status {
        self.inner.borrow().status
    }

    /// Returns `true` if the request is still waiting to be delivered.
    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    /// Returns `true` if the request has been delivered.
    pub fn is_delivered(&self) -> bool {
        self.status() == Status::Delivered
    }

    /// Returns `true` if the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }

    /// Returns `true` if the request has been granted by its resource and can no longer be cancelled.
    pub fn is_committed(&self) -> bool {
        self.inner.borrow().committed
    }

    /// Returns what the request is waiting for.
    pub fn origin(&self) -> Origin {
        self.inner.borrow().origin.clone()
    }

    /// Returns the requested service duration (facility requests).
    pub fn duration(&self) -> f64 {
        self.inner.borrow().duration
    }

    /// Returns the requested amount (buffer requests).
    pub fn amount(&self) -> f64 {
        self.inner.borrow().amount
    }

    /// Returns `true` if both handles refer to the same request.
    pub fn ptr_eq(&self, other: &Request) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the renege clauses attached to this request.
    pub fn clauses(&self) -> Vec<Request> {
        self.inner.borrow().clauses.clone()
    }

    /// Sets the callback invoked when the request is delivered, replacing the previous one.
    pub fn done<F>(&self, callback: F) -> Request
    where
        F: FnOnce(Delivery) + 'static,
    {
        self.inner.borrow_mut().callback = Some(Box::new(callback));
        self.clone()
    }

    /// Adds a renege clause which fires `delay` time units after the request was created, unless the request is
    /// delivered or committed to its resource first. The clause invokes its own `callback`.
    ///
    /// Has no effect if the request is no longer pending or has already been committed. A clause whose time has
    /// already passed fires at the current time.
    pub fn wait_until<F>(&self, delay: f64, callback: F) -> Request
    where
        F: FnOnce(Delivery) + 'static,
    {
        if let Some(clause) = self.new_clause(Origin::Timer) {
            let deliver_at = {
                let inner = self.inner.borrow();
                let now = current_time(&inner.sim_state).unwrap_or(inner.scheduled_at);
                (inner.scheduled_at + delay).max(now)
            };
            clause.done(callback);
            clause.schedule_at(deliver_at);
        }
        self.clone()
    }

    /// Adds a renege clause which fires when `event` is fired, unless the request is delivered or committed to its
    /// resource first. The clause invokes its own `callback`.
    ///
    /// Has no effect if the request is no longer pending or has already been committed.
    pub fn unless_event<F>(&self, event: &Event, callback: F) -> Request
    where
        F: FnOnce(Delivery) + 'static,
    {
        if let Some(clause) = self.new_clause(Origin::Event(event.name())) {
            clause.done(callback);
            event.add_wait_list(clause);
        }
        self.clone()
    }

    /// Cancels the request together with all its renege clauses.
    ///
    /// Called on a clause, cancels the whole choice it belongs to. Cancelling a request which is delivered,
    /// already cancelled or committed to its resource does nothing. A request cancelled while waiting in a buffer
    /// queue lets the buffer serve the requests queued behind it.
    pub fn cancel(&self) {
        if let Some(main) = self.main() {
            main.cancel();
            return;
        }
        if self.is_committed() {
            return;
        }
        self.abandon(None);
    }

    /// Commits the request to its resource: cancels all renege clauses and ignores further cancellation.
    ///
    /// Called on a clause, the clause wins the race: the main request and the other clauses are cancelled.
    pub fn cancel_renege_clauses(&self) {
        if let Some(main) = self.main() {
            self.inner.borrow_mut().committed = true;
            main.abandon(Some(self));
            return;
        }
        let clauses = {
            let mut inner = self.inner.borrow_mut();
            inner.committed = true;
            inner.clauses.clone()
        };
        for clause in clauses {
            clause.force_cancel();
        }
    }

    /// Delivers the request: marks it delivered, cancels its competitors and invokes the callback.
    pub(crate) fn deliver(&self) {
        let (callback, delivery) = {
            let mut inner = self.inner.borrow_mut();
            if inner.status != Status::Pending {
                return;
            }
            inner.status = Status::Delivered;
            let delivery = Delivery {
                request: inner.id,
                time: inner.deliver_at,
                origin: inner.origin.clone(),
            };
            (inner.callback.take(), delivery)
        };
        match self.main() {
            Some(main) => main.abandon(Some(self)),
            None => {
                for clause in self.clauses() {
                    clause.force_cancel();
                }
            }
        }
        if let Some(callback) = callback {
            callback(delivery);
        }
    }

    /// Places the request into the simulation queue for delivery at `time`.
    pub(crate) fn schedule_at(&self, time: f64) {
        let sim_state = {
            let mut inner = self.inner.borrow_mut();
            inner.deliver_at = time;
            inner.sim_state.upgrade()
        };
        if let Some(sim_state) = sim_state {
            sim_state.borrow_mut().enqueue(time, self.clone());
        }
    }

    /// Resolves the effect to execute when the request reaches the head of the simulation queue.
    pub(crate) fn dispatch(&self) -> Dispatch {
        let mut inner = self.inner.borrow_mut();
        let effect = std::mem::replace(&mut inner.effect, Effect::Resume);
        match effect {
            Effect::Resume => Dispatch::Resume,
            Effect::Broadcast { message, targets } => Dispatch::Broadcast(message, targets),
            Effect::Service(ticket) => {
                let facility = ticket.facility.upgrade().map(Facility::from_inner);
                // the ticket stays attached, a preempted request still needs it when resumed
                inner.effect = Effect::Service(ticket);
                match facility {
                    Some(facility) => Dispatch::Service(facility),
                    None => Dispatch::Resume,
                }
            }
        }
    }

    pub(crate) fn set_broadcast(&self, message: Message, targets: Targets) {
        self.inner.borrow_mut().effect = Effect::Broadcast { message, targets };
    }

    pub(crate) fn set_duration(&self, duration: f64) {
        self.inner.borrow_mut().duration = duration;
    }

    pub(crate) fn set_amount(&self, amount: f64) {
        self.inner.borrow_mut().amount = amount;
    }

    pub(crate) fn set_buffer(&self, buffer: Weak<RefCell<BufferState>>) {
        self.inner.borrow_mut().buffer = Some(buffer);
    }

    /// Returns `true` if the request has started service at a facility.
    pub(crate) fn in_service(&self) -> bool {
        matches!(self.inner.borrow().effect, Effect::Service(_))
    }

    pub(crate) fn begin_service(
        &self,
        facility: Weak<RefCell<FacilityState>>,
        server: Option<usize>,
        remaining: f64,
        now: f64,
    ) {
        self.inner.borrow_mut().effect = Effect::Service(ServiceTicket {
            facility,
            server,
            remaining,
            last_issued: now,
        });
    }

    pub(crate) fn server(&self) -> Option<usize> {
        match &self.inner.borrow().effect {
            Effect::Service(ticket) => ticket.server,
            _ => None,
        }
    }

    pub(crate) fn remaining(&self) -> f64 {
        match &self.inner.borrow().effect {
            Effect::Service(ticket) => ticket.remaining,
            _ => self.duration(),
        }
    }

    pub(crate) fn set_remaining(&self, remaining: f64) {
        if let Effect::Service(ticket) = &mut self.inner.borrow_mut().effect {
            ticket.remaining = remaining;
        }
    }

    pub(crate) fn last_issued(&self) -> f64 {
        match &self.inner.borrow().effect {
            Effect::Service(ticket) => ticket.last_issued,
            _ => self.scheduled_at(),
        }
    }

    pub(crate) fn set_last_issued(&self, now: f64) {
        if let Effect::Service(ticket) = &mut self.inner.borrow_mut().effect {
            ticket.last_issued = now;
        }
    }

    fn main(&self) -> Option<Request> {
        let inner = self.inner.borrow();
        let main = inner.main.as_ref()?.upgrade()?;
        Some(Request { inner: main })
    }

    fn new_clause(&self, origin: Origin) -> Option<Request> {
        let clause = {
            let mut inner = self.inner.borrow_mut();
            if inner.committed || inner.status != Status::Pending || inner.main.is_some() {
                return None;
            }
            let sim_state = inner.sim_state.upgrade()?;
            let id = sim_state.borrow_mut().next_request_id();
            let clause = Request::new(
                inner.sim_state.clone(),
                id,
                inner.owner,
                inner.scheduled_at,
                inner.scheduled_at,
                origin,
            );
            inner.clauses.push(clause.clone());
            clause
        };
        clause.inner.borrow_mut().main = Some(Rc::downgrade(&self.inner));
        Some(clause)
    }

    /// Cancels the request regardless of commitment. Returns `true` if the status changed.
    fn force_cancel(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.status != Status::Pending {
            return false;
        }
        inner.status = Status::Cancelled;
        true
    }

    /// Withdraws the main request from the choice: cancels it and its clauses except the `winner`, and wakes up the
    /// buffer it waits on.
    fn abandon(&self, winner: Option<&Request>) {
        let cancelled = self.force_cancel();
        for clause in self.clauses() {
            if winner.map_or(true, |winner| !winner.ptr_eq(&clause)) {
                clause.force_cancel();
            }
        }
        if !cancelled {
            return;
        }
        let buffer = self.inner.borrow().buffer.as_ref().and_then(Weak::upgrade);
        if let Some(buffer) = buffer {
            Buffer::from_inner(buffer).progress();
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Request")
            .field("id", &inner.id)
            .field("owner", &inner.owner)
            .field("scheduled_at", &inner.scheduled_at)
            .field("deliver_at", &inner.deliver_at)
            .field("status", &inner.status)
            .field("committed", &inner.committed)
            .field("origin", &inner.origin)
            .finish()
    }
}
