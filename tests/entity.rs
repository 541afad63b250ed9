mod common;

use std::cell::RefCell;
use std::rc::Rc;

use qsim::{
    Discipline, Entity, Facility, Message, MessageData, Phase, Request, SimError, Simulation, SimulationContext,
    SimulationOps, Targets,
};

use common::*;

/// Entity overriding only some of the scheduling operations.
struct Worker {
    ctx: SimulationContext,
    facility: Facility,
    peer: u32,
    events: Rc<RefCell<Vec<String>>>,
}

impl SimulationOps for Worker {
    fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    fn set_timer(&self, duration: f64) -> Request {
        self.events.borrow_mut().push(format!("timer {}", duration));
        self.ctx.set_timer(duration + 1.)
    }

    fn send<T: MessageData>(&self, data: T, delay: f64, targets: Targets) -> Request {
        self.events.borrow_mut().push("send".to_string());
        self.ctx.send(data, delay, targets)
    }
}

impl Entity for Worker {
    fn start(&mut self) {
        let events = self.events.clone();
        self.set_timer(1.)
            .done(move |d| events.borrow_mut().push(format!("woke at {}", d.time)));
        let events = self.events.clone();
        self.use_facility(&self.facility, 3.)
            .done(move |d| events.borrow_mut().push(format!("served at {}", d.time)));
        self.send(0u32, 0.5, Targets::One(self.peer));
    }

    fn finalize(&mut self) {
        self.events.borrow_mut().push(format!("finalized at {}", self.time()));
    }
}

struct Peer {
    events: Rc<RefCell<Vec<String>>>,
}

impl Entity for Peer {
    fn start(&mut self) {
        self.events.borrow_mut().push("peer started".to_string());
    }

    fn on_message(&mut self, message: &Message) {
        self.events
            .borrow_mut()
            .push(format!("peer got {} from {}", message.data_json(), message.src));
    }

    fn finalize(&mut self) {
        self.events.borrow_mut().push("peer finalized".to_string());
    }
}

#[test]
fn test_operations_overridden_individually() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let events = Rc::new(RefCell::new(Vec::new()));
    let worker = Worker {
        ctx: sim.create_context("worker"),
        facility: facility.clone(),
        peer: 1,
        events: events.clone(),
    };
    sim.add_entity("worker", Rc::new(RefCell::new(worker))).unwrap();
    let peer_id = sim
        .add_entity("peer", Rc::new(RefCell::new(Peer { events: events.clone() })))
        .unwrap();
    assert_eq!(peer_id, 1);
    sim.simulate(100.).unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "timer 1",
            "send",
            "peer started",
            "peer got 0 from 0",
            "woke at 2",
            "served at 3",
            "finalized at 3",
            "peer finalized",
        ]
    );
    assert_eq!(sim.phase(), Phase::Finalized);
}

#[test]
fn test_duplicate_entity() {
    init_logger();
    let mut sim = Simulation::new(0);
    add_script(&mut sim, "x", || {});
    let err = sim
        .add_entity("x", Rc::new(RefCell::new(Peer { events: Default::default() })))
        .unwrap_err();
    assert!(matches!(err, SimError::DuplicateEntity(ref name) if name == "x"));
    assert_eq!(err.to_string(), "entity `x` is already registered");
}

#[test]
fn test_run_once() {
    init_logger();
    let mut sim = Simulation::new(0);
    sim.simulate(1.).unwrap();
    let err = sim.run().unwrap_err();
    assert_eq!(err.to_string(), "simulation is finalized, the operation requires it to be idle");
}

#[test]
fn test_logger_sink() {
    init_logger();
    let mut sim = Simulation::new(0);
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = lines.clone();
    sim.set_logger(move |line| sink.borrow_mut().push(line.to_string()));
    let ctx = sim.create_context("talker");
    add_script(&mut sim, "talker", move || {
        ctx.log("hello");
        let c = ctx.clone();
        ctx.set_timer(2.5).done(move |_| c.log("later"));
    });
    sim.simulate(10.).unwrap();
    sim.log("done");

    assert_eq!(
        *lines.borrow(),
        vec!["0.000000 0   hello\n", "2.500000 0   later\n", "2.500000    done\n"]
    );
}

#[test]
fn test_random_is_deterministic() {
    init_logger();
    let draw = |seed| {
        let mut sim = Simulation::new(seed);
        let ctx = sim.create_context("rng");
        (0..5).map(|_| ctx.rand()).collect::<Vec<f64>>()
    };
    assert_eq!(draw(17), draw(17));
    assert_ne!(draw(17), draw(18));
}
