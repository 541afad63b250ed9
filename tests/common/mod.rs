#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use qsim::{Entity, Id, Simulation};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared list of `(label, time)` records collected by callbacks.
pub type Trace = Rc<RefCell<Vec<(String, f64)>>>;

pub fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn record(trace: &Trace, label: &str, time: f64) {
    trace.borrow_mut().push((label.to_string(), time));
}

pub fn labels(trace: &Trace) -> Vec<String> {
    trace.borrow().iter().map(|(label, _)| label.clone()).collect()
}

/// Entity running a closure at start.
pub struct Script {
    action: Option<Box<dyn FnOnce()>>,
}

impl Entity for Script {
    fn start(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

pub fn add_script<F>(sim: &mut Simulation, name: &str, action: F) -> Id
where
    F: FnOnce() + 'static,
{
    let script = Script {
        action: Some(Box::new(action)),
    };
    sim.add_entity(name, Rc::new(RefCell::new(script))).unwrap()
}
