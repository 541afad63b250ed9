mod common;

use std::cell::RefCell;
use std::rc::Rc;

use qsim::{Discipline, Origin, Request, Simulation};

use common::*;

#[test]
fn test_fcfs_single_server() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let ctx = sim.create_context("client");
    let trace = trace();
    let (f, t) = (facility.clone(), trace.clone());
    add_script(&mut sim, "client", move || {
        for label in ["A", "B", "C"] {
            let t = t.clone();
            ctx.use_facility(&f, 2.).done(move |d| record(&t, label, d.time));
        }
    });
    sim.simulate(100.).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![("A".to_string(), 2.), ("B".to_string(), 4.), ("C".to_string(), 6.)]
    );
    assert_eq!(facility.usage(), 6.);
    assert_eq!(facility.free(), 1);
    let system = facility.system_stats();
    assert_eq!(system.duration_series().count(), 3);
    assert_eq!(system.duration_series().average(), 4.);
    assert_eq!(system.current(), 0);
}

#[test]
fn test_fcfs_server_capacity() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("pool", Discipline::Fcfs, 2);
    let ctx = sim.create_context("client");
    let completions = trace();
    let max_in_service = Rc::new(RefCell::new(0));
    let (f, t, m) = (facility.clone(), completions.clone(), max_in_service.clone());
    add_script(&mut sim, "client", move || {
        for i in 0..5 {
            let (t, m, f2) = (t.clone(), m.clone(), f.clone());
            ctx.use_facility(&f, 3.).done(move |d| {
                // the completed request has already left its server
                let busy = f2.in_service() + 1;
                let mut max = m.borrow_mut();
                *max = (*max).max(busy);
                record(&t, &i.to_string(), d.time);
            });
        }
    });
    sim.simulate(100.).unwrap();

    let times: Vec<f64> = completions.borrow().iter().map(|(_, time)| *time).collect();
    assert_eq!(times, vec![3., 3., 6., 6., 9.]);
    assert_eq!(labels(&completions), vec!["0", "1", "2", "3", "4"]);
    assert!(*max_in_service.borrow() <= 2);
    assert_eq!(facility.usage(), 15.);
}

#[test]
fn test_fcfs_cancelled_request_never_served() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let ctx = sim.create_context("client");
    let trace = trace();
    let cancelled = Rc::new(RefCell::new(None::<Request>));
    let (f, t, c) = (facility.clone(), trace.clone(), cancelled.clone());
    add_script(&mut sim, "client", move || {
        let mut requests = Vec::new();
        for label in ["A", "B", "C"] {
            let t = t.clone();
            requests.push(ctx.use_facility(&f, 2.).done(move |d| record(&t, label, d.time)));
        }
        let b = requests[1].clone();
        *c.borrow_mut() = Some(b.clone());
        ctx.set_timer(1.).done(move |_| b.cancel());
    });
    sim.simulate(100.).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![("A".to_string(), 2.), ("C".to_string(), 4.)]
    );
    assert!(cancelled.borrow().as_ref().unwrap().is_cancelled());
    assert_eq!(facility.usage(), 4.);
}

#[test]
fn test_fcfs_cancelled_request_leaves_queue_and_system_statistics() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let ctx = sim.create_context("client");
    let f = facility.clone();
    add_script(&mut sim, "client", move || {
        ctx.use_facility(&f, 2.);
        let b = ctx.use_facility(&f, 2.);
        ctx.use_facility(&f, 2.);
        ctx.set_timer(1.).done(move |_| b.cancel());
    });
    sim.simulate(100.).unwrap();

    // B is discarded when it reaches the head at time 2 and counts as having waited until then
    let queue = facility.queue_stats();
    assert_eq!(queue.duration_series().count(), 3);
    assert_eq!(queue.duration_series().sum(), 4.);
    assert_eq!(queue.current(), 0);
    // it also leaves the system at that moment
    let system = facility.system_stats();
    assert_eq!(system.duration_series().count(), 3);
    assert_eq!(system.duration_series().sum(), 2. + 2. + 4.);
    assert_eq!(system.current(), 0);
    assert_eq!(facility.usage(), 4.);
}

#[test]
fn test_fcfs_origin() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let ctx = sim.create_context("client");
    let origin = Rc::new(RefCell::new(None));
    let (f, o) = (facility.clone(), origin.clone());
    add_script(&mut sim, "client", move || {
        let request = ctx.use_facility(&f, 1.);
        assert!(request.is_committed());
        request.done(move |d| *o.borrow_mut() = Some(d.origin));
    });
    sim.simulate(100.).unwrap();

    assert_eq!(*origin.borrow(), Some(Origin::Facility("desk".to_string())));
}

#[test]
fn test_lcfs_preempt_and_resume() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("cpu", Discipline::Lcfs, 1);
    let ctx = sim.create_context("client");
    let trace = trace();
    let (f, t) = (facility.clone(), trace.clone());
    add_script(&mut sim, "client", move || {
        let ta = t.clone();
        ctx.use_facility(&f, 5.).done(move |d| record(&ta, "A", d.time));
        let (c, f2) = (ctx.clone(), f.clone());
        ctx.set_timer(2.).done(move |_| {
            assert_eq!(f2.in_service(), 1);
            c.use_facility(&f2, 1.).done(move |d| record(&t, "B", d.time));
            assert_eq!(f2.in_service(), 1);
            assert_eq!(f2.queue_len(), 1);
        });
    });
    sim.simulate(100.).unwrap();

    // A resumes at 3 with the 3 units it had left
    assert_eq!(
        *trace.borrow(),
        vec![("B".to_string(), 3.), ("A".to_string(), 6.)]
    );
    assert_eq!(facility.usage(), 6.);
    assert_eq!(facility.system_stats().duration_series().count(), 2);
    assert_eq!(facility.queue_len(), 0);
}

#[test]
fn test_lcfs_nested_preemption() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("cpu", Discipline::Lcfs, 4);
    assert_eq!(facility.servers(), 1);
    let ctx = sim.create_context("client");
    let trace = trace();
    let (f, t) = (facility.clone(), trace.clone());
    add_script(&mut sim, "client", move || {
        for (label, arrival, duration) in [("A", 0., 4.), ("B", 1., 4.), ("C", 2., 1.)] {
            let (c, f, t) = (ctx.clone(), f.clone(), t.clone());
            ctx.set_timer(arrival).done(move |_| {
                c.use_facility(&f, duration).done(move |d| record(&t, label, d.time));
            });
        }
    });
    sim.simulate(100.).unwrap();

    // the most recently preempted request resumes first
    assert_eq!(
        *trace.borrow(),
        vec![("C".to_string(), 3.), ("B".to_string(), 6.), ("A".to_string(), 9.)]
    );
    assert_eq!(facility.usage(), 9.);
}

#[test]
fn test_reset_and_finalize() {
    init_logger();
    let mut sim = Simulation::new(0);
    let facility = sim.create_facility("desk", Discipline::Fcfs, 1);
    let ctx = sim.create_context("client");
    let f = facility.clone();
    add_script(&mut sim, "client", move || {
        ctx.use_facility(&f, 2.);
        ctx.use_facility(&f, 2.);
    });
    sim.simulate(100.).unwrap();

    facility.finalize(sim.time());
    let system = facility.system_stats();
    // one request for 2 units, then one for 2 more while the other waited
    assert_eq!(system.size_series().sum(), 2. * 2. + 1. * 2.);

    facility.reset();
    assert_eq!(facility.usage(), 0.);
    assert_eq!(facility.system_stats().duration_series().count(), 0);
}
