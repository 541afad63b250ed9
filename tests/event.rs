mod common;

use std::cell::RefCell;
use std::rc::Rc;

use qsim::{Origin, Request, Simulation};

use common::*;

#[test]
fn test_fire_releases_waiters_and_one_queued() {
    init_logger();
    let mut sim = Simulation::new(0);
    let event = sim.create_event("go");
    let ctx = sim.create_context("client");
    let trace = trace();
    let last_queued = Rc::new(RefCell::new(None::<Request>));
    let (e, t, q) = (event.clone(), trace.clone(), last_queued.clone());
    add_script(&mut sim, "client", move || {
        for label in ["w1", "w2"] {
            let t = t.clone();
            ctx.wait_event(&e).done(move |d| record(&t, label, d.time));
        }
        for label in ["q1", "q2"] {
            let t = t.clone();
            let request = ctx.queue_event(&e).done(move |d| record(&t, label, d.time));
            *q.borrow_mut() = Some(request);
        }
        let e2 = e.clone();
        ctx.set_timer(1.).done(move |_| e2.fire(false));
    });
    sim.simulate(100.).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![
            ("w1".to_string(), 1.),
            ("w2".to_string(), 1.),
            ("q1".to_string(), 1.),
        ]
    );
    assert!(!event.is_fired());
    assert_eq!(event.waiting(), 0);
    assert_eq!(event.queued(), 1);
    assert!(last_queued.borrow().as_ref().unwrap().is_pending());
}

#[test]
fn test_latch_and_clear() {
    init_logger();
    let mut sim = Simulation::new(0);
    let event = sim.create_event("door");
    let ctx = sim.create_context("client");
    let trace = trace();
    let (e, t) = (event.clone(), trace.clone());
    add_script(&mut sim, "client", move || {
        let e1 = e.clone();
        ctx.set_timer(1.).done(move |_| e1.fire(true));

        let (c, e2, t2) = (ctx.clone(), e.clone(), t.clone());
        ctx.set_timer(2.).done(move |_| {
            assert!(e2.is_fired());
            let t3 = t2.clone();
            c.wait_event(&e2).done(move |d| record(&t3, "wait", d.time));
            c.queue_event(&e2).done(move |d| record(&t2, "queue", d.time));
            assert_eq!(e2.waiting(), 0);
            assert_eq!(e2.queued(), 0);
        });

        let e3 = e.clone();
        ctx.set_timer(3.).done(move |_| e3.clear());

        let (c, e4, t4) = (ctx.clone(), e.clone(), t.clone());
        ctx.set_timer(4.).done(move |_| {
            c.wait_event(&e4).done(move |d| record(&t4, "after-clear", d.time));
        });

        let e5 = e.clone();
        ctx.set_timer(5.).done(move |_| e5.fire(false));
    });
    sim.simulate(100.).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![
            ("wait".to_string(), 2.),
            ("queue".to_string(), 2.),
            ("after-clear".to_string(), 5.),
        ]
    );
    assert!(!event.is_fired());
}

#[test]
fn test_fire_skips_cancelled_queued() {
    init_logger();
    let mut sim = Simulation::new(0);
    let event = sim.create_event("token");
    let ctx = sim.create_context("client");
    let trace = trace();
    let (e, t) = (event.clone(), trace.clone());
    add_script(&mut sim, "client", move || {
        let t1 = t.clone();
        let first = ctx.queue_event(&e).done(move |d| record(&t1, "first", d.time));
        let t2 = t.clone();
        ctx.queue_event(&e).done(move |d| record(&t2, "second", d.time));
        ctx.queue_event(&e).done(move |d| record(&t, "third", d.time));
        first.cancel();
        let e2 = e.clone();
        ctx.set_timer(1.).done(move |_| e2.fire(false));
    });
    sim.simulate(100.).unwrap();

    assert_eq!(*trace.borrow(), vec![("second".to_string(), 1.)]);
    assert_eq!(event.queued(), 1);
}

#[test]
fn test_event_origin() {
    init_logger();
    let mut sim = Simulation::new(0);
    let event = sim.create_event("go");
    let ctx = sim.create_context("client");
    let origin = Rc::new(RefCell::new(None));
    let (e, o) = (event.clone(), origin.clone());
    add_script(&mut sim, "client", move || {
        ctx.wait_event(&e).done(move |d| *o.borrow_mut() = Some(d.origin));
        e.fire(false);
    });
    sim.simulate(100.).unwrap();

    assert_eq!(*origin.borrow(), Some(Origin::Event("go".to_string())));
}
