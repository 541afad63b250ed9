use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use qsim::{cast, log_info, Entity, Event, Id, Message, Simulation, SimulationContext, SimulationOps, Targets};

// Message payloads (must implement Clone and Serialize)
#[derive(Clone, Serialize)]
struct Order {
    dish: String,
}

#[derive(Clone, Serialize)]
struct Served {
    dish: String,
}

// The kitchen cooks ordered dishes, but only once it has opened
struct Kitchen {
    ctx: SimulationContext,
    open: Event,
}

impl SimulationOps for Kitchen {
    fn context(&self) -> &SimulationContext {
        &self.ctx
    }
}

impl Entity for Kitchen {
    fn start(&mut self) {
        let open = self.open.clone();
        // Latch the event so that orders arriving later do not wait
        self.set_timer(1.).done(move |_| open.fire(true));
    }

    fn on_message(&mut self, message: &Message) {
        cast!(match message.data {
            Order { dish } => {
                self.cook(message.src, dish.clone())
            }
        })
    }
}

impl Kitchen {
    fn cook(&self, guest: Id, dish: String) {
        log_info!(self.ctx, "got order for {}", dish);
        let ctx = self.ctx.clone();
        // Continue once the kitchen is open, then cook for a random time
        self.wait_event(&self.open).done(move |_| {
            let cooking_time = ctx.gen_range(0.5..1.5);
            ctx.send(Served { dish }, cooking_time, Targets::One(guest));
        });
    }
}

// The guest orders dishes and leaves if a dish takes too long
struct Guest {
    ctx: SimulationContext,
    kitchen: Id,
    menu: Vec<String>,
}

impl SimulationOps for Guest {
    fn context(&self) -> &SimulationContext {
        &self.ctx
    }
}

impl Entity for Guest {
    fn start(&mut self) {
        for dish in &self.menu {
            self.send(Order { dish: dish.clone() }, 0.1, Targets::One(self.kitchen));
        }
    }

    fn on_message(&mut self, message: &Message) {
        cast!(match message.data {
            Served { dish } => {
                let waited = self.ctx.time() - message.sent_at;
                log_info!(self.ctx, "{} served after {:.2}", dish, waited);
            }
        })
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .format_level(false)
        .init();

    // Create simulation with random seed 123
    let mut sim = Simulation::new(123);
    let open = sim.create_event("open");

    // Create and register entities
    let kitchen = Kitchen {
        ctx: sim.create_context("kitchen"),
        open,
    };
    let kitchen_id = sim.add_entity("kitchen", Rc::new(RefCell::new(kitchen))).unwrap();
    let guest = Guest {
        ctx: sim.create_context("guest"),
        kitchen: kitchen_id,
        menu: vec!["soup".to_string(), "pasta".to_string()],
    };
    sim.add_entity("guest", Rc::new(RefCell::new(guest))).unwrap();

    // Run simulation until there are no pending requests and print the final simulation time
    sim.simulate(f64::INFINITY).unwrap();
    println!("Simulation time: {:.2}", sim.time());
}
