//! M/M/c service center: Poisson arrivals served by a facility with exponential service times.
//!
//! Customers may be impatient: with `--patience`, a customer still waiting in the queue after that long leaves
//! without being served.

use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::rc::Rc;

use clap::Parser;
use rand_distr::Exp;
use serde::Deserialize;

use qsim::stats::DataSeries;
use qsim::{log_debug, log_info, Discipline, Entity, Facility, Simulation, SimulationConfig, SimulationContext};

/// Model parameters, read from a JSON file and overridden by command line arguments.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModelConfig {
    #[serde(flatten)]
    sim: SimulationConfig,
    servers: usize,
    discipline: Discipline,
    arrival_rate: f64,
    service_rate: f64,
    patience: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sim: SimulationConfig {
                seed: 123,
                end_time: Some(10000.),
            },
            servers: 1,
            discipline: Discipline::Fcfs,
            arrival_rate: 0.8,
            service_rate: 1.,
            patience: None,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// JSON file with model parameters
    #[clap(long)]
    config: Option<String>,

    /// Random seed
    #[clap(long)]
    seed: Option<u64>,

    /// Simulated time
    #[clap(long)]
    end_time: Option<f64>,

    /// Number of servers
    #[clap(long)]
    servers: Option<usize>,

    /// Service discipline
    #[clap(long, possible_values = ["fcfs", "lcfs"])]
    discipline: Option<String>,

    /// Mean number of arrivals per time unit
    #[clap(long)]
    arrival_rate: Option<f64>,

    /// Mean number of services per time unit and server
    #[clap(long)]
    service_rate: Option<f64>,

    /// Time a customer is willing to wait in the queue
    #[clap(long)]
    patience: Option<f64>,
}

impl Args {
    fn model_config(&self) -> Result<ModelConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => ModelConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.sim.seed = seed;
        }
        if let Some(end_time) = self.end_time {
            config.sim.end_time = Some(end_time);
        }
        if let Some(servers) = self.servers {
            config.servers = servers;
        }
        match self.discipline.as_deref() {
            Some("lcfs") => config.discipline = Discipline::Lcfs,
            Some(_) => config.discipline = Discipline::Fcfs,
            None => {}
        }
        if let Some(rate) = self.arrival_rate {
            config.arrival_rate = rate;
        }
        if let Some(rate) = self.service_rate {
            config.service_rate = rate;
        }
        if self.patience.is_some() {
            config.patience = self.patience;
        }
        Ok(config)
    }
}

#[derive(Default)]
struct Results {
    arrived: u64,
    served: u64,
    reneged: u64,
    response: DataSeries,
}

/// Generates customers, each one asking the desk for service.
#[derive(Clone)]
struct Arrivals {
    ctx: SimulationContext,
    desk: Facility,
    interarrival: Exp<f64>,
    service: Exp<f64>,
    patience: Option<f64>,
    results: Rc<RefCell<Results>>,
}

impl Arrivals {
    fn schedule_next(self) {
        let delay = self.ctx.sample_from_distribution(&self.interarrival);
        self.ctx.set_timer(delay).done(move |_| {
            self.arrive();
            self.schedule_next();
        });
    }

    fn arrive(&self) {
        let service_time = self.ctx.sample_from_distribution(&self.service);
        let arrived_at = self.ctx.time();
        let customer = {
            let mut results = self.results.borrow_mut();
            results.arrived += 1;
            results.arrived
        };
        log_debug!(self.ctx, "customer {} arrives, needs {:.3}", customer, service_time);

        let (ctx, results) = (self.ctx.clone(), self.results.clone());
        let request = self.ctx.use_facility(&self.desk, service_time).done(move |d| {
            log_debug!(ctx, "customer {} served", customer);
            let mut results = results.borrow_mut();
            results.served += 1;
            results.response.record(d.time - arrived_at);
        });
        if let Some(patience) = self.patience {
            let (ctx, results) = (self.ctx.clone(), self.results.clone());
            request.wait_until(patience, move |_| {
                log_debug!(ctx, "customer {} gives up", customer);
                results.borrow_mut().reneged += 1;
            });
        }
    }
}

struct Source {
    arrivals: Arrivals,
}

impl Entity for Source {
    fn start(&mut self) {
        log_info!(self.arrivals.ctx, "opening");
        self.arrivals.clone().schedule_next();
    }

    fn finalize(&mut self) {
        let results = self.arrivals.results.borrow();
        log_info!(
            self.arrivals.ctx,
            "closing: {} arrived, {} served, {} gave up",
            results.arrived,
            results.served,
            results.reneged
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_target(false)
        .format_level(false)
        .init();

    let args = Args::parse();
    let config = args.model_config()?;

    let mut sim = Simulation::from_config(&config.sim);
    let desk = sim.create_facility("desk", config.discipline, config.servers);
    let results = Rc::new(RefCell::new(Results::default()));
    let arrivals = Arrivals {
        ctx: sim.create_context("source"),
        desk: desk.clone(),
        interarrival: Exp::new(config.arrival_rate)?,
        service: Exp::new(config.service_rate)?,
        patience: config.patience,
        results: results.clone(),
    };
    sim.add_entity("source", Rc::new(RefCell::new(Source { arrivals })))?;
    sim.run()?;

    let time = sim.time();
    desk.finalize(time);
    let results = results.borrow();
    let queue = desk.queue_stats();
    println!("Simulated time:        {:.3}", time);
    println!("Customers served:      {} of {}", results.served, results.arrived);
    println!("Customers reneged:     {}", results.reneged);
    println!("Mean response time:    {:.3}", results.response.average());
    println!("Response deviation:    {:.3}", results.response.deviation());
    println!("Mean queue length:     {:.3}", queue.size_series().average());
    println!("Mean time in queue:    {:.3}", queue.duration_series().average());
    println!("Utilization:           {:.3}", desk.usage() / (time * desk.servers() as f64));

    if desk.servers() == 1 && config.patience.is_none() && config.arrival_rate < config.service_rate {
        let rho = config.arrival_rate / config.service_rate;
        println!("M/M/1 mean response:   {:.3}", 1. / (config.service_rate - config.arrival_rate));
        println!("M/M/1 utilization:     {:.3}", rho);
    }
    Ok(())
}
