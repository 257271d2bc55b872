//! Compare staffing levels by running several centers side by side
//!
//! Each scenario is a full engine run on its own threads; rayon runs the
//! scenarios concurrently so the sweep takes one run's wall-clock time.
//!
//! Run with:
//!   cargo run --example counter_sweep -p service_center

use rayon::prelude::*;
use service_center::{NullSink, SimulationConfig, SimulationEngine, SimulationSummary};
use std::time::{Duration, Instant};

const RUN_FOR: Duration = Duration::from_secs(2);

fn run_scenario(num_servers: usize) -> Result<SimulationSummary, String> {
    let config = SimulationConfig::fast()
        .with_servers(num_servers)
        .with_seed(42 + num_servers as u64);
    let mut engine = SimulationEngine::new(config, NullSink).map_err(|e| e.to_string())?;
    engine.start().map_err(|e| e.to_string())?;
    std::thread::sleep(RUN_FOR);
    engine.stop().map_err(|e| e.to_string())?;
    Ok(engine.summary())
}

fn main() {
    println!("=== Counter Sweep ===\n");
    let start = Instant::now();

    let results: Vec<(usize, Result<SimulationSummary, String>)> = (1..=6)
        .into_par_iter()
        .map(|servers| (servers, run_scenario(servers)))
        .collect();

    println!("Completed {} scenarios in {:.2}s\n", results.len(), start.elapsed().as_secs_f64());
    println!("{:>8} {:>8} {:>11} {:>10}", "counters", "served", "unattended", "avg wait");
    for (servers, result) in &results {
        match result {
            Ok(summary) => println!(
                "{:>8} {:>8} {:>11} {:>9.3}s",
                servers,
                summary.total_served,
                summary.total_unattended,
                summary.average_wait_secs.unwrap_or(0.0)
            ),
            Err(e) => eprintln!("{:>8} failed: {}", servers, e),
        }
    }
}
