//! Watch a center through its event channel
//!
//! The consumer runs on its own thread and keeps a live view of which
//! counter is serving whom, the way a status panel would.
//!
//! Run with:
//!   cargo run --example event_stream -p service_center

use service_center::logging::init_logging;
use service_center::{ChannelSink, SimEvent, SimulationConfig, SimulationEngine};
use std::time::Duration;

fn main() {
    init_logging();

    let config = SimulationConfig::fast().with_servers(2).with_seed(1);
    let num_servers = config.num_servers;
    let (sink, events) = ChannelSink::new();

    let panel = std::thread::spawn(move || {
        let mut counters: Vec<Option<u64>> = vec![None; num_servers];
        let mut arrivals = 0;
        for event in events {
            match event {
                SimEvent::NewClient(_) => arrivals += 1,
                SimEvent::ServerStatus { server, occupant, .. } => {
                    counters[server.0] = occupant.map(|c| c.0 + 1);
                    let view: Vec<String> = counters
                        .iter()
                        .map(|c| c.map_or("free".to_string(), |id| format!("#{id}")))
                        .collect();
                    println!("arrivals={arrivals:<4} counters=[{}]", view.join(", "));
                }
                _ => {}
            }
        }
    });

    let mut engine = match SimulationEngine::new(config, sink) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };
    if let Err(e) = engine.start() {
        eprintln!("failed to start: {e}");
        return;
    }
    std::thread::sleep(Duration::from_millis(500));
    if let Err(e) = engine.stop() {
        eprintln!("stop reported: {e}");
    }
    println!("\n{}", engine.summary());

    drop(engine);
    let _ = panel.join();
}
