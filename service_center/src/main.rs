//! Headless console runner
//!
//! Prints the event stream the way a status panel would show it, then the
//! end-of-run summary.
//!
//!   cargo run --release -- --preset rush-hour --duration 120
//!   cargo run --release -- --config bank.toml --json

use clap::{Parser, ValueEnum};
use service_center::logging::init_logging_with_level;
use service_center::stats::format_secs;
use service_center::{ChannelSink, EngineError, SimEvent, SimulationConfig, SimulationEngine};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Bank,
    SingleServer,
    RushHour,
    Fast,
}

#[derive(Debug, Parser)]
#[command(about = "Multi-server, single-queue service center simulation")]
struct Args {
    /// Built-in configuration to start from
    #[arg(long, value_enum, default_value_t = Preset::Bank)]
    preset: Preset,

    /// TOML configuration file (overrides --preset)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of counters
    #[arg(long)]
    servers: Option<usize>,

    /// Wall-clock seconds to run before stopping
    #[arg(long, default_value_t = 60)]
    duration: u64,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    init_logging_with_level(&args.log_level);

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> Result<SimulationConfig, EngineError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => match args.preset {
            Preset::Bank => SimulationConfig::bank(),
            Preset::SingleServer => SimulationConfig::single_server(),
            Preset::RushHour => SimulationConfig::rush_hour(),
            Preset::Fast => SimulationConfig::fast(),
        },
    };
    if let Some(servers) = args.servers {
        config.num_servers = servers;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), EngineError> {
    let config = build_config(args)?;

    println!("=== Service Center Simulation ===");
    println!("  Counters: {}", config.num_servers);
    println!(
        "  Arrivals every {}-{} ms, service {}-{} ms",
        config.arrival_interval.min_ms,
        config.arrival_interval.max_ms,
        config.service_time.min_ms,
        config.service_time.max_ms
    );
    println!("  Running for {} s\n", args.duration);

    let (sink, events) = ChannelSink::new();
    let printer = thread::spawn(move || {
        for event in events {
            print_event(&event);
        }
    });

    let mut engine = SimulationEngine::new(config, sink)?;
    engine.start()?;
    thread::sleep(Duration::from_secs(args.duration));
    let stopped = engine.stop();

    let summary = engine.summary();
    // dropping the engine closes the channel and lets the printer drain
    drop(engine);
    let _ = printer.join();
    stopped?;

    println!();
    if args.json {
        match summary.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialise summary: {e}"),
        }
    } else {
        print!("{summary}");
    }
    Ok(())
}

// Ids are shown 1-based, as a ticket machine would print them.
fn print_event(event: &SimEvent) {
    match event {
        SimEvent::NewClient(client) => {
            println!("Client {} took a ticket", client.id.0 + 1);
        }
        SimEvent::ClientBeingServed { client, server } => {
            println!("Counter {}: serving client {}", server.0 + 1, client.id.0 + 1);
        }
        SimEvent::ClientServed { client, server } => {
            println!(
                "Client {} served at counter {} | Time: {}",
                client.id.0 + 1,
                server.0 + 1,
                format_secs(client.service_time)
            );
        }
        SimEvent::ServerStatus {
            server,
            idle: false,
            occupant: Some(client),
        } => {
            println!("Counter {}: busy with client {}", server.0 + 1, client.0 + 1);
        }
        SimEvent::ServerStatus { server, .. } => {
            println!("Counter {}: free", server.0 + 1);
        }
    }
}
