//! Single-queue, multi-server service center
//!
//! Clients arrive at random intervals, wait in one shared line and are served
//! by one of N tellers for a random duration. Every actor runs on its own OS
//! thread:
//! - Arrival generator: mints clients and puts them in line
//! - Dispatcher: pairs the head of the line with the least-recently idled server
//! - Server workers: one per counter, each blocking on its own handoff slot
//!
//! Observers receive [`SimEvent`]s through an [`EventSink`]; statistics are
//! available from the engine once it has been stopped.
//!
//! ```no_run
//! use service_center::{ChannelSink, SimulationConfig, SimulationEngine};
//!
//! let (sink, events) = ChannelSink::new();
//! let mut engine = SimulationEngine::new(SimulationConfig::bank(), sink).unwrap();
//! engine.start().unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(60));
//! engine.stop().unwrap();
//! println!("{}", engine.summary());
//! drop(events);
//! ```

pub mod client;
pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod queue;
pub mod stats;

pub use client::{ArrivalProcess, Client, ClientId, ServerId};
pub use config::{DurationRange, SimulationConfig};
pub use engine::{EngineState, IdleToken, SimulationEngine};
pub use error::EngineError;
pub use events::{ChannelSink, EventSink, NullSink, SimEvent};
pub use queue::ConcurrentFifoQueue;
pub use stats::SimulationSummary;
