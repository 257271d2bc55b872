//! Threaded service-center engine
//!
//! A run consists of `2 + N` OS threads sharing one [`Shared`] block:
//!
//! ```text
//! arrivals ──► client_queue ──► dispatcher ──► counters[i] ──► server-i ──► served
//!                                   ▲                              │
//!                                   └──────── idle_servers ◄───────┘
//! ```
//!
//! Every loop is gated on the `running` flag. `stop()` clears it, empties the
//! line, pushes a shutdown sentinel into the idle pool, wakes every blocked
//! thread and joins them all before returning.
//!
//! A client always lives in exactly one place: the line, the dispatcher's
//! hands, a counter's pending or in-service slot, the served list, or the
//! walked-out list (clients sent home by shutdown). Nothing is dropped, so
//! `served_clients()` and `unattended_clients()` together account for every
//! arrival once the engine is stopped.

use crate::client::{ArrivalProcess, Client, ServerId};
use crate::config::SimulationConfig;
use crate::counter::ServiceCounter;
use crate::error::EngineError;
use crate::events::{EventSink, SimEvent};
use crate::queue::ConcurrentFifoQueue;
use crate::stats::SimulationSummary;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

/// Entry in the idle-server pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleToken {
    Server(ServerId),
    /// Pushed by `stop()` to release a dispatcher waiting for a free server
    Shutdown,
}

struct Shared {
    config: SimulationConfig,
    running: AtomicBool,
    client_queue: ConcurrentFifoQueue<Client>,
    idle_servers: ConcurrentFifoQueue<IdleToken>,
    counters: Vec<ServiceCounter>,
    served: Mutex<Vec<Client>>,
    walked_out: Mutex<Vec<Client>>,
    sink: Arc<dyn EventSink>,
}

impl Shared {
    fn new(config: SimulationConfig, sink: Arc<dyn EventSink>) -> Shared {
        let servers: Vec<ServerId> = (0..config.num_servers).map(ServerId).collect();
        Shared {
            running: AtomicBool::new(false),
            client_queue: ConcurrentFifoQueue::new(),
            idle_servers: ConcurrentFifoQueue::from_items(
                servers.iter().copied().map(IdleToken::Server),
            ),
            counters: servers.into_iter().map(ServiceCounter::new).collect(),
            served: Mutex::new(Vec::new()),
            walked_out: Mutex::new(Vec::new()),
            config,
            sink,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn emit(&self, event: SimEvent) {
        self.sink.emit(event);
    }

    fn walk_out(&self, client: Client) {
        debug!(client = %client.id, "client left the line");
        self.walked_out.lock().push(client);
    }

    /// Sleep for `total` in tick-sized steps, giving up as soon as the run stops
    ///
    /// Returns `true` if the full duration elapsed while still running.
    fn pace(&self, total: Duration) -> bool {
        let tick = self.config.tick();
        let deadline = Instant::now() + total;
        loop {
            if !self.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(tick.min(deadline - now));
        }
    }

    fn run_arrivals(&self, mut arrivals: ArrivalProcess) {
        while self.is_running() {
            let client = arrivals.new_client(Instant::now());
            debug!(
                client = %client.id,
                service_ms = client.service_time.as_millis() as u64,
                "client arrived"
            );
            // announced before it can be dispatched, so observers see each
            // client's events in causal order
            self.emit(SimEvent::NewClient(client.clone()));
            self.client_queue.enqueue(client);

            let gap = arrivals.draw_arrival_interval();
            self.pace(gap);
        }
        trace!(created = arrivals.clients_created(), "arrivals stopped");
    }

    fn run_dispatcher(&self) {
        let poll = self.config.poll_interval();
        while self.is_running() {
            let Some(client) = self.client_queue.dequeue_timeout(poll) else {
                continue;
            };
            if let Err(client) = self.dispatch(client) {
                self.walk_out(client);
                break;
            }
        }
        trace!("dispatcher stopped");
    }

    /// Hand `client` to the least-recently idled server
    ///
    /// Gives the client back if shutdown interrupts the handoff.
    fn dispatch(&self, client: Client) -> Result<(), Client> {
        let poll = self.config.poll_interval();
        let server = loop {
            if !self.is_running() {
                return Err(client);
            }
            match self.idle_servers.dequeue_timeout(poll) {
                Some(IdleToken::Server(server)) => break server,
                Some(IdleToken::Shutdown) => return Err(client),
                None => continue,
            }
        };

        if !self.pace(self.config.handoff_delay()) {
            self.idle_servers.enqueue(IdleToken::Server(server));
            return Err(client);
        }

        debug!(client = %client.id, server = %server, "client dispatched");
        self.emit(SimEvent::ServerStatus {
            server,
            idle: false,
            occupant: Some(client.id),
        });
        self.counters[server.0].assign(client);
        Ok(())
    }

    fn run_server(&self, server: ServerId) {
        let counter = &self.counters[server.0];
        while self.is_running() {
            let Some(client) = counter.wait_for_client(&self.running) else {
                break;
            };
            let snapshot = counter.begin_service(client, Instant::now());
            debug!(client = %snapshot.id, server = %server, "service started");
            let service_time = snapshot.service_time;
            self.emit(SimEvent::ClientBeingServed {
                client: snapshot,
                server,
            });

            if self.pace(service_time) {
                if let Some(done) = counter.complete_service(Instant::now()) {
                    debug!(client = %done.id, server = %server, "service completed");
                    self.served.lock().push(done.clone());
                    self.emit(SimEvent::ClientServed {
                        client: done,
                        server,
                    });
                }
            } else {
                debug!(server = %server, "service interrupted by shutdown");
            }

            self.emit(SimEvent::ServerStatus {
                server,
                idle: true,
                occupant: None,
            });
            self.idle_servers.enqueue(IdleToken::Server(server));
        }
        trace!(server = %server, "server stopped");
    }

    fn unattended(&self) -> Vec<Client> {
        let mut clients = self.walked_out.lock().clone();
        clients.extend(self.client_queue.snapshot());
        for counter in &self.counters {
            clients.extend(counter.unattended());
        }
        clients.sort_by_key(|c| c.id);
        clients
    }
}

/// Start/stop handle for a multi-server, single-queue service center
pub struct SimulationEngine {
    config: SimulationConfig,
    sink: Arc<dyn EventSink>,
    state: EngineState,
    shared: Option<Arc<Shared>>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl SimulationEngine {
    pub fn new<S>(config: SimulationConfig, sink: S) -> Result<SimulationEngine, EngineError>
    where
        S: EventSink + 'static,
    {
        Self::with_shared_sink(config, Arc::new(sink))
    }

    pub fn with_shared_sink(
        config: SimulationConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<SimulationEngine, EngineError> {
        config.validate()?;
        Ok(SimulationEngine {
            config,
            sink,
            state: EngineState::Stopped,
            shared: None,
            tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Spawn the arrival generator, the server workers and the dispatcher
    ///
    /// Returns as soon as the threads are up. Each call begins a fresh run:
    /// statistics from a previous run are discarded and client ids restart at 0.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            warn!("start requested while already running");
            return Err(EngineError::AlreadyRunning);
        }

        let arrivals = ArrivalProcess::new(&self.config)?;
        let shared = Arc::new(Shared::new(self.config.clone(), Arc::clone(&self.sink)));
        shared.running.store(true, Ordering::Release);
        self.shared = Some(Arc::clone(&shared));
        self.state = EngineState::Running;

        if let Err(err) = self.spawn_tasks(&shared, arrivals) {
            error!(error = %err, "failed to start simulation");
            if let Err(stop_err) = self.stop() {
                warn!(error = %stop_err, "rollback after failed start was not clean");
            }
            return Err(err);
        }

        info!(
            servers = self.config.num_servers,
            seed = ?self.config.seed,
            "simulation started"
        );
        Ok(())
    }

    fn spawn_tasks(
        &mut self,
        shared: &Arc<Shared>,
        arrivals: ArrivalProcess,
    ) -> Result<(), EngineError> {
        let generator = Arc::clone(shared);
        self.spawn_task("arrivals".into(), move || generator.run_arrivals(arrivals))?;

        for server in (0..self.config.num_servers).map(ServerId) {
            let worker = Arc::clone(shared);
            self.spawn_task(format!("server-{server}"), move || worker.run_server(server))?;
        }

        let dispatcher = Arc::clone(shared);
        self.spawn_task("dispatcher".into(), move || dispatcher.run_dispatcher())
    }

    fn spawn_task<F>(&mut self, name: String, task: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(task)
            .map_err(|source| EngineError::Spawn {
                task: name.clone(),
                source,
            })?;
        self.tasks.push((name, handle));
        Ok(())
    }

    /// Stop the run and wait for every thread to exit
    ///
    /// Clients still in line are sent home, and a service in progress is
    /// abandoned without being counted as served. Both show up in
    /// [`unattended_clients`](Self::unattended_clients).
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if !self.is_running() {
            warn!("stop requested while not running");
            return Err(EngineError::NotRunning);
        }
        let Some(shared) = self.shared.clone() else {
            self.state = EngineState::Stopped;
            return Err(EngineError::NotRunning);
        };

        let stop_requested = Instant::now();
        shared.running.store(false, Ordering::Release);

        let drained = shared.client_queue.drain();
        debug!(count = drained.len(), "clearing the line");
        shared.walked_out.lock().extend(drained);

        shared.idle_servers.enqueue(IdleToken::Shutdown);
        shared.client_queue.wake_all();
        shared.idle_servers.wake_all();
        for counter in &shared.counters {
            counter.wake();
        }

        let mut panicked = None;
        for (name, handle) in self.tasks.drain(..) {
            if handle.join().is_err() {
                error!(task = %name, "task panicked");
                panicked.get_or_insert(name);
            }
        }
        // the generator may have enqueued one last client after the first drain
        shared.walked_out.lock().extend(shared.client_queue.drain());
        self.state = EngineState::Stopped;

        info!(
            served = shared.served.lock().len(),
            unattended = shared.unattended().len(),
            elapsed_ms = stop_requested.elapsed().as_millis() as u64,
            "simulation stopped"
        );

        match panicked {
            Some(task) => Err(EngineError::TaskPanicked { task }),
            None => Ok(()),
        }
    }

    /// Clients that completed service in the current (or last) run, in completion order
    pub fn served_clients(&self) -> Vec<Client> {
        self.shared
            .as_ref()
            .map(|shared| shared.served.lock().clone())
            .unwrap_or_default()
    }

    /// Clients that arrived but were never fully served, ordered by id
    ///
    /// Non-destructive. While running, a client in transit between the line
    /// and a counter is not listed; after `stop()` the list is complete.
    pub fn unattended_clients(&self) -> Vec<Client> {
        self.shared
            .as_ref()
            .map(|shared| shared.unattended())
            .unwrap_or_default()
    }

    /// Number of clients waiting in line right now
    pub fn queue_len(&self) -> usize {
        self.shared
            .as_ref()
            .map(|shared| shared.client_queue.len())
            .unwrap_or(0)
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary::from_clients(
            self.config.num_servers,
            &self.served_clients(),
            &self.unattended_clients(),
        )
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "simulation did not stop cleanly on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;

    fn quick() -> SimulationConfig {
        SimulationConfig::fast().with_seed(11)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = SimulationConfig::fast().with_servers(0);
        assert!(matches!(
            SimulationEngine::new(config, NullSink),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn idle_pool_is_seeded_in_server_order() {
        let shared = Shared::new(quick().with_servers(3), Arc::new(NullSink));
        let order: Vec<_> = std::iter::from_fn(|| shared.idle_servers.dequeue()).collect();
        assert_eq!(
            order,
            vec![
                IdleToken::Server(ServerId(0)),
                IdleToken::Server(ServerId(1)),
                IdleToken::Server(ServerId(2)),
            ]
        );
    }

    #[test]
    fn pace_completes_when_running() {
        let shared = Shared::new(quick(), Arc::new(NullSink));
        shared.running.store(true, Ordering::Release);
        let started = Instant::now();
        assert!(shared.pace(Duration::from_millis(15)));
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn pace_gives_up_when_stopped() {
        let shared = Shared::new(quick(), Arc::new(NullSink));
        let started = Instant::now();
        assert!(!shared.pace(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn dispatch_during_shutdown_returns_the_client() {
        let shared = Shared::new(quick(), Arc::new(NullSink));
        let client = Client::new(
            crate::client::ClientId(0),
            Instant::now(),
            Duration::from_millis(5),
        );
        let returned = shared.dispatch(client).unwrap_err();
        assert_eq!(returned.id.0, 0);
        // the idle pool was not touched
        assert_eq!(shared.idle_servers.len(), 3);
    }

    #[test]
    fn shutdown_sentinel_releases_dispatch() {
        let shared = Shared::new(quick().with_servers(1), Arc::new(NullSink));
        shared.running.store(true, Ordering::Release);
        // the only server is busy; the sentinel is next in line
        shared.idle_servers.dequeue();
        shared.idle_servers.enqueue(IdleToken::Shutdown);

        let client = Client::new(
            crate::client::ClientId(1),
            Instant::now(),
            Duration::from_millis(5),
        );
        assert!(shared.dispatch(client).is_err());
        assert!(shared.counters[0].unattended().is_empty());
    }

    #[test]
    fn lifecycle_misuse_is_rejected() {
        let mut engine = SimulationEngine::new(quick(), NullSink).unwrap();
        assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));

        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));

        engine.stop().unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn queries_before_first_start_are_empty() {
        let engine = SimulationEngine::new(quick(), NullSink).unwrap();
        assert!(engine.served_clients().is_empty());
        assert!(engine.unattended_clients().is_empty());
        assert_eq!(engine.queue_len(), 0);
    }
}
