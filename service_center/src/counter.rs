//! Per-server handoff slot
//!
//! A single-client mailbox written by the dispatcher and read by exactly one
//! server worker, paired with a wake signal. The worker blocks on the signal
//! (no polling); the dispatcher or `stop()` raises it.

use crate::client::{Client, ClientId, ServerId};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Debug, Default)]
struct CounterState {
    pending: Option<Client>,
    in_service: Option<Client>,
    signaled: bool,
}

#[derive(Debug)]
pub struct ServiceCounter {
    id: ServerId,
    state: Mutex<CounterState>,
    wake: Condvar,
}

impl ServiceCounter {
    pub fn new(id: ServerId) -> Self {
        ServiceCounter {
            id,
            state: Mutex::new(CounterState::default()),
            wake: Condvar::new(),
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    /// Hand `client` to this counter and wake its worker
    pub fn assign(&self, client: Client) {
        let mut state = self.state.lock();
        debug_assert!(state.pending.is_none(), "counter already has a pending client");
        state.pending = Some(client);
        state.signaled = true;
        self.wake.notify_one();
    }

    /// Raise the signal without a client, so a blocked worker re-checks shutdown
    pub fn wake(&self) {
        let mut state = self.state.lock();
        state.signaled = true;
        self.wake.notify_one();
    }

    /// Block until signaled, clear the signal, and take the pending client
    ///
    /// Returns `None` without touching the slot once `running` is false, so a
    /// client handed over during shutdown stays visible as unattended.
    pub fn wait_for_client(&self, running: &AtomicBool) -> Option<Client> {
        let mut state = self.state.lock();
        while !state.signaled {
            self.wake.wait(&mut state);
        }
        state.signaled = false;
        if !running.load(Ordering::Acquire) {
            return None;
        }
        state.pending.take()
    }

    /// Stamp the start of service and park the client in the in-service slot
    ///
    /// Returns a snapshot for event emission.
    pub fn begin_service(&self, mut client: Client, now: Instant) -> Client {
        client.start_service = Some(now);
        client.served_by = Some(self.id);
        let snapshot = client.clone();
        self.state.lock().in_service = Some(client);
        snapshot
    }

    /// Stamp the end of service and release the client from the counter
    pub fn complete_service(&self, now: Instant) -> Option<Client> {
        let mut client = self.state.lock().in_service.take()?;
        client.end_service = Some(now);
        Some(client)
    }

    pub fn occupant(&self) -> Option<ClientId> {
        self.state.lock().in_service.as_ref().map(|c| c.id)
    }

    /// Clients still sitting at this counter without a completed service
    pub fn unattended(&self) -> Vec<Client> {
        let state = self.state.lock();
        state
            .pending
            .iter()
            .chain(state.in_service.iter())
            .filter(|c| c.end_service.is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn client(id: u64) -> Client {
        Client::new(ClientId(id), Instant::now(), Duration::from_secs(1))
    }

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn worker_receives_assigned_client() {
        let counter = Arc::new(ServiceCounter::new(ServerId(0)));
        let running = running();
        let worker = {
            let counter = Arc::clone(&counter);
            let running = Arc::clone(&running);
            thread::spawn(move || counter.wait_for_client(&running))
        };
        thread::sleep(Duration::from_millis(10));
        counter.assign(client(3));

        let received = worker.join().unwrap().unwrap();
        assert_eq!(received.id, ClientId(3));
        assert!(counter.unattended().is_empty());
    }

    #[test]
    fn bare_wake_releases_worker_empty_handed() {
        let counter = Arc::new(ServiceCounter::new(ServerId(0)));
        let running = running();
        let worker = {
            let counter = Arc::clone(&counter);
            let running = Arc::clone(&running);
            thread::spawn(move || counter.wait_for_client(&running))
        };
        counter.wake();
        assert!(worker.join().unwrap().is_none());
    }

    #[test]
    fn signal_raised_before_wait_is_not_lost() {
        let counter = ServiceCounter::new(ServerId(0));
        counter.assign(client(1));
        assert_eq!(counter.wait_for_client(&running()).unwrap().id, ClientId(1));
    }

    #[test]
    fn shutdown_wake_leaves_pending_client_in_slot() {
        let counter = ServiceCounter::new(ServerId(0));
        let stopped = AtomicBool::new(false);
        counter.assign(client(2));

        assert!(counter.wait_for_client(&stopped).is_none());
        let unattended = counter.unattended();
        assert_eq!(unattended.len(), 1);
        assert_eq!(unattended[0].id, ClientId(2));
        assert_eq!(unattended[0].start_service, None);
    }

    #[test]
    fn interrupted_service_stays_unattended() {
        let counter = ServiceCounter::new(ServerId(4));
        let now = Instant::now();
        let snapshot = counter.begin_service(client(5), now);

        assert_eq!(snapshot.start_service, Some(now));
        assert_eq!(snapshot.served_by, Some(ServerId(4)));
        assert_eq!(counter.occupant(), Some(ClientId(5)));
        let unattended = counter.unattended();
        assert_eq!(unattended.len(), 1);
        assert_eq!(unattended[0].id, ClientId(5));
    }

    #[test]
    fn completed_service_leaves_the_counter() {
        let counter = ServiceCounter::new(ServerId(1));
        let start = Instant::now();
        counter.begin_service(client(8), start);
        let done = counter
            .complete_service(start + Duration::from_secs(1))
            .unwrap();

        assert_eq!(done.time_in_service(), Some(Duration::from_secs(1)));
        assert_eq!(counter.occupant(), None);
        assert!(counter.unattended().is_empty());
        assert!(counter.complete_service(Instant::now()).is_none());
    }
}
