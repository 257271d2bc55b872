use crate::config::{DurationRange, SimulationConfig};
use crate::error::EngineError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerId(pub usize);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One customer in the service center
///
/// `start_service`, `served_by` and `end_service` are each written once by the
/// server worker that owns the client. A service cut short by shutdown never
/// completes, so `end_service` stays `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: ClientId,
    pub arrival_time: Instant,
    pub service_time: Duration,
    pub start_service: Option<Instant>,
    pub end_service: Option<Instant>,
    pub served_by: Option<ServerId>,
}

impl Client {
    pub fn new(id: ClientId, arrival_time: Instant, service_time: Duration) -> Self {
        Client {
            id,
            arrival_time,
            service_time,
            start_service: None,
            end_service: None,
            served_by: None,
        }
    }

    /// Time spent in line, once service has started
    pub fn wait_time(&self) -> Option<Duration> {
        self.start_service
            .map(|start| start.saturating_duration_since(self.arrival_time))
    }

    /// Measured time at the counter, once service has finished
    pub fn time_in_service(&self) -> Option<Duration> {
        match (self.start_service, self.end_service) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    pub fn is_served(&self) -> bool {
        self.end_service.is_some()
    }
}

/// Draws arrival gaps and service times, and mints clients with sequential ids
pub struct ArrivalProcess {
    next_client_id: u64,
    arrival_interval: Uniform<u64>,
    service_time: Uniform<u64>,
    rng: StdRng,
}

impl ArrivalProcess {
    pub fn new(config: &SimulationConfig) -> Result<ArrivalProcess, EngineError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(ArrivalProcess {
            next_client_id: 0,
            arrival_interval: uniform_millis("arrival_interval", &config.arrival_interval)?,
            service_time: uniform_millis("service_time", &config.service_time)?,
            rng,
        })
    }

    pub fn draw_arrival_interval(&mut self) -> Duration {
        Duration::from_millis(self.arrival_interval.sample(&mut self.rng))
    }

    pub fn draw_service_time(&mut self) -> Duration {
        Duration::from_millis(self.service_time.sample(&mut self.rng))
    }

    /// Create the next client, arriving at `now`
    pub fn new_client(&mut self, now: Instant) -> Client {
        let id = ClientId(self.next_client_id);
        self.next_client_id += 1;
        let service_time = self.draw_service_time();
        Client::new(id, now, service_time)
    }

    pub fn clients_created(&self) -> u64 {
        self.next_client_id
    }
}

fn uniform_millis(name: &str, range: &DurationRange) -> Result<Uniform<u64>, EngineError> {
    Uniform::new_inclusive(range.min_ms, range.max_ms)
        .map_err(|e| EngineError::InvalidConfig(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SimulationConfig {
        SimulationConfig::bank().with_seed(seed)
    }

    #[test]
    fn wait_time_absent_until_service_starts() {
        let arrived = Instant::now();
        let mut client = Client::new(ClientId(0), arrived, Duration::from_secs(8));
        assert_eq!(client.wait_time(), None);
        assert_eq!(client.time_in_service(), None);

        client.start_service = Some(arrived + Duration::from_millis(1500));
        assert_eq!(client.wait_time(), Some(Duration::from_millis(1500)));
        assert_eq!(client.time_in_service(), None);
        assert!(!client.is_served());

        client.end_service = Some(arrived + Duration::from_millis(9500));
        assert_eq!(client.time_in_service(), Some(Duration::from_secs(8)));
        assert!(client.is_served());
    }

    #[test]
    fn ids_are_sequential() {
        let mut process = ArrivalProcess::new(&seeded(1)).unwrap();
        let now = Instant::now();
        let ids: Vec<_> = (0..5).map(|_| process.new_client(now).id).collect();
        assert_eq!(ids, (0..5).map(ClientId).collect::<Vec<_>>());
        assert_eq!(process.clients_created(), 5);
    }

    #[test]
    fn draws_stay_within_configured_ranges() {
        let config = seeded(42);
        let mut process = ArrivalProcess::new(&config).unwrap();
        for _ in 0..1000 {
            let gap = process.draw_arrival_interval();
            assert!(gap >= Duration::from_secs(2) && gap <= Duration::from_secs(8));
            let service = process.draw_service_time();
            assert!(service >= Duration::from_secs(8) && service <= Duration::from_secs(16));
        }
    }

    #[test]
    fn fixed_range_always_yields_the_same_duration() {
        let mut config = seeded(3);
        config.service_time = DurationRange::fixed(Duration::from_secs(5));
        let mut process = ArrivalProcess::new(&config).unwrap();
        for _ in 0..10 {
            assert_eq!(process.new_client(Instant::now()).service_time, Duration::from_secs(5));
        }
    }

    #[test]
    fn same_seed_same_draws() {
        let mut a = ArrivalProcess::new(&seeded(9)).unwrap();
        let mut b = ArrivalProcess::new(&seeded(9)).unwrap();
        for _ in 0..20 {
            assert_eq!(a.draw_arrival_interval(), b.draw_arrival_interval());
            assert_eq!(a.draw_service_time(), b.draw_service_time());
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = seeded(0);
        config.arrival_interval = DurationRange::from_millis(10, 5);
        assert!(matches!(
            ArrivalProcess::new(&config),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
