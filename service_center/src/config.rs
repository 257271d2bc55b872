use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Inclusive range of durations, in milliseconds, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DurationRange {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        DurationRange { min_ms, max_ms }
    }

    pub fn from_secs(min_secs: u64, max_secs: u64) -> Self {
        DurationRange {
            min_ms: min_secs * 1000,
            max_ms: max_secs * 1000,
        }
    }

    /// Degenerate range that always yields `d`
    pub fn fixed(d: Duration) -> Self {
        let ms = d.as_millis() as u64;
        DurationRange {
            min_ms: ms,
            max_ms: ms,
        }
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Parameters of one service-center run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_servers: usize,
    pub arrival_interval: DurationRange, // gap between consecutive arrivals
    pub service_time: DurationRange,     // drawn once per client at arrival
    pub handoff_delay_ms: u64,           // walk-to-counter latency
    pub tick_ms: u64,                    // granularity of cancellable sleeps
    pub poll_interval_ms: u64,           // upper bound on a dispatcher wait
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Three tellers, arrivals every 2-8 s, service 8-16 s
    pub fn bank() -> Self {
        SimulationConfig {
            num_servers: 3,
            arrival_interval: DurationRange::from_secs(2, 8),
            service_time: DurationRange::from_secs(8, 16),
            handoff_delay_ms: 1500,
            tick_ms: 100,
            poll_interval_ms: 100,
            seed: None,
        }
    }

    pub fn single_server() -> Self {
        let mut config = Self::bank();
        config.num_servers = 1;
        config
    }

    /// Arrivals outpace the tellers, so the line keeps growing
    pub fn rush_hour() -> Self {
        let mut config = Self::bank();
        config.arrival_interval = DurationRange::from_secs(1, 2);
        config
    }

    /// Millisecond-scale run for demos and tests
    pub fn fast() -> Self {
        SimulationConfig {
            num_servers: 3,
            arrival_interval: DurationRange::from_millis(5, 15),
            service_time: DurationRange::from_millis(20, 40),
            handoff_delay_ms: 1,
            tick_ms: 2,
            poll_interval_ms: 5,
            seed: None,
        }
    }

    pub fn with_servers(mut self, num_servers: usize) -> Self {
        self.num_servers = num_servers;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.num_servers == 0 {
            return Err(EngineError::InvalidConfig(
                "num_servers must be at least 1".into(),
            ));
        }
        for (name, range) in [
            ("arrival_interval", &self.arrival_interval),
            ("service_time", &self.service_time),
        ] {
            if range.min_ms > range.max_ms {
                return Err(EngineError::InvalidConfig(format!(
                    "{name}: min_ms {} exceeds max_ms {}",
                    range.min_ms, range.max_ms
                )));
            }
        }
        if self.arrival_interval.max_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "arrival_interval must allow a non-zero gap".into(),
            ));
        }
        if self.tick_ms == 0 || self.poll_interval_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "tick_ms and poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: SimulationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::bank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for config in [
            SimulationConfig::bank(),
            SimulationConfig::single_server(),
            SimulationConfig::rush_hour(),
            SimulationConfig::fast(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
    }

    #[test]
    fn zero_servers_rejected() {
        let config = SimulationConfig::bank().with_servers(0);
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn inverted_range_rejected() {
        let mut config = SimulationConfig::bank();
        config.service_time = DurationRange::from_millis(500, 100);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service_time"));
    }

    #[test]
    fn partial_toml_falls_back_to_bank_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            num_servers = 5
            seed = 7

            [service_time]
            min_ms = 1000
            max_ms = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.num_servers, 5);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.service_time, DurationRange::from_secs(1, 2));
        assert_eq!(config.arrival_interval, SimulationConfig::bank().arrival_interval);
        assert_eq!(config.handoff_delay_ms, 1500);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SimulationConfig::from_toml_str("num_servers = \"three\"").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SimulationConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
