use crate::client::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// End-of-run report built from the served and unattended client lists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub num_servers: usize,
    pub total_served: usize,
    pub total_unattended: usize,
    pub average_service_secs: Option<f64>, // drawn service time of served clients
    pub average_wait_secs: Option<f64>,
    pub max_wait_secs: Option<f64>,
    pub served_per_server: Vec<usize>,
}

impl SimulationSummary {
    pub fn from_clients(num_servers: usize, served: &[Client], unattended: &[Client]) -> Self {
        let mut served_per_server = vec![0; num_servers];
        for server in served.iter().filter_map(|c| c.served_by) {
            if let Some(count) = served_per_server.get_mut(server.0) {
                *count += 1;
            }
        }

        let waits: Vec<f64> = served
            .iter()
            .filter_map(Client::wait_time)
            .map(|d| d.as_secs_f64())
            .collect();

        SimulationSummary {
            num_servers,
            total_served: served.len(),
            total_unattended: unattended.len(),
            average_service_secs: mean(served.iter().map(|c| c.service_time.as_secs_f64())),
            average_wait_secs: mean(waits.iter().copied()),
            max_wait_secs: waits.iter().copied().reduce(f64::max),
            served_per_server,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_secs(d: Duration) -> String {
    format!("{:.2} s", d.as_secs_f64())
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------- Summary -----------------------")?;
        writeln!(f, "Clients served: {}", self.total_served)?;
        if let Some(avg) = self.average_service_secs {
            writeln!(f, "Average service time: {} s.", round2(avg))?;
        }
        writeln!(f, "Clients unattended: {}", self.total_unattended)?;
        if let Some(avg) = self.average_wait_secs {
            writeln!(f, "Average wait time: {} s.", round2(avg))?;
        }
        if let Some(max) = self.max_wait_secs {
            writeln!(f, "Longest wait: {} s.", round2(max))?;
        }
        for (server, count) in self.served_per_server.iter().enumerate() {
            writeln!(f, "  Counter {}: {} served", server + 1, count)?;
        }
        Ok(())
    }
}
