//! Backend health report.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use docs_qa_client::{ApiClient, HealthStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overall {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl Overall {
    pub fn from_status(status: &str) -> Self {
        match status {
            "ok" | "healthy" => Overall::Healthy,
            "degraded" => Overall::Degraded,
            _ => Overall::Unhealthy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Overall::Healthy => "healthy",
            Overall::Degraded => "degraded",
            Overall::Unhealthy => "unhealthy",
            Overall::Unknown => "unknown",
        }
    }
}

/// Result of one health check. Either `health` or `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub health: Option<HealthStatus>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl StatusReport {
    pub async fn check(client: &ApiClient) -> Self {
        let (health, error) = match client.health().await {
            Ok(h) => (Some(h), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            health,
            error,
            checked_at: Utc::now(),
        }
    }

    pub fn overall(&self) -> Overall {
        self.health
            .as_ref()
            .map_or(Overall::Unknown, |h| Overall::from_status(&h.status))
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Status: {}", self.overall().as_str());
        if let Some(health) = &self.health {
            for (name, service) in &health.services {
                let _ = write!(out, "  {name}: {}", service.status);
                if let Some(ms) = service.latency_ms {
                    let _ = write!(out, " ({ms}ms)");
                }
                if let Some(message) = &service.message {
                    let _ = write!(out, " - {message}");
                }
                let _ = writeln!(out);
            }
            if let Some(ts) = &health.timestamp {
                let _ = writeln!(out, "Server time: {ts}");
            }
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "Error: {error}");
        }
        let _ = writeln!(out, "Checked at: {}", self.checked_at.format("%Y-%m-%d %H:%M:%S UTC"));
        out
    }
}
