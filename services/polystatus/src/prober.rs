//! Active HTTP probing

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::io::{HttpClient, HttpResponse};
use crate::monitor::{ActiveTarget, Observation};
use crate::PolyStatusError;

/// Issues one bounded-time request per call and classifies the outcome.
///
/// A probe never fails: transport errors and timeouts become DOWN observations
/// with status code 0.
pub struct Prober {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober").finish_non_exhaustive()
    }
}

impl Prober {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    pub async fn probe(&self, target: &ActiveTarget) -> Observation {
        self.probe_with_timeout(&target.method, &target.url, target.probe_timeout())
            .await
    }

    /// Dropping the request future at the deadline releases its connection
    pub async fn probe_with_timeout(&self, method: &str, url: &str, limit: Duration) -> Observation {
        let started = Instant::now();
        let result = match tokio::time::timeout(limit, self.http.request(method, url, limit)).await
        {
            Ok(result) => result,
            Err(_) => Err(PolyStatusError::Timeout(limit)),
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                tracing::debug!("Probe {} {} -> {} in {}ms", method, url, response.status, latency_ms);
                classify_response(&response, latency_ms)
            }
            Err(e) => {
                tracing::debug!("Probe {} {} failed after {}ms: {}", method, url, latency_ms, e);
                Observation::down(latency_ms)
                    .with_code(0)
                    .with_message(e.to_string())
            }
        }
    }
}

/// Map a completed response onto an observation
pub fn classify_response(response: &HttpResponse, latency_ms: u64) -> Observation {
    let observation = if response.is_success() {
        Observation::up(latency_ms)
    } else {
        Observation::down(latency_ms)
    }
    .with_code(response.status)
    .with_message(response.status_text.clone());

    if !response.is_json() {
        return observation;
    }
    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(payload) => observation.with_payload(payload),
        Err(e) => {
            tracing::debug!("Ignoring unparseable JSON probe body: {}", e);
            observation
        }
    }
}
