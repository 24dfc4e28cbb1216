//! BDD test world for the polystatus service

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cucumber::World;

use polystatus::channel::ChannelId;
use polystatus::config::Config;
use polystatus::io::{HttpClient, HttpResponse};
use polystatus::monitor::MonitorId;
use polystatus::scheduler::TickOutcome;
use polystatus::store::MemoryStore;
use polystatus::PolyStatus;

/// One request seen by the recording client
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: String,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// HTTP client double: answers probes with a configurable status and
/// fails deliveries to hosts marked as broken
#[derive(Debug)]
pub struct RecordingHttpClient {
    requests: Mutex<Vec<SentRequest>>,
    probe_status: Mutex<u16>,
    broken_hosts: Mutex<Vec<String>>,
}

impl Default for RecordingHttpClient {
    fn default() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            probe_status: Mutex::new(200),
            broken_hosts: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingHttpClient {
    pub fn set_probe_status(&self, status: u16) {
        *self.probe_status.lock().unwrap() = status;
    }

    pub fn break_host(&self, host: &str) {
        self.broken_hosts.lock().unwrap().push(host.to_string());
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<SentRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.starts_with(prefix))
            .collect()
    }

    fn respond(&self, request: SentRequest, probe: bool) -> HttpResponse {
        let broken = self
            .broken_hosts
            .lock()
            .unwrap()
            .iter()
            .any(|host| request.url.contains(host.as_str()));
        self.requests.lock().unwrap().push(request);

        let status = if broken {
            500
        } else if probe {
            *self.probe_status.lock().unwrap()
        } else {
            200
        };
        HttpResponse {
            status,
            status_text: if status < 300 { "OK" } else { "Error" }.to_string(),
            content_type: None,
            body: String::new(),
        }
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn request(
        &self,
        method: &str,
        url: &str,
        _timeout: Duration,
    ) -> polystatus::Result<HttpResponse> {
        let request = SentRequest {
            method: method.to_string(),
            url: url.to_string(),
            body: None,
        };
        Ok(self.respond(request, true))
    }

    async fn get(&self, url: &str) -> polystatus::Result<HttpResponse> {
        let request = SentRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            body: None,
        };
        Ok(self.respond(request, false))
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> polystatus::Result<HttpResponse> {
        let request = SentRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            body: Some(body.clone()),
        };
        Ok(self.respond(request, false))
    }
}

#[derive(Debug, Default, World)]
pub struct PolyStatusWorld {
    pub store: Option<Arc<MemoryStore>>,
    pub http: Option<Arc<RecordingHttpClient>>,
    pub engine: Option<PolyStatus>,

    /// Reference clock for tick and sweep steps
    pub t0: Option<DateTime<Utc>>,
    pub monitors: HashMap<String, MonitorId>,
    pub channels: HashMap<String, ChannelId>,

    pub last_outcome: Option<TickOutcome>,
    pub last_swept: Option<usize>,
    pub last_error: Option<polystatus::PolyStatusError>,
}

impl PolyStatusWorld {
    /// Lazily wire an engine over an in-memory store and the recording client
    pub fn engine(&mut self) -> &PolyStatus {
        if self.engine.is_none() {
            let store = Arc::clone(self.store.get_or_insert_with(|| Arc::new(MemoryStore::new())));
            let http = Arc::clone(
                self.http
                    .get_or_insert_with(|| Arc::new(RecordingHttpClient::default())),
            );
            self.engine = Some(PolyStatus::new(&Config::default(), store, http));
        }
        self.engine.as_ref().unwrap()
    }

    pub fn store(&mut self) -> Arc<MemoryStore> {
        self.engine();
        Arc::clone(self.store.as_ref().unwrap())
    }

    pub fn http(&mut self) -> Arc<RecordingHttpClient> {
        self.engine();
        Arc::clone(self.http.as_ref().unwrap())
    }

    pub fn t0(&mut self) -> DateTime<Utc> {
        *self.t0.get_or_insert_with(Utc::now)
    }

    pub fn monitor_id(&self, name: &str) -> MonitorId {
        *self
            .monitors
            .get(name)
            .unwrap_or_else(|| panic!("unknown monitor {name}"))
    }
}
