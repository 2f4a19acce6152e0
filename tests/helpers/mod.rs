//! Test helper utilities for API and tracker tests

#![allow(dead_code)]

use bytes::Bytes;
use pcap_tracker::{
    config::ClientConfig,
    models::upload::Payload,
    services::{
        api::ApiClient,
        bridge::EventPusher,
        transfer::{Transport, TransportEvent},
    },
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Transport that replays a fixed list of events instead of touching the
/// network, recording every transfer it was asked to start.
pub struct ScriptedTransport {
    script: Vec<TransportEvent>,
    pub started: Mutex<Vec<(String, String, u64)>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<TransportEvent>) -> Arc<Self> {
        Arc::new(Self {
            script,
            started: Mutex::new(Vec::new()),
        })
    }
}

impl Transport for ScriptedTransport {
    fn start(&self, url: String, payload: Payload, events: EventPusher<TransportEvent>) {
        self.started
            .lock()
            .unwrap()
            .push((url, payload.filename.clone(), payload.len()));
        for event in self.script.clone() {
            events.push(event);
        }
    }
}

pub fn load(status: u16, body: Value) -> TransportEvent {
    TransportEvent::Load {
        status,
        status_text: "OK".to_string(),
        body: Bytes::from(body.to_string()),
    }
}

pub fn progress(loaded: u64, total: u64) -> TransportEvent {
    TransportEvent::Progress { loaded, total }
}

/// Client pointed at a mock server's `/api` prefix.
pub fn api_for(server: &MockServer) -> ApiClient {
    ApiClient::new(config_for(server)).expect("client builds")
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::with_base_url(format!("{}/api", server.uri()))
}

/// Serve `body` as JSON for GET requests to `route`.
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
