use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{HttpTransport, Method, TransportError, TransportResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// Replays scripted outcomes in order and records every request. Once the
/// script runs out, requests fail as unreachable.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub fn push_ok(&self, status: u16, body: Value) {
        self.push(Ok(TransportResponse {
            status,
            body: serde_json::to_vec(&body).expect("encode body"),
        }));
    }

    pub fn push_no_content(&self) {
        self.push(Ok(TransportResponse {
            status: 204,
            body: Vec::new(),
        }));
    }

    pub fn push_http_error(&self, status: u16, body: Value) {
        self.push(Err(TransportError::Status {
            status,
            body: serde_json::to_vec(&body).expect("encode body"),
        }));
    }

    pub fn push(&self, outcome: Result<TransportResponse, TransportError>) {
        self.script.lock().expect("script lock").push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().expect("calls lock").push(RecordedCall {
            method,
            url: url.to_string(),
            body: body.cloned(),
        });
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Network {
                    message: "no scripted response".to_string(),
                })
            })
    }
}
