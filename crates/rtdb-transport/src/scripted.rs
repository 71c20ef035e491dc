//! Scripted transport for asserting exact wire traffic.
//!
//! [`ScriptedTransport`] answers requests from a queue of canned responses
//! and records every request it receives. When the queue is empty it falls
//! back to an optional default response, and otherwise fails with
//! [`TransportError::Exhausted`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rtdb_protocol::{WireRequest, WireResponse};
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<WireResponse>,
    fallback: Option<WireResponse>,
    requests: Vec<WireRequest>,
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered request.
    pub fn enqueue(&self, response: WireResponse) -> &Self {
        self.lock().queue.push_back(response);
        self
    }

    /// Queue a JSON response.
    pub fn enqueue_json(&self, status: u16, value: &Value) -> &Self {
        self.enqueue(WireResponse::json(status, value))
    }

    /// Response used once the queue runs dry.
    pub fn set_fallback(&self, response: WireResponse) {
        self.lock().fallback = Some(response);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.lock().requests.clone()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the recorded traffic.
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> TransportResult<WireResponse> {
        let mut script = self.lock();
        let method = request.method.to_string();
        let path = request.path.clone();
        script.requests.push(request);
        match script.queue.pop_front() {
            Some(response) => Ok(response),
            None => script
                .fallback
                .clone()
                .ok_or(TransportError::Exhausted { method, path }),
        }
    }
}
