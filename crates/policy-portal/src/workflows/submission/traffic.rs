use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::request::SubmissionRequest;

/// Outbound request as shown in the traffic panel; credentials already truncated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl RequestSnapshot {
    fn capture(request: &SubmissionRequest, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            method: request.method.to_string(),
            url: request.url.clone(),
            headers: request.headers.redacted(),
            body: request.body_json().unwrap_or_else(|err| {
                warn!(error = %err, "request body could not be captured");
                Value::Null
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSnapshot {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub error: bool,
}

/// Transport failure with no HTTP response behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExchangeSnapshot {
    Response(ResponseSnapshot),
    Error(ErrorSnapshot),
}

/// Last request together with whatever came back for it, if anything yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficLogEntry {
    pub request: RequestSnapshot,
    pub exchange: Option<ExchangeSnapshot>,
}

impl TrafficLogEntry {
    pub fn is_pending(&self) -> bool {
        self.exchange.is_none()
    }
}

/// Handle tying a response to the request that opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptId(u64);

#[derive(Debug, Default)]
struct RecorderState {
    attempt: u64,
    entry: Option<TrafficLogEntry>,
}

/// Keeps only the most recent attempt. Writes for a superseded attempt are dropped.
#[derive(Debug, Default)]
pub struct TrafficRecorder {
    state: Mutex<RecorderState>,
}

impl TrafficRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new attempt, replacing whatever was recorded before.
    pub fn record_request(&self, request: &SubmissionRequest) -> AttemptId {
        let snapshot = RequestSnapshot::capture(request, Utc::now());
        let mut state = self.lock();
        state.attempt += 1;
        state.entry = Some(TrafficLogEntry {
            request: snapshot,
            exchange: None,
        });
        AttemptId(state.attempt)
    }

    pub fn record_response(&self, attempt: AttemptId, response: ResponseSnapshot) {
        self.attach(attempt, ExchangeSnapshot::Response(response));
    }

    pub fn record_error(&self, attempt: AttemptId, message: impl Into<String>) {
        self.attach(
            attempt,
            ExchangeSnapshot::Error(ErrorSnapshot {
                timestamp: Utc::now(),
                message: message.into(),
            }),
        );
    }

    fn attach(&self, attempt: AttemptId, exchange: ExchangeSnapshot) {
        let mut state = self.lock();
        if state.attempt != attempt.0 {
            tracing::debug!(attempt = attempt.0, "dropping traffic for superseded attempt");
            return;
        }
        if let Some(entry) = state.entry.as_mut() {
            entry.exchange = Some(exchange);
        }
    }

    /// Forgets the current entry and invalidates any attempt still in flight.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.attempt += 1;
        state.entry = None;
    }

    pub fn last_entry(&self) -> Option<TrafficLogEntry> {
        self.lock().entry.clone()
    }

    pub fn last_request(&self) -> Option<RequestSnapshot> {
        self.lock().entry.as_ref().map(|entry| entry.request.clone())
    }

    pub fn last_response(&self) -> Option<ExchangeSnapshot> {
        self.lock()
            .entry
            .as_ref()
            .and_then(|entry| entry.exchange.clone())
    }
}
