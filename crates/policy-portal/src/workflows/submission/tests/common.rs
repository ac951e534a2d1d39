use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::workflows::submission::machine::{CelebrationHook, PolicyWorkflow};
use crate::workflows::submission::mode::{Credential, IntegrationMode};
use crate::workflows::submission::outcome::PolicyIssued;
use crate::workflows::submission::progress::{paced_delays, ProgressSimulator};
use crate::workflows::submission::request::SubmissionRequest;
use crate::workflows::submission::transport::{
    SubmissionTransport, TransportError, TransportResponse,
};

pub(super) const STEP: Duration = Duration::from_millis(100);
pub(super) const DIRECT_URL: &str = "http://localhost:9090/policy";
pub(super) const GATEWAY_URL: &str = "https://localhost:8300/policy/1.0.0/policy";
pub(super) const GATEWAY_TOKEN: &str =
    "eyJ4NXQiOiJNell4TW1Ga09HWXdNV0kwWldObU5EY3hOR1l3WW1NNFpUQTNNV0kyTkRBelpH";

/// Sum of the four paced step delays at `STEP`.
pub(super) fn full_progress() -> Duration {
    paced_delays(STEP).iter().sum()
}

#[derive(Debug)]
struct Scripted {
    delay: Duration,
    reply: Result<TransportResponse, TransportError>,
}

/// Transport that replays queued replies and remembers what it was asked to send.
#[derive(Debug, Clone, Default)]
pub(super) struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Scripted>>>,
    sent: Arc<Mutex<Vec<SubmissionRequest>>>,
}

impl ScriptedTransport {
    pub(super) fn json(self, status: u16, body: Value, delay: Duration) -> Self {
        self.raw(status, &body.to_string(), delay)
    }

    pub(super) fn raw(self, status: u16, body: &str, delay: Duration) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        self.push(
            delay,
            Ok(TransportResponse {
                status,
                status_text: status_text(status).to_string(),
                headers,
                body: body.to_string(),
                body_error: None,
            }),
        )
    }

    /// Status line arrives, then the connection drops mid-body.
    pub(super) fn truncated(self, status: u16, delay: Duration) -> Self {
        self.push(
            delay,
            Ok(TransportResponse {
                status,
                status_text: status_text(status).to_string(),
                headers: BTreeMap::new(),
                body: String::new(),
                body_error: Some("error decoding response body".to_string()),
            }),
        )
    }

    pub(super) fn unreachable(self, delay: Duration) -> Self {
        self.push(
            delay,
            Err(TransportError::Connect("connection refused".to_string())),
        )
    }

    fn push(self, delay: Duration, reply: Result<TransportResponse, TransportError>) -> Self {
        self.replies
            .lock()
            .expect("script mutex poisoned")
            .push_back(Scripted { delay, reply });
        self
    }

    pub(super) fn sent(&self) -> Vec<SubmissionRequest> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionTransport for ScriptedTransport {
    async fn send(&self, request: &SubmissionRequest) -> Result<TransportResponse, TransportError> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(request.clone());
        let scripted = self
            .replies
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .expect("a scripted reply for every send");
        tokio::time::sleep(scripted.delay).await;
        scripted.reply
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct RecordingCelebration {
    issued: Arc<Mutex<Vec<String>>>,
}

impl RecordingCelebration {
    pub(super) fn issued(&self) -> Vec<String> {
        self.issued.lock().expect("celebration mutex poisoned").clone()
    }
}

impl CelebrationHook for RecordingCelebration {
    fn celebrate(&self, policy: &PolicyIssued) {
        self.issued
            .lock()
            .expect("celebration mutex poisoned")
            .push(policy.policy_id.clone());
    }
}

pub(super) fn direct_mode() -> IntegrationMode {
    IntegrationMode::direct(DIRECT_URL)
}

pub(super) fn gateway_mode() -> IntegrationMode {
    IntegrationMode::gateway(GATEWAY_URL, Credential::new(GATEWAY_TOKEN))
}

pub(super) fn workflow(
    transport: ScriptedTransport,
    mode: IntegrationMode,
    celebration: RecordingCelebration,
) -> PolicyWorkflow<ScriptedTransport> {
    PolicyWorkflow::new(
        transport,
        mode,
        ProgressSimulator::with_default_labels(paced_delays(STEP)),
        STEP,
    )
    .with_celebration(celebration)
}
