use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::classifier::{classify, ClassificationContext, ClassifiedError};
use super::domain::ApplicationInput;
use super::mode::IntegrationMode;
use super::outcome::{PolicyResponse, SubmissionFailure, SubmissionOutcome};
use super::request::SubmissionRequest;
use super::traffic::{ResponseSnapshot, TrafficRecorder};
use super::transport::{SubmissionTransport, TransportResponse};

/// Builds, sends, and normalizes a single submission attempt.
#[derive(Debug)]
pub struct IntegrationAdapter<T> {
    transport: T,
}

impl<T> IntegrationAdapter<T>
where
    T: SubmissionTransport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatches one attempt. Every failure comes back as `SubmissionOutcome::Failure`.
    pub async fn submit(
        &self,
        input: &ApplicationInput,
        mode: &IntegrationMode,
        traffic: &TrafficRecorder,
    ) -> SubmissionOutcome {
        let request = SubmissionRequest::build(input, mode);
        let attempt = traffic.record_request(&request);

        info!(
            mode = %request.mode,
            url = %request.url,
            authenticated = mode.credential().is_some(),
            "dispatching policy submission"
        );

        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(err) => {
                let message = err.to_string();
                warn!(mode = %request.mode, error = %message, "policy submission did not reach the backend");
                traffic.record_error(attempt, message.clone());
                let context = ClassificationContext {
                    mode: request.mode,
                    url: &request.url,
                    status_text: "",
                };
                return failure(classify(None, None, Some(message.as_str()), &context), None);
            }
        };

        info!(status = response.status, "policy submission answered");

        let context = ClassificationContext {
            mode: request.mode,
            url: &request.url,
            status_text: &response.status_text,
        };
        let parsed = serde_json::from_str::<Value>(&response.body);

        if !response.is_success() {
            let body = parsed.ok();
            traffic.record_response(attempt, snapshot(&response, body.clone(), true));
            let error = classify(Some(response.status), body.as_ref(), None, &context);
            warn!(status = response.status, title = %error.title, "policy submission rejected");
            return failure(error, Some(response.status));
        }

        if let Some(reason) = &response.body_error {
            traffic.record_response(attempt, snapshot(&response, None, true));
            warn!(status = response.status, error = %reason, "response body could not be read");
            return invalid_body(&response, reason, &context);
        }

        let decoded = parsed.map_err(|err| err.to_string()).map(|body| {
            let outcome = serde_json::from_value::<PolicyResponse>(body.clone())
                .map_err(|err| err.to_string())
                .and_then(PolicyResponse::into_outcome);
            (body, outcome)
        });

        match decoded {
            Ok((body, Ok(outcome))) => {
                traffic.record_response(attempt, snapshot(&response, Some(body), false));
                info!(outcome = outcome.label(), "policy submission decided");
                outcome
            }
            Ok((body, Err(reason))) => {
                traffic.record_response(attempt, snapshot(&response, Some(body), true));
                invalid_body(&response, &reason, &context)
            }
            Err(reason) => {
                traffic.record_response(attempt, snapshot(&response, None, true));
                invalid_body(&response, &reason, &context)
            }
        }
    }
}

fn invalid_body(
    response: &TransportResponse,
    reason: &str,
    context: &ClassificationContext<'_>,
) -> SubmissionOutcome {
    warn!(status = response.status, %reason, "policy submission returned an unreadable body");
    let error = classify(Some(response.status), None, Some(reason), context);
    failure(error, Some(response.status))
}

fn failure(error: ClassifiedError, raw_status: Option<u16>) -> SubmissionOutcome {
    SubmissionOutcome::Failure(SubmissionFailure { error, raw_status })
}

fn snapshot(response: &TransportResponse, body: Option<Value>, error: bool) -> ResponseSnapshot {
    ResponseSnapshot {
        timestamp: Utc::now(),
        status: response.status,
        status_text: response.status_text.clone(),
        headers: response.headers.clone(),
        body,
        error,
    }
}
