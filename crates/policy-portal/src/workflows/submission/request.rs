use serde::{Deserialize, Serialize};

use super::domain::ApplicationInput;
use super::mode::{IntegrationMode, ModeKind, SubmissionHeaders};

pub const SUBMISSION_METHOD: &str = "POST";

/// JSON body expected by the policy submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBody {
    pub name: String,
    pub national_id: String,
    pub coverage_amount: u64,
}

impl From<&ApplicationInput> for SubmissionBody {
    fn from(input: &ApplicationInput) -> Self {
        Self {
            name: input.full_name.clone(),
            national_id: input.national_id.clone(),
            coverage_amount: input.coverage_amount,
        }
    }
}

/// Fully built outbound request for one submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: SubmissionHeaders,
    pub body: SubmissionBody,
    pub mode: ModeKind,
}

impl SubmissionRequest {
    pub fn build(input: &ApplicationInput, mode: &IntegrationMode) -> Self {
        Self {
            method: SUBMISSION_METHOD,
            url: mode.base_url().to_string(),
            headers: mode.headers(),
            body: SubmissionBody::from(input),
            mode: mode.kind(),
        }
    }

    /// The body exactly as it goes on the wire.
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.body)
    }
}
