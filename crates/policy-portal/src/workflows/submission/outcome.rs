use serde::{Deserialize, Serialize};

use super::classifier::ClassifiedError;

pub const STATUS_REFERRED: &str = "Referred";
pub const STATUS_ACTIVE: &str = "Active";

/// Shown on the referral screen when the collaborator gives no reason.
pub const DEFAULT_REFERRAL_REASON: &str =
    "Your application requires manual review by our underwriting team.";

/// Policy issued by the underwriting backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyIssued {
    pub policy_id: String,
    pub status: String,
    pub premium: Option<f64>,
}

/// Application routed to manual underwriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub status: String,
    pub reason: Option<String>,
}

impl Referral {
    pub fn reason_or_default(&self) -> &str {
        self.reason
            .as_deref()
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or(DEFAULT_REFERRAL_REASON)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFailure {
    pub error: ClassifiedError,
    pub raw_status: Option<u16>,
}

/// Single classified result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Success(PolicyIssued),
    Referred(Referral),
    Failure(SubmissionFailure),
}

impl SubmissionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SubmissionOutcome::Failure(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success(_) => "success",
            SubmissionOutcome::Referred(_) => "referred",
            SubmissionOutcome::Failure(_) => "failure",
        }
    }
}

/// Success body returned by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PolicyResponse {
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub premium: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl PolicyResponse {
    /// Splits a decoded body into referral or issued policy.
    pub(crate) fn into_outcome(self) -> Result<SubmissionOutcome, String> {
        if self.status.as_deref() == Some(STATUS_REFERRED) {
            return Ok(SubmissionOutcome::Referred(Referral {
                status: STATUS_REFERRED.to_string(),
                reason: self.reason,
            }));
        }

        let policy_id = self
            .policy_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "response did not include a policyId".to_string())?;

        Ok(SubmissionOutcome::Success(PolicyIssued {
            policy_id,
            status: self.status.unwrap_or_else(|| STATUS_ACTIVE.to_string()),
            premium: self.premium,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<SubmissionOutcome, String> {
        serde_json::from_value::<PolicyResponse>(value)
            .map_err(|err| err.to_string())?
            .into_outcome()
    }

    #[test]
    fn referred_status_wins_even_with_policy_id() {
        let outcome = decode(json!({"policyId": "POL-9", "status": "Referred"})).unwrap();
        match outcome {
            SubmissionOutcome::Referred(referral) => {
                assert_eq!(referral.reason, None);
                assert_eq!(referral.reason_or_default(), DEFAULT_REFERRAL_REASON);
            }
            other => panic!("expected referral, got {other:?}"),
        }
    }

    #[test]
    fn missing_status_defaults_to_active() {
        let outcome = decode(json!({"policyId": "POL-1", "premium": 99.5})).unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Success(PolicyIssued {
                policy_id: "POL-1".to_string(),
                status: "Active".to_string(),
                premium: Some(99.5),
            })
        );
    }

    #[test]
    fn issued_policy_requires_an_identifier() {
        let error = decode(json!({"status": "Active"})).unwrap_err();
        assert!(error.contains("policyId"));
    }
}
