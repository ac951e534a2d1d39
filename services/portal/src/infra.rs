use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use policy_portal::workflows::submission::{estimated_premium, SubmissionBody};
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const REFERRAL_NATIONAL_ID: &str = "2222";
pub(crate) const REFERRAL_REASON: &str = "High risk score";

/// Reply the stub backend sends for one submission.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StubReply {
    pub(crate) status: u16,
    pub(crate) body: Value,
}

/// Status forced by the `94xx`/`95xx` test identities.
fn forced_status(national_id: &str) -> Option<(u16, &'static str)> {
    match national_id {
        "9401" => Some((401, "Invalid Credentials")),
        "9403" => Some((403, "Subscription does not allow policy submissions.")),
        "9429" => Some((429, "Rate limit of 10 requests per minute exceeded.")),
        "9500" => Some((500, "Core system timed out while generating the policy.")),
        "9503" => Some((503, "Underwriting engine is offline for maintenance.")),
        _ => None,
    }
}

/// Deterministic underwriting decision keyed on the applicant's national id.
pub(crate) fn stub_decision(body: &SubmissionBody, issued_at: DateTime<Utc>) -> StubReply {
    let national_id = body.national_id.trim();

    if national_id == REFERRAL_NATIONAL_ID {
        return StubReply {
            status: 200,
            body: json!({ "status": "Referred", "reason": REFERRAL_REASON }),
        };
    }

    if let Some((status, message)) = forced_status(national_id) {
        return StubReply {
            status,
            body: json!({ "message": message }),
        };
    }

    StubReply {
        status: 200,
        body: json!({
            "policyId": format!("POL-{}", issued_at.timestamp_millis()),
            "status": "Active",
            "premium": estimated_premium(body.coverage_amount),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn body(national_id: &str) -> SubmissionBody {
        SubmissionBody {
            name: "John Doe".to_string(),
            national_id: national_id.to_string(),
            coverage_amount: 100_000,
        }
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn ordinary_applicant_gets_active_policy() {
        let reply = stub_decision(&body("1111"), issued_at());
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["policyId"], "POL-1700000000123");
        assert_eq!(reply.body["status"], "Active");
        assert_eq!(reply.body["premium"], 250.0);
    }

    #[test]
    fn referral_identity_is_referred() {
        let reply = stub_decision(&body("2222"), issued_at());
        assert_eq!(reply.status, 200);
        assert_eq!(
            reply.body,
            json!({ "status": "Referred", "reason": "High risk score" })
        );
    }

    #[test]
    fn error_identities_force_their_status() {
        for (id, status) in [
            ("9401", 401),
            ("9403", 403),
            ("9429", 429),
            ("9500", 500),
            ("9503", 503),
        ] {
            let reply = stub_decision(&body(id), issued_at());
            assert_eq!(reply.status, status, "national id {id}");
            assert!(reply.body["message"].is_string());
        }
    }
}
