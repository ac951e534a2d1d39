use chrono::{NaiveDate, Utc};
use clap::Args;
use policy_portal::config::AppConfig;
use policy_portal::error::AppError;
use policy_portal::telemetry;
use policy_portal::workflows::submission::{
    preset_for, ApplicationInput, ClassifiedError, ModeKind, PolicyIssued, PolicyWorkflow,
    SubmissionOutcome, TrafficLogEntry, WorkflowError, WorkflowState, STEP_COUNT,
};
use std::time::Duration;

const PROGRESS_POLL: Duration = Duration::from_millis(50);

#[derive(Args, Debug, Default)]
pub(crate) struct SubmitArgs {
    /// Applicant full name (defaults to the demo applicant)
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Applicant national id. 2222 is referred by the stub backend.
    #[arg(long)]
    pub(crate) national_id: Option<String>,
    /// Coverage amount in whole currency units
    #[arg(long)]
    pub(crate) coverage: Option<String>,
    /// Integration mode to submit through: direct or gateway
    #[arg(long, value_parser = parse_mode)]
    pub(crate) mode: Option<ModeKind>,
    /// Print the recorded request and response after the decision
    #[arg(long)]
    pub(crate) show_traffic: bool,
}

fn parse_mode(raw: &str) -> Result<ModeKind, String> {
    raw.parse()
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let workflow = PolicyWorkflow::from_config(&config)?;
    if let Some(kind) = args.mode {
        workflow.select_mode(config.integration.mode(kind));
    }

    let demo = ApplicationInput::demo();
    let coverage = args
        .coverage
        .unwrap_or_else(|| demo.coverage_amount.to_string());
    let input = match ApplicationInput::from_form(
        args.name.as_deref().unwrap_or(&demo.full_name),
        args.national_id.as_deref().unwrap_or(&demo.national_id),
        &coverage,
    ) {
        Ok(input) => input,
        Err(err) => {
            render_error(&ClassifiedError::from(&err));
            return Ok(());
        }
    };

    workflow.start()?;
    let mode = workflow.mode();
    println!("Policy submission");
    println!("  Mode: {} ({})", mode.kind(), mode.base_url());
    println!("  Applicant: {} / {}", input.full_name, input.national_id);
    println!(
        "  Coverage: {}{} | estimated premium {:.2}/month",
        input.coverage_amount,
        preset_for(input.coverage_amount)
            .map(|preset| format!(" ({})", preset.description))
            .unwrap_or_default(),
        input.estimated_premium()
    );
    println!();

    let submission = workflow.submit(input.clone());
    tokio::pin!(submission);
    let mut ticker = tokio::time::interval(PROGRESS_POLL);
    let mut shown = 0u8;
    let settled = loop {
        tokio::select! {
            settled = &mut submission => break settled,
            _ = ticker.tick() => {
                let progress = workflow.progress();
                if let Some(step) = progress.active_step() {
                    if step.id != shown {
                        println!("  [{}/{}] {}", step.id, STEP_COUNT, step.label);
                        shown = step.id;
                    }
                }
            }
        }
    };

    match settled {
        Ok(WorkflowState::Success) | Ok(WorkflowState::Referred) => {
            render_decision(&input, workflow.outcome())
        }
        Ok(_) => {
            if let Some(error) = workflow.error() {
                render_error(&error);
            }
        }
        Err(WorkflowError::Validation(err)) => render_error(&ClassifiedError::from(&err)),
        Err(err) => return Err(err.into()),
    }

    if args.show_traffic {
        render_traffic(workflow.last_traffic());
    }

    Ok(())
}

fn render_decision(input: &ApplicationInput, outcome: Option<SubmissionOutcome>) {
    match outcome {
        Some(SubmissionOutcome::Success(policy)) => {
            println!("\nPolicy issued");
            for line in certificate_lines(input, &policy, Utc::now().date_naive()) {
                println!("  {line}");
            }
        }
        Some(SubmissionOutcome::Referred(referral)) => {
            println!("\nApplication referred for manual review");
            println!("  Reason: {}", referral.reason_or_default());
        }
        Some(SubmissionOutcome::Failure(failure)) => render_error(&failure.error),
        None => {}
    }
}

/// Certificate body. The premium is whatever the backend quoted, never the local estimate.
fn certificate_lines(
    input: &ApplicationInput,
    policy: &PolicyIssued,
    issued_on: NaiveDate,
) -> Vec<String> {
    let premium = policy
        .premium
        .map(|premium| format!("{premium:.2}"))
        .unwrap_or_else(|| "N/A".to_string());

    vec![
        format!("Policy ID: {}", policy.policy_id),
        format!("Status: {}", policy.status),
        format!("Policyholder: {}", input.full_name),
        format!("Coverage: {}", input.coverage_amount),
        format!("Monthly premium: {premium}"),
        format!("Issue date: {}", issued_on.format("%Y-%m-%d")),
    ]
}

fn render_error(error: &ClassifiedError) {
    println!("\n{}", error.title);
    println!("  {}", error.detail);
}

fn render_traffic(entry: Option<TrafficLogEntry>) {
    println!("\nTraffic");
    match entry {
        Some(entry) => match serde_json::to_string_pretty(&entry) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("  unable to render traffic: {err}"),
        },
        None => println!("  no request recorded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flag_accepts_both_spellings() {
        assert_eq!(parse_mode("gateway"), Ok(ModeKind::GatewayFronted));
        assert_eq!(parse_mode("DIRECT"), Ok(ModeKind::DirectIntegrator));
        assert!(parse_mode("ftp").is_err());
    }

    fn issued_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
    }

    #[test]
    fn certificate_shows_quoted_premium_and_issue_date() {
        let policy = PolicyIssued {
            policy_id: "POL-123".to_string(),
            status: "Active".to_string(),
            premium: Some(250.0),
        };
        let lines = certificate_lines(&ApplicationInput::demo(), &policy, issued_on());

        assert!(lines.contains(&"Policy ID: POL-123".to_string()));
        assert!(lines.contains(&"Policyholder: John Doe".to_string()));
        assert!(lines.contains(&"Monthly premium: 250.00".to_string()));
        assert!(lines.contains(&"Issue date: 2025-03-14".to_string()));
    }

    #[test]
    fn certificate_without_quoted_premium_never_shows_the_estimate() {
        let policy = PolicyIssued {
            policy_id: "POL-9".to_string(),
            status: "Active".to_string(),
            premium: None,
        };
        let lines = certificate_lines(&ApplicationInput::demo(), &policy, issued_on());

        assert!(lines.contains(&"Monthly premium: N/A".to_string()));
        assert!(lines.iter().all(|line| !line.contains("250")));
    }
}
