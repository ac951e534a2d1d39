use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;

use super::adapter::IntegrationAdapter;
use super::classifier::ClassifiedError;
use super::domain::{ApplicationInput, ValidationError};
use super::mode::IntegrationMode;
use super::outcome::{PolicyIssued, SubmissionOutcome};
use super::progress::{paced_delays, ProgressRun, ProgressSimulator, ProgressState};
use super::traffic::{TrafficLogEntry, TrafficRecorder};
use super::transport::{HttpTransport, SubmissionTransport};

/// Screen the portal is on. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Dashboard,
    Wizard,
    Processing,
    Success,
    Referred,
}

impl WorkflowState {
    pub fn label(self) -> &'static str {
        match self {
            WorkflowState::Dashboard => "dashboard",
            WorkflowState::Wizard => "wizard",
            WorkflowState::Processing => "processing",
            WorkflowState::Success => "success",
            WorkflowState::Referred => "referred",
        }
    }

    /// Transition table. `Reset` is accepted everywhere.
    pub fn on(self, event: WorkflowEvent) -> Result<WorkflowState, WorkflowError> {
        use WorkflowEvent as E;
        use WorkflowState as S;

        match (self, event) {
            (_, E::Reset) => Ok(S::Dashboard),
            (S::Dashboard, E::Start) => Ok(S::Wizard),
            (S::Wizard, E::Submit) => Ok(S::Processing),
            (S::Processing, E::Issued) => Ok(S::Success),
            (S::Processing, E::Referred) => Ok(S::Referred),
            (S::Processing, E::Failed) => Ok(S::Wizard),
            (from, event) => Err(WorkflowError::InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    Start,
    Submit,
    Issued,
    Referred,
    Failed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot apply {event:?} while on the {from} screen")]
    InvalidTransition {
        from: WorkflowState,
        event: WorkflowEvent,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("submission was superseded by a reset")]
    Superseded,
}

/// Fire-and-forget effect run when a policy is issued.
pub trait CelebrationHook: Send + Sync {
    fn celebrate(&self, policy: &PolicyIssued);
}

/// Default hook; the console front end has no confetti, so it logs instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCelebration;

impl CelebrationHook for TracingCelebration {
    fn celebrate(&self, policy: &PolicyIssued) {
        info!(policy_id = %policy.policy_id, "policy issued, celebrating");
    }
}

#[derive(Debug)]
struct Session {
    state: WorkflowState,
    mode: IntegrationMode,
    input: Option<ApplicationInput>,
    outcome: Option<SubmissionOutcome>,
    error: Option<ClassifiedError>,
    generation: u64,
}

/// Top-level controller for one portal session.
///
/// Owns the screen state and composes the adapter, the progress stepper, and
/// the traffic recorder. All methods take `&self`, so `reset` can be called
/// while a `submit` future is still pending on the same task.
pub struct PolicyWorkflow<T> {
    adapter: IntegrationAdapter<T>,
    progress: ProgressSimulator,
    traffic: TrafficRecorder,
    settle_delay: Duration,
    celebration: Box<dyn CelebrationHook>,
    session: Mutex<Session>,
}

impl<T> fmt::Debug for PolicyWorkflow<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyWorkflow")
            .field("adapter", &self.adapter)
            .field("progress", &self.progress)
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl<T> PolicyWorkflow<T>
where
    T: SubmissionTransport,
{
    pub fn new(
        transport: T,
        mode: IntegrationMode,
        progress: ProgressSimulator,
        settle_delay: Duration,
    ) -> Self {
        Self {
            adapter: IntegrationAdapter::new(transport),
            progress,
            traffic: TrafficRecorder::new(),
            settle_delay,
            celebration: Box::new(TracingCelebration),
            session: Mutex::new(Session {
                state: WorkflowState::Dashboard,
                mode,
                input: None,
                outcome: None,
                error: None,
                generation: 0,
            }),
        }
    }

    pub fn with_celebration(mut self, hook: impl CelebrationHook + 'static) -> Self {
        self.celebration = Box::new(hook);
        self
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dashboard → Wizard.
    pub fn start(&self) -> Result<WorkflowState, WorkflowError> {
        let mut session = self.session();
        session.state = session.state.on(WorkflowEvent::Start)?;
        session.error = None;
        Ok(session.state)
    }

    /// Takes effect for the next submission; an in-flight attempt keeps its mode.
    pub fn select_mode(&self, mode: IntegrationMode) {
        let mut session = self.session();
        info!(mode = %mode.kind(), "integration mode selected");
        session.mode = mode;
    }

    /// Returns to the dashboard and clears everything tied to the last attempt.
    pub fn reset(&self) -> WorkflowState {
        {
            let mut session = self.session();
            session.state = session
                .state
                .on(WorkflowEvent::Reset)
                .unwrap_or(WorkflowState::Dashboard);
            session.input = None;
            session.outcome = None;
            session.error = None;
            session.generation += 1;
        }
        self.progress.halt();
        self.traffic.clear();
        info!("portal session reset");
        WorkflowState::Dashboard
    }

    /// Submits the application and resolves once the workflow has settled.
    ///
    /// Failures return to the wizard as soon as the adapter reports them.
    /// Issued and referred outcomes wait for the progress stepper and the
    /// settle delay before the terminal screen is shown.
    pub async fn submit(&self, input: ApplicationInput) -> Result<WorkflowState, WorkflowError> {
        let (mode, generation) = self.enter_processing(&input)?;
        let token = self.progress.begin();

        let dispatch = self.adapter.submit(&input, &mode, &self.traffic);
        let pacing = self.progress.run(token.clone());
        tokio::pin!(dispatch);
        tokio::pin!(pacing);

        let mut paced = None;
        let outcome = loop {
            tokio::select! {
                outcome = &mut dispatch => break outcome,
                run = &mut pacing, if paced.is_none() => paced = Some(run),
            }
        };

        if outcome.is_failure() {
            self.progress.halt_run(&token);
            return self.settle(generation, outcome);
        }

        let run = match paced {
            Some(run) => run,
            None => pacing.await,
        };
        if run == ProgressRun::Cancelled {
            warn!(generation, "progress cancelled before the outcome could be shown");
            return Err(WorkflowError::Superseded);
        }

        self.progress.finish(&token);
        tokio::select! {
            _ = token.cancelled() => return Err(WorkflowError::Superseded),
            _ = tokio::time::sleep(self.settle_delay) => {}
        }

        self.settle(generation, outcome)
    }

    fn enter_processing(
        &self,
        input: &ApplicationInput,
    ) -> Result<(IntegrationMode, u64), WorkflowError> {
        let mut session = self.session();
        let next = session.state.on(WorkflowEvent::Submit)?;

        if let Err(err) = input.validate() {
            session.error = Some(ClassifiedError::from(&err));
            warn!(error = %err, "application rejected before dispatch");
            return Err(err.into());
        }

        session.state = next;
        session.input = Some(input.clone());
        session.outcome = None;
        session.error = None;
        session.generation += 1;

        info!(
            generation = session.generation,
            mode = %session.mode.kind(),
            "application submitted"
        );
        Ok((session.mode.clone(), session.generation))
    }

    fn settle(
        &self,
        generation: u64,
        outcome: SubmissionOutcome,
    ) -> Result<WorkflowState, WorkflowError> {
        let issued = {
            let mut session = self.session();
            if session.generation != generation || session.state != WorkflowState::Processing {
                warn!(generation, "discarding outcome of a superseded submission");
                return Err(WorkflowError::Superseded);
            }

            let event = match &outcome {
                SubmissionOutcome::Success(_) => WorkflowEvent::Issued,
                SubmissionOutcome::Referred(_) => WorkflowEvent::Referred,
                SubmissionOutcome::Failure(_) => WorkflowEvent::Failed,
            };
            session.state = session.state.on(event)?;

            let issued = match &outcome {
                SubmissionOutcome::Failure(failure) => {
                    session.error = Some(failure.error.clone());
                    None
                }
                SubmissionOutcome::Success(policy) => Some(policy.clone()),
                SubmissionOutcome::Referred(_) => None,
            };
            session.outcome = Some(outcome);
            info!(state = %session.state, "submission settled");
            issued
        };

        if let Some(policy) = issued {
            self.celebration.celebrate(&policy);
        }
        Ok(self.state())
    }

    pub fn state(&self) -> WorkflowState {
        self.session().state
    }

    pub fn mode(&self) -> IntegrationMode {
        self.session().mode.clone()
    }

    pub fn input(&self) -> Option<ApplicationInput> {
        self.session().input.clone()
    }

    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        self.session().outcome.clone()
    }

    pub fn error(&self) -> Option<ClassifiedError> {
        self.session().error.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.session().error.as_ref().map(ClassifiedError::message)
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.snapshot()
    }

    pub fn last_traffic(&self) -> Option<TrafficLogEntry> {
        self.traffic.last_entry()
    }

    pub fn traffic(&self) -> &TrafficRecorder {
        &self.traffic
    }
}

impl PolicyWorkflow<HttpTransport> {
    /// Wires the reqwest transport, initial mode, and pacing from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let integration = &config.integration;
        let transport = HttpTransport::new(integration.timeout, integration.insecure_tls)?;
        let progress = ProgressSimulator::with_default_labels(paced_delays(config.progress.step));
        Ok(Self::new(
            transport,
            integration.default_mode(),
            progress,
            config.progress.step,
        ))
    }
}
