//! Policy submission workflow: wizard input, dispatch through one of two
//! integration modes, and the screen state machine that paces the result.

pub mod adapter;
pub mod classifier;
pub mod domain;
pub mod machine;
pub mod mode;
pub mod outcome;
pub mod progress;
pub mod request;
pub mod traffic;
pub mod transport;

#[cfg(test)]
mod tests;

pub use adapter::IntegrationAdapter;
pub use classifier::{classify, ClassificationContext, ClassifiedError, ErrorKind};
pub use domain::{
    estimated_premium, preset_for, ApplicationInput, CoveragePreset, ValidationError,
    COVERAGE_PRESETS, MINIMUM_COVERAGE,
};
pub use machine::{
    CelebrationHook, PolicyWorkflow, TracingCelebration, WorkflowError, WorkflowEvent,
    WorkflowState,
};
pub use mode::{mask_secret, Credential, IntegrationMode, ModeKind, SubmissionHeaders};
pub use outcome::{PolicyIssued, Referral, SubmissionFailure, SubmissionOutcome};
pub use progress::{
    paced_delays, ProgressRun, ProgressSimulator, ProgressState, ProgressStep,
    DEFAULT_STEP_LABELS, STEP_COUNT,
};
pub use request::{SubmissionBody, SubmissionRequest};
pub use traffic::{
    ErrorSnapshot, ExchangeSnapshot, RequestSnapshot, ResponseSnapshot, TrafficLogEntry,
    TrafficRecorder,
};
pub use transport::{HttpTransport, SubmissionTransport, TransportError, TransportResponse};
