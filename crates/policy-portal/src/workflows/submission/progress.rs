use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const STEP_COUNT: usize = 4;

pub const DEFAULT_STEP_LABELS: [&str; STEP_COUNT] = [
    "Verifying Identity...",
    "Assessing Risk Score...",
    "Connecting to Legacy Core...",
    "Generating Policy...",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub id: u8,
    pub label: String,
    pub active: bool,
    pub completed: bool,
}

/// Visible state of the processing stepper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    steps: Vec<ProgressStep>,
}

impl ProgressState {
    fn new(labels: &[String; STEP_COUNT]) -> Self {
        let steps = labels
            .iter()
            .zip(1u8..)
            .map(|(label, id)| ProgressStep {
                id,
                label: label.clone(),
                active: false,
                completed: false,
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn active_step(&self) -> Option<&ProgressStep> {
        self.steps.iter().find(|step| step.active)
    }

    pub fn is_idle(&self) -> bool {
        self.steps.iter().all(|step| !step.active && !step.completed)
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|step| step.completed && !step.active)
    }

    fn activate(&mut self, index: usize) {
        for (position, step) in self.steps.iter_mut().enumerate() {
            step.active = position == index;
            step.completed = position < index;
        }
    }

    fn complete_all(&mut self) {
        for step in &mut self.steps {
            step.active = false;
            step.completed = true;
        }
    }

    fn clear(&mut self) {
        for step in &mut self.steps {
            step.active = false;
            step.completed = false;
        }
    }
}

/// How a progress run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRun {
    Completed,
    Cancelled,
}

/// Growing delay before each step activates. Step `n` waits `base × n`.
pub fn paced_delays(base: Duration) -> [Duration; STEP_COUNT] {
    let mut delays = [Duration::ZERO; STEP_COUNT];
    for (multiplier, delay) in (1u32..).zip(delays.iter_mut()) {
        *delay = base * multiplier;
    }
    delays
}

/// Timed stepper that paces the processing screen independently of the network call.
#[derive(Debug)]
pub struct ProgressSimulator {
    delays: [Duration; STEP_COUNT],
    state: Mutex<ProgressState>,
    cancel: Mutex<CancellationToken>,
}

impl ProgressSimulator {
    pub fn new(labels: [String; STEP_COUNT], delays: [Duration; STEP_COUNT]) -> Self {
        Self {
            state: Mutex::new(ProgressState::new(&labels)),
            delays,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_default_labels(delays: [Duration; STEP_COUNT]) -> Self {
        Self::new(DEFAULT_STEP_LABELS.map(str::to_string), delays)
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state().clone()
    }

    /// Invalidates any previous run, clears the steps, and hands out the token for a new run.
    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        {
            let mut current = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            current.cancel();
            *current = token.clone();
        }
        self.state().clear();
        token
    }

    /// Advances through the steps on the fixed schedule until done or cancelled.
    pub async fn run(&self, token: CancellationToken) -> ProgressRun {
        for (index, delay) in self.delays.iter().enumerate() {
            tokio::select! {
                _ = token.cancelled() => return ProgressRun::Cancelled,
                _ = tokio::time::sleep(*delay) => {}
            }

            let mut state = self.state();
            // re-checked under the lock so a concurrent halt always wins
            if token.is_cancelled() {
                return ProgressRun::Cancelled;
            }
            state.activate(index);
            debug!(step = index + 1, "progress step active");
        }
        ProgressRun::Completed
    }

    /// Marks every step completed, unless the run behind `token` was cancelled.
    pub fn finish(&self, token: &CancellationToken) {
        let mut state = self.state();
        if !token.is_cancelled() {
            state.complete_all();
        }
    }

    /// Cancels the current run and clears the steps.
    pub fn halt(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
        self.state().clear();
    }

    /// Halts only if `token` still belongs to the current run.
    pub fn halt_run(&self, token: &CancellationToken) {
        // `begin` cancels every older token, so a live token is the current run
        if token.is_cancelled() {
            return;
        }
        token.cancel();
        self.state().clear();
    }
}
