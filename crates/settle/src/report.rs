//! Step reporting.
//!
//! Every assertion and interaction is bracketed by a step: `begin_step`
//! before the operation, `commit_step` with its status afterwards. The pair
//! stays balanced even when the operation returns an error or panics.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::result::SettleResult;

/// Final status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// The operation succeeded
    Passed,
    /// The operation failed or panicked
    Failed,
}

impl EventStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Receives begin/commit pairs for every step
pub trait StepReporter: Send + Sync {
    /// A step starts. `subject` describes the element, `description` the operation.
    fn begin_step(&self, subject: &str, description: &str);

    /// The most recently begun step ends
    fn commit_step(&self, status: EventStatus);
}

/// Reporter that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StepReporter for TracingReporter {
    fn begin_step(&self, subject: &str, description: &str) {
        info!(subject, description, "step started");
    }

    fn commit_step(&self, status: EventStatus) {
        match status {
            EventStatus::Passed => info!(?status, "step finished"),
            EventStatus::Failed => warn!(?status, "step finished"),
        }
    }
}

/// A completed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Unique step id
    pub id: String,
    /// Element the step acted on
    pub subject: String,
    /// What the step did, e.g. `should be visible`
    pub description: String,
    /// Outcome
    pub status: EventStatus,
    /// Wall time between begin and commit
    pub duration: Duration,
}

#[derive(Debug)]
struct OpenStep {
    id: Uuid,
    subject: String,
    description: String,
    started: Instant,
}

#[derive(Debug, Default)]
struct Recorded {
    open: Vec<OpenStep>,
    events: Vec<StepEvent>,
}

/// Reporter that keeps every completed step in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    inner: Mutex<Recorded>,
}

impl RecordingReporter {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Completed steps in commit order
    #[must_use]
    pub fn events(&self) -> Vec<StepEvent> {
        self.lock().events.clone()
    }

    /// Steps begun but not yet committed
    #[must_use]
    pub fn open_steps(&self) -> usize {
        self.lock().open.len()
    }

    /// Descriptions of completed steps, for compact assertions
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .map(|e| e.description.clone())
            .collect()
    }
}

impl StepReporter for RecordingReporter {
    fn begin_step(&self, subject: &str, description: &str) {
        self.lock().open.push(OpenStep {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            description: description.to_string(),
            started: Instant::now(),
        });
    }

    fn commit_step(&self, status: EventStatus) {
        let mut recorded = self.lock();
        if let Some(step) = recorded.open.pop() {
            recorded.events.push(StepEvent {
                id: step.id.to_string(),
                subject: step.subject,
                description: step.description,
                status,
                duration: step.started.elapsed(),
            });
        }
    }
}

/// Commits `Failed` on drop unless committed explicitly
pub(crate) struct StepGuard<'r> {
    reporter: &'r dyn StepReporter,
    committed: bool,
}

impl<'r> StepGuard<'r> {
    pub(crate) fn begin(reporter: &'r dyn StepReporter, subject: &str, description: &str) -> Self {
        reporter.begin_step(subject, description);
        Self {
            reporter,
            committed: false,
        }
    }

    pub(crate) fn commit(mut self, status: EventStatus) {
        self.committed = true;
        self.reporter.commit_step(status);
    }
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.reporter.commit_step(EventStatus::Failed);
        }
    }
}

/// Run `body` inside a step; its result is returned unchanged
pub(crate) fn run_step<T>(
    reporter: &dyn StepReporter,
    subject: &str,
    description: &str,
    body: impl FnOnce() -> SettleResult<T>,
) -> SettleResult<T> {
    let guard = StepGuard::begin(reporter, subject, description);
    let result = body();
    guard.commit(if result.is_ok() {
        EventStatus::Passed
    } else {
        EventStatus::Failed
    });
    result
}
