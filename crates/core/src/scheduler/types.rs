//! Types for the upload scheduler.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::photo_api::PhotoApiError;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Missing session fields, empty media pool or unusable settings.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The session was rejected by the service.
    #[error("session validation failed: {0}")]
    Validation(PhotoApiError),

    /// No upload destination could be obtained.
    #[error("failed to get upload destination: {0}")]
    Destination(PhotoApiError),
}

/// Scheduler lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Init,
    Validating,
    FetchingDestination,
    IterationRunning { iteration: usize },
    IterationDraining { iteration: usize },
    Done,
    FatalAborted,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Init => write!(f, "init"),
            SchedulerState::Validating => write!(f, "validating"),
            SchedulerState::FetchingDestination => write!(f, "fetching_destination"),
            SchedulerState::IterationRunning { iteration } => {
                write!(f, "iteration_running({})", iteration)
            }
            SchedulerState::IterationDraining { iteration } => {
                write!(f, "iteration_draining({})", iteration)
            }
            SchedulerState::Done => write!(f, "done"),
            SchedulerState::FatalAborted => write!(f, "fatal_aborted"),
        }
    }
}

/// Protocol step at which an upload attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Payload build or transfer to the upload server.
    Upload,
    /// Saving the uploaded photos into the album.
    Commit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone)]
pub enum OutcomeStatus {
    Ok { saved: usize },
    Failed { stage: Stage, error: PhotoApiError },
}

/// What one worker reports back to the scheduler.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Iteration number, starting at 1.
    pub iteration: usize,
    /// Worker index within the iteration, starting at 0.
    pub worker: usize,
    /// Time from attempt start to the last protocol step.
    pub elapsed: Duration,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, OutcomeStatus::Ok { .. })
    }

    /// Failing stage, if the attempt failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        match &self.status {
            OutcomeStatus::Failed { stage, .. } => Some(*stage),
            OutcomeStatus::Ok { .. } => None,
        }
    }

    /// Label used for metrics ("ok", "upload_failed", "commit_failed").
    pub fn result_label(&self) -> &'static str {
        match self.failed_stage() {
            None => "ok",
            Some(Stage::Upload) => "upload_failed",
            Some(Stage::Commit) => "commit_failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        match &self.status {
            OutcomeStatus::Ok { saved } => {
                write!(f, "{:.2}s ok, {} photos saved", secs, saved)
            }
            OutcomeStatus::Failed { stage, error } => {
                write!(f, "{:.2}s err, {}, {}", secs, stage, error)
            }
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: usize,
    /// Outcomes in the order they were received.
    pub outcomes: Vec<Outcome>,
}

impl RunSummary {
    pub fn attempts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: OutcomeStatus) -> Outcome {
        Outcome {
            iteration: 1,
            worker: 0,
            elapsed: Duration::from_millis(1250),
            status,
        }
    }

    #[test]
    fn test_outcome_display_ok() {
        let o = outcome(OutcomeStatus::Ok { saved: 5 });
        assert_eq!(o.to_string(), "1.25s ok, 5 photos saved");
        assert!(o.is_ok());
        assert_eq!(o.result_label(), "ok");
    }

    #[test]
    fn test_outcome_display_failed() {
        let o = outcome(OutcomeStatus::Failed {
            stage: Stage::Commit,
            error: PhotoApiError::RemoteRejected {
                code: 9,
                message: "Flood control".to_string(),
            },
        });
        assert_eq!(
            o.to_string(),
            "1.25s err, commit, Error_code = 9: Flood control"
        );
        assert_eq!(o.failed_stage(), Some(Stage::Commit));
        assert_eq!(o.result_label(), "commit_failed");
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            iterations: 1,
            outcomes: vec![
                outcome(OutcomeStatus::Ok { saved: 5 }),
                outcome(OutcomeStatus::Failed {
                    stage: Stage::Upload,
                    error: PhotoApiError::Timeout,
                }),
            ],
        };
        assert_eq!(summary.attempts(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SchedulerState::Validating.to_string(), "validating");
        assert_eq!(
            SchedulerState::IterationDraining { iteration: 3 }.to_string(),
            "iteration_draining(3)"
        );
    }

    #[test]
    fn test_error_display() {
        let err = SchedulerError::Destination(PhotoApiError::UnexpectedResponse(
            "no upload_url".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "failed to get upload destination: Unexpected server response: no upload_url"
        );
    }
}
