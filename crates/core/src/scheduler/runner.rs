//! Upload scheduler implementation.
//!
//! Drives a run through its lifecycle:
//! - Init: local precondition checks, no remote calls
//! - Validating / FetchingDestination: fatal on failure
//! - Iterations: `threads` concurrent workers, drained through one channel

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::media::MediaPool;
use crate::metrics;
use crate::payload::PayloadBuilder;
use crate::photo_api::{PhotoService, Session};

use super::config::SchedulerConfig;
use super::types::{Outcome, OutcomeStatus, RunSummary, SchedulerError, SchedulerState};
use super::worker::{run_upload, UploadContext};

/// Minimum capacity of the per-iteration outcome channel.
pub const OUTCOME_CHANNEL_CAPACITY: usize = 2048;

/// Runs upload iterations against a single upload destination.
pub struct UploadScheduler {
    config: SchedulerConfig,
    service: Arc<dyn PhotoService>,
    session: Arc<Session>,
    pool: Arc<MediaPool>,
    builder: PayloadBuilder,
}

impl UploadScheduler {
    /// Create a new scheduler.
    pub fn new(
        service: Arc<dyn PhotoService>,
        session: Session,
        pool: Arc<MediaPool>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            config,
            service,
            session: Arc::new(session),
            pool,
            builder: PayloadBuilder::default(),
        }
    }

    /// Replace the payload builder (e.g. a different fan-out).
    pub fn with_payload_builder(mut self, builder: PayloadBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Settings this scheduler runs with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every configured iteration.
    ///
    /// Only precondition, validation and destination failures end the run
    /// early. Worker failures are recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary, SchedulerError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        self.transition(SchedulerState::Init);
        self.check_preconditions()?;

        info!(
            run_id = %run_id,
            session = %self.session,
            service = self.service.name(),
            threads = self.config.threads,
            iterations = self.config.iterations,
            pictures = self.pool.pictures().len(),
            captions = self.pool.captions().len(),
            "Starting upload run"
        );

        self.transition(SchedulerState::Validating);
        if let Err(e) = self.service.validate(&self.session).await {
            self.transition(SchedulerState::FatalAborted);
            error!("Session {} rejected: {}", self.session, e);
            return Err(SchedulerError::Validation(e));
        }

        self.transition(SchedulerState::FetchingDestination);
        let destination = match self.service.upload_destination(&self.session).await {
            Ok(destination) => Arc::new(destination),
            Err(e) => {
                self.transition(SchedulerState::FatalAborted);
                error!("Failed to get upload destination: {}", e);
                return Err(SchedulerError::Destination(e));
            }
        };
        debug!(destination = %destination, "Upload destination acquired");

        let ctx = UploadContext {
            service: Arc::clone(&self.service),
            session: Arc::clone(&self.session),
            destination,
            pool: Arc::clone(&self.pool),
            builder: self.builder,
            attach_captions: self.config.attach_captions,
        };

        if self.config.trial_upload {
            self.trial_upload(&ctx).await;
        }

        let mut outcomes = Vec::with_capacity(self.config.threads * self.config.iterations);
        for iteration in 1..=self.config.iterations {
            outcomes.extend(self.run_iteration(&ctx, iteration).await);
            metrics::ITERATIONS_COMPLETED.inc();

            if iteration < self.config.iterations && self.config.cooldown_secs > 0 {
                debug!("Sleeping {}s before next iteration", self.config.cooldown_secs);
                tokio::time::sleep(Duration::from_secs(self.config.cooldown_secs)).await;
            }
        }

        self.transition(SchedulerState::Done);
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            iterations: self.config.iterations,
            outcomes,
        };
        info!(
            run_id = %run_id,
            attempts = summary.attempts(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Upload run finished"
        );
        if self.config.strict && !summary.all_succeeded() {
            warn!(
                "Strict mode: {} of {} upload attempts failed",
                summary.failed(),
                summary.attempts()
            );
        }
        Ok(summary)
    }

    fn check_preconditions(&self) -> Result<(), SchedulerError> {
        if let Some(field) = self.session.missing_field() {
            return Err(SchedulerError::Precondition(format!(
                "session {} is empty",
                field
            )));
        }
        if self.pool.pictures().is_empty() {
            return Err(SchedulerError::Precondition(
                "no pictures to upload".to_string(),
            ));
        }
        if self.config.attach_captions && self.pool.captions().is_empty() {
            return Err(SchedulerError::Precondition(
                "captions are enabled but none were loaded".to_string(),
            ));
        }
        if self.config.threads == 0 {
            return Err(SchedulerError::Precondition(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.config.iterations == 0 {
            return Err(SchedulerError::Precondition(
                "iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Spawn `threads` workers and wait for exactly that many outcomes.
    async fn run_iteration(&self, ctx: &UploadContext, iteration: usize) -> Vec<Outcome> {
        let threads = self.config.threads;
        let (tx, mut rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY.max(threads));

        self.transition(SchedulerState::IterationRunning { iteration });
        info!(
            "Iteration {}/{}: starting {} workers",
            iteration, self.config.iterations, threads
        );
        for worker in 0..threads {
            let ctx = ctx.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = run_upload(&ctx, iteration, worker).await;
                if tx.send(outcome).await.is_err() {
                    warn!(iteration, worker, "Outcome receiver dropped");
                }
            });
        }
        drop(tx);

        self.transition(SchedulerState::IterationDraining { iteration });
        let mut outcomes = Vec::with_capacity(threads);
        while outcomes.len() < threads {
            match rx.recv().await {
                Some(outcome) => {
                    record_outcome(&outcome);
                    outcomes.push(outcome);
                }
                None => {
                    // A worker task panicked before sending.
                    error!(
                        iteration,
                        received = outcomes.len(),
                        expected = threads,
                        "Outcome channel closed early"
                    );
                    break;
                }
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        info!(
            "Iteration {}/{} done: {} ok, {} failed",
            iteration,
            self.config.iterations,
            succeeded,
            outcomes.len() - succeeded
        );
        outcomes
    }

    /// Upload once and discard the result. The receipt is never committed.
    async fn trial_upload(&self, ctx: &UploadContext) {
        let payload = match ctx.builder.build(&ctx.pool) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Trial upload skipped: {}", e);
                return;
            }
        };
        match self.service.upload_binary(&ctx.destination, payload).await {
            Ok(receipt) => info!(server = receipt.server, "Trial upload accepted"),
            Err(e) => warn!("Trial upload failed: {}", e),
        }
    }

    fn transition(&self, state: SchedulerState) {
        debug!(session = %self.session, "Scheduler state: {}", state);
    }
}

/// Log one outcome and update metrics.
fn record_outcome(outcome: &Outcome) {
    let label = outcome.result_label();
    metrics::UPLOAD_ATTEMPTS.with_label_values(&[label]).inc();
    metrics::UPLOAD_DURATION
        .with_label_values(&[label])
        .observe(outcome.elapsed.as_secs_f64());

    match &outcome.status {
        OutcomeStatus::Ok { saved } => {
            metrics::PHOTOS_SAVED.inc_by(*saved as u64);
            info!("[{}:{}] {}", outcome.iteration, outcome.worker, outcome);
        }
        OutcomeStatus::Failed { stage, error } => {
            metrics::UPLOAD_FAILURES
                .with_label_values(&[stage.as_str(), error.kind()])
                .inc();
            warn!(
                kind = error.kind(),
                "[{}:{}] {}",
                outcome.iteration,
                outcome.worker,
                outcome
            );
        }
    }
}
