//! A single upload attempt.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::media::MediaPool;
use crate::payload::PayloadBuilder;
use crate::photo_api::{PhotoApiError, PhotoService, Session, UploadDestination};

use super::types::{Outcome, OutcomeStatus, Stage};

/// Everything a worker reads. Shared read-only between all workers of a run.
#[derive(Clone)]
pub struct UploadContext {
    pub service: Arc<dyn PhotoService>,
    pub session: Arc<Session>,
    pub destination: Arc<UploadDestination>,
    pub pool: Arc<MediaPool>,
    pub builder: PayloadBuilder,
    pub attach_captions: bool,
}

/// Build a payload, upload it, then commit it. Never retries.
///
/// The commit is only attempted after a successful upload. Elapsed time is
/// measured from the start of the attempt.
pub async fn run_upload(ctx: &UploadContext, iteration: usize, worker: usize) -> Outcome {
    let start = Instant::now();
    let finish = |status: OutcomeStatus| Outcome {
        iteration,
        worker,
        elapsed: start.elapsed(),
        status,
    };
    let failed = |stage: Stage, error: PhotoApiError| OutcomeStatus::Failed { stage, error };

    let payload = match ctx.builder.build(&ctx.pool) {
        Ok(payload) => payload,
        Err(e) => return finish(failed(Stage::Upload, e.into())),
    };

    let receipt = match ctx.service.upload_binary(&ctx.destination, payload).await {
        Ok(receipt) => receipt,
        Err(e) => return finish(failed(Stage::Upload, e)),
    };
    debug!(
        iteration,
        worker,
        server = receipt.server,
        "Payload uploaded, committing"
    );

    let caption = pick_caption(&ctx.pool, ctx.attach_captions);
    match ctx
        .service
        .commit_upload(&ctx.session, &receipt, caption.as_deref())
        .await
    {
        Ok(saved) => finish(OutcomeStatus::Ok { saved }),
        Err(e) => finish(failed(Stage::Commit, e)),
    }
}

/// Random caption when captions are enabled, `None` otherwise.
fn pick_caption(pool: &MediaPool, enabled: bool) -> Option<String> {
    if !enabled {
        return None;
    }
    pool.random_caption(&mut rand::rng()).map(str::to_string)
}
