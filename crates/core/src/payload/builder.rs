//! Payload builder.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::media::MediaPool;

use super::{Payload, PayloadError, PayloadPart};

/// Attachments per upload attempt accepted by the upload server.
pub const ATTACHMENTS_PER_UPLOAD: usize = 5;

/// Builds upload payloads by sampling pictures from a media pool.
#[derive(Debug, Clone, Copy)]
pub struct PayloadBuilder {
    fan_out: usize,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new(ATTACHMENTS_PER_UPLOAD)
    }
}

impl PayloadBuilder {
    /// Create a builder producing `fan_out` attachments per payload.
    ///
    /// The upload server caps the number of attachments; that limit is not
    /// checked here.
    pub fn new(fan_out: usize) -> Self {
        Self { fan_out }
    }

    pub fn fan_out(&self) -> usize {
        self.fan_out
    }

    /// Build a payload using the thread-local RNG.
    pub fn build(&self, pool: &MediaPool) -> Result<Payload, PayloadError> {
        self.build_with_rng(pool, &mut rand::rng())
    }

    /// Build a payload with fields `file0..file{fan_out-1}`, each picked
    /// uniformly and independently from the pool's pictures.
    pub fn build_with_rng<R: Rng + ?Sized>(
        &self,
        pool: &MediaPool,
        rng: &mut R,
    ) -> Result<Payload, PayloadError> {
        let pictures = pool.pictures();
        if pictures.is_empty() {
            return Err(PayloadError::EmptyPool);
        }

        let mut parts = Vec::with_capacity(self.fan_out);
        for i in 0..self.fan_out {
            let picture = pictures.choose(rng).ok_or(PayloadError::EmptyPool)?;
            parts.push(PayloadPart {
                field: format!("file{}", i),
                file_name: picture.name.clone(),
                content: picture.content.clone(),
            });
        }

        Ok(Payload::new(parts))
    }
}
