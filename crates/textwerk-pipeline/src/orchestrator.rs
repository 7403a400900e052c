// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing orchestrator.
//
// Positioning and recognition run concurrently and are joined: the record is
// built only after both have settled, whichever finishes first. Neither
// attempt can fail the run. A positioning problem of any kind (denied,
// unavailable, timed out, nonsense fix) leaves the coordinate absent; a
// recognizer error is recorded as a `Failed` outcome.

use std::sync::Arc;
use std::time::Duration;

use textwerk_bridge::{PositionService, Recognizer};
use textwerk_core::error::TextwerkError;
use textwerk_core::types::{
    Capability, Coordinate, ImageHandle, PositionRequest, RecognitionOutcome, ScanRecord,
};
use tracing::{debug, info, instrument, warn};

use crate::gate::CapabilityGate;

pub struct Orchestrator {
    gate: CapabilityGate,
    recognizer: Arc<dyn Recognizer>,
    positions: Arc<dyn PositionService>,
    request: PositionRequest,
}

impl Orchestrator {
    pub fn new(
        gate: CapabilityGate,
        recognizer: Arc<dyn Recognizer>,
        positions: Arc<dyn PositionService>,
        request: PositionRequest,
    ) -> Self {
        Self {
            gate,
            recognizer,
            positions,
            request,
        }
    }

    /// Process one image into a finalized record.
    #[instrument(skip_all, fields(locator = image.locator()))]
    pub async fn process(&self, image: ImageHandle) -> ScanRecord {
        let (coordinate, text) = tokio::join!(self.locate(), self.recognize(&image));
        info!(
            outcome = text.kind(),
            located = coordinate.is_some(),
            "both attempts settled"
        );
        ScanRecord::new(image, text, coordinate)
    }

    /// Best-effort location fix, bounded by the configured timeout.
    pub async fn locate(&self) -> Option<Coordinate> {
        if !self.gate.ensure(Capability::Positioning).await {
            debug!("positioning not permitted; scan will carry no coordinate");
            return None;
        }

        let query = self.positions.current_position(&self.request);
        let result = match tokio::time::timeout(self.request.timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(TextwerkError::PositioningTimeout(timeout_ms(
                self.request.timeout,
            ))),
        };

        match result {
            Ok(fix) if fix.is_valid() => Some(fix),
            Ok(fix) => {
                warn!(?fix, "positioning returned an out-of-range fix; discarded");
                None
            }
            Err(err) => {
                warn!(error = %err, "positioning failed; scan will carry no coordinate");
                None
            }
        }
    }

    pub async fn recognize(&self, image: &ImageHandle) -> RecognitionOutcome {
        match self.recognizer.recognize(image).await {
            Ok(text) => RecognitionOutcome::from_text(text),
            Err(err) => {
                warn!(error = %err, "recognition failed");
                RecognitionOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Milliseconds in `timeout`, saturating at `u64::MAX`.
fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
