// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PositionRequest;

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bounded wait for a location fix, in milliseconds.
    pub positioning_timeout_ms: u64,
    /// Oldest cached location fix still accepted, in milliseconds.
    pub max_position_age_ms: u64,
    /// Ask the positioning service for a high-accuracy fix.
    pub high_accuracy: bool,
    /// How long the "copied" confirmation stays up, in milliseconds.
    pub copy_confirmation_ms: u64,
    /// Where exported text files go. `None` uses `<data dir>/exports`.
    pub export_dir: Option<PathBuf>,
    /// Record every finalized scan in the history database.
    pub history_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            positioning_timeout_ms: 10_000,
            max_position_age_ms: 10_000,
            high_accuracy: true,
            copy_confirmation_ms: 1_500,
            export_dir: None,
            history_enabled: true,
        }
    }
}

impl AppConfig {
    /// Positioning query parameters derived from these settings.
    pub fn position_request(&self) -> PositionRequest {
        PositionRequest {
            high_accuracy: self.high_accuracy,
            timeout: Duration::from_millis(self.positioning_timeout_ms),
            max_cache_age: Duration::from_millis(self.max_position_age_ms),
        }
    }

    pub fn copy_confirmation(&self) -> Duration {
        Duration::from_millis(self.copy_confirmation_ms)
    }
}
