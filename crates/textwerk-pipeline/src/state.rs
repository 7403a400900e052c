// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline state machine.
//
// One `PipelineMachine` holds everything a front end may show for the current
// acquisition: the lifecycle state, the finalized record, the alert, the last
// status line and the copy confirmation flag. Every acquisition is issued a
// fresh `Generation`; every mutation names the generation it belongs to and is
// dropped when that generation is no longer current. That is the only guard
// needed against late results from superseded runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use textwerk_core::human_errors::HumanError;
use textwerk_core::types::{PipelineState, ScanRecord, StatusMessage};
use tracing::{debug, warn};

/// Token identifying one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The machine as shared between a session and its background tasks.
pub type SharedMachine = Arc<Mutex<PipelineMachine>>;

/// Lock the machine. Critical sections never panic, so a poisoned lock still
/// holds consistent state and is recovered.
pub(crate) fn lock(machine: &Mutex<PipelineMachine>) -> MutexGuard<'_, PipelineMachine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Point-in-time copy of the machine for display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub generation: Generation,
    pub state: PipelineState,
    pub record: Option<Arc<ScanRecord>>,
    pub alert: Option<HumanError>,
    pub status: Option<StatusMessage>,
    pub copy_confirmed: bool,
}

#[derive(Debug)]
pub struct PipelineMachine {
    generation: Generation,
    state: PipelineState,
    record: Option<Arc<ScanRecord>>,
    alert: Option<HumanError>,
    status: Option<StatusMessage>,
    /// Token of the live copy confirmation, if one is showing.
    copy_flag: Option<u64>,
    next_flag: u64,
}

/// Transitions reachable without starting a new acquisition.
fn allowed(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;
    matches!(
        (from, to),
        (AwaitingCapability, Acquiring)
            | (AwaitingCapability, AcquisitionFailed)
            | (AwaitingCapability, Idle)
            | (Acquiring, Processing)
            | (Acquiring, Idle)
            | (Processing, Ready)
    )
}

impl Default for PipelineMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMachine {
    pub fn new() -> Self {
        Self {
            generation: Generation(0),
            state: PipelineState::Idle,
            record: None,
            alert: None,
            status: None,
            copy_flag: None,
            next_flag: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn record(&self) -> Option<&Arc<ScanRecord>> {
        self.record.as_ref()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Discard the previous acquisition entirely and start a new one.
    pub fn begin_acquisition(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.state = PipelineState::AwaitingCapability;
        self.record = None;
        self.alert = None;
        self.status = None;
        self.copy_flag = None;
        debug!(generation = %self.generation, "acquisition started; previous state discarded");
        self.generation
    }

    /// Move to `to` on behalf of `generation`. Returns `false` (and changes
    /// nothing) when the generation is stale or the transition is not allowed.
    pub fn transition(&mut self, generation: Generation, to: PipelineState) -> bool {
        if !self.is_current(generation) {
            debug!(%generation, current = %self.generation, ?to, "stale transition ignored");
            return false;
        }
        if !allowed(self.state, to) {
            warn!(from = ?self.state, ?to, "invalid pipeline transition ignored");
            return false;
        }
        self.state = to;
        true
    }

    /// Capability denied: end in `AcquisitionFailed` with a status line.
    pub fn fail_acquisition(&mut self, generation: Generation, status: StatusMessage) -> bool {
        if !self.transition(generation, PipelineState::AcquisitionFailed) {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Chooser cancelled or failed: back to `Idle`, with an alert only for
    /// failures.
    pub fn abort_acquisition(&mut self, generation: Generation, alert: Option<HumanError>) -> bool {
        if !self.transition(generation, PipelineState::Idle) {
            return false;
        }
        self.alert = alert;
        true
    }

    /// Store the finalized record and enter `Ready`. A record is written at
    /// most once per generation.
    pub fn finalize(&mut self, generation: Generation, record: Arc<ScanRecord>) -> bool {
        if self.record.is_some() && self.is_current(generation) {
            warn!(%generation, "record already finalized; second record dropped");
            return false;
        }
        if !self.transition(generation, PipelineState::Ready) {
            return false;
        }
        self.record = Some(record);
        true
    }

    /// The record, with its generation, if the action gate may act on it.
    pub fn ready_record(&self) -> Option<(Generation, Arc<ScanRecord>)> {
        match (self.state, &self.record) {
            (PipelineState::Ready, Some(record)) => Some((self.generation, Arc::clone(record))),
            _ => None,
        }
    }

    pub fn set_status(&mut self, generation: Generation, status: StatusMessage) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.status = Some(status);
        true
    }

    pub fn raise_alert(&mut self, generation: Generation, alert: HumanError) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.alert = Some(alert);
        true
    }

    /// Show the copy confirmation. Returns the token that must be presented
    /// to clear it, so an older timer cannot clear a newer confirmation.
    pub fn confirm_copy(&mut self, generation: Generation) -> Option<u64> {
        if !self.is_current(generation) {
            return None;
        }
        self.next_flag += 1;
        self.copy_flag = Some(self.next_flag);
        self.copy_flag
    }

    pub fn clear_copy(&mut self, generation: Generation, token: u64) -> bool {
        if !self.is_current(generation) || self.copy_flag != Some(token) {
            return false;
        }
        self.copy_flag = None;
        true
    }

    pub fn copy_confirmed(&self) -> bool {
        self.copy_flag.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            state: self.state,
            record: self.record.clone(),
            alert: self.alert.clone(),
            status: self.status.clone(),
            copy_confirmed: self.copy_confirmed(),
        }
    }
}
