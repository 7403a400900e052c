// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Textwerk scan pipeline.
//!
//! [`ScanSession`] drives one image at a time through
//! capability check → acquisition → concurrent positioning and recognition →
//! a finalized [`ScanRecord`](textwerk_core::types::ScanRecord), and gates the
//! four follow-up actions (save photo, export, share, copy) on that record.

pub mod acquisition;
pub mod actions;
pub mod gate;
pub mod history;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use acquisition::{AcquiredImage, Acquisition, AcquisitionController};
pub use actions::{Action, ActionGate, ActionOutcome, ActionRejection, available_actions};
pub use gate::CapabilityGate;
pub use history::{HistoryEntry, ScanHistory};
pub use orchestrator::Orchestrator;
pub use session::{ScanOutcome, ScanSession};
pub use state::{Generation, PipelineMachine, SessionSnapshot};
