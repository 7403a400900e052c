// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Action gate.
//
// Four user-triggered operations on a finalized record. Each one checks its
// precondition against the record first and touches no collaborator when the
// precondition fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::Serialize;
use textwerk_bridge::{ClipboardService, FileWriter, MediaWriter, ShareSheet};
use textwerk_core::error::TextwerkError;
use textwerk_core::human_errors::{HumanError, humanize_error};
use textwerk_core::types::{Capability, PipelineState, Provenance, ScanRecord, StatusMessage};
use tracing::{info, instrument, warn};

use crate::gate::CapabilityGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PersistImage,
    ExportText,
    ShareText,
    CopyText,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::PersistImage,
        Action::ExportText,
        Action::ShareText,
        Action::CopyText,
    ];
}

/// Why an action was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejection {
    /// No finalized record.
    NotReady,
    /// The record holds no recognized text.
    NoText,
    /// Only freshly captured images are saved to the library.
    NotCaptured,
}

impl std::fmt::Display for ActionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::NotReady => "no scan is ready",
            Self::NoText => "the scan has no recognized text",
            Self::NotCaptured => "only captured photos can be saved",
        };
        f.write_str(reason)
    }
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(StatusMessage),
    /// Precondition failed; nothing was attempted.
    Rejected(ActionRejection),
    /// The capability the action needs was refused.
    Denied(StatusMessage),
    /// The collaborator reported an error.
    Failed(HumanError),
}

impl ActionOutcome {
    /// Status line to show for this outcome, if any.
    pub fn status(&self) -> Option<StatusMessage> {
        match self {
            Self::Completed(status) | Self::Denied(status) => Some(status.clone()),
            Self::Failed(human) => Some(StatusMessage::failure(human.message.clone())),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Record-level precondition for `action`.
pub fn check_record(action: Action, record: &ScanRecord) -> Result<(), ActionRejection> {
    match action {
        Action::PersistImage if record.provenance() != Provenance::Captured => {
            Err(ActionRejection::NotCaptured)
        }
        Action::PersistImage => Ok(()),
        Action::ExportText | Action::ShareText | Action::CopyText => {
            if record.text().is_recognized() {
                Ok(())
            } else {
                Err(ActionRejection::NoText)
            }
        }
    }
}

/// Full precondition: the pipeline must be `Ready` with a record.
pub fn check_action(
    action: Action,
    state: PipelineState,
    record: Option<&ScanRecord>,
) -> Result<(), ActionRejection> {
    match (state, record) {
        (PipelineState::Ready, Some(record)) => check_record(action, record),
        _ => Err(ActionRejection::NotReady),
    }
}

/// Actions a front end should offer right now.
pub fn available_actions(state: PipelineState, record: Option<&ScanRecord>) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|action| check_action(*action, state, record).is_ok())
        .collect()
}

/// `ocr_result_<epoch-ms>.txt`
pub fn export_file_name(stamp_ms: i64) -> String {
    format!("ocr_result_{stamp_ms}.txt")
}

pub struct ActionGate {
    gate: CapabilityGate,
    media: Arc<dyn MediaWriter>,
    files: Arc<dyn FileWriter>,
    share: Arc<dyn ShareSheet>,
    clipboard: Arc<dyn ClipboardService>,
    export_dir: PathBuf,
    /// Last stamp handed out, so two exports in one millisecond differ.
    last_export_ms: AtomicI64,
}

impl ActionGate {
    pub fn new(
        gate: CapabilityGate,
        media: Arc<dyn MediaWriter>,
        files: Arc<dyn FileWriter>,
        share: Arc<dyn ShareSheet>,
        clipboard: Arc<dyn ClipboardService>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            gate,
            media,
            files,
            share,
            clipboard,
            export_dir,
            last_export_ms: AtomicI64::new(i64::MIN),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Strictly increasing millisecond stamp, at least the current time.
    fn next_export_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_export_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        now.max(previous.saturating_add(1))
    }

    #[instrument(skip_all, fields(scan = %record.id()))]
    pub async fn persist_image(&self, record: &ScanRecord) -> ActionOutcome {
        if let Err(rejection) = check_record(Action::PersistImage, record) {
            return ActionOutcome::Rejected(rejection);
        }
        if !self.gate.ensure(Capability::MediaWrite).await {
            let human = humanize_error(&TextwerkError::CapabilityDenied(Capability::MediaWrite));
            return ActionOutcome::Denied(StatusMessage::failure(human.message));
        }
        match self.media.save(record.image()).await {
            Ok(()) => {
                info!("image saved to media library");
                ActionOutcome::Completed(StatusMessage::success("Photo saved to your library."))
            }
            Err(err) => failed(err),
        }
    }

    #[instrument(skip_all, fields(scan = %record.id()))]
    pub async fn export_text(&self, record: &ScanRecord) -> ActionOutcome {
        let text = match recognized_text(record, Action::ExportText) {
            Ok(text) => text,
            Err(rejection) => return ActionOutcome::Rejected(rejection),
        };
        let path = self
            .export_dir
            .join(export_file_name(self.next_export_stamp()));
        match self.files.write(&path, text).await {
            Ok(()) => {
                info!(path = %path.display(), "text exported");
                ActionOutcome::Completed(StatusMessage::success(format!(
                    "Text exported to {}",
                    path.display()
                )))
            }
            Err(err) => failed(err),
        }
    }

    #[instrument(skip_all, fields(scan = %record.id()))]
    pub async fn share_text(&self, record: &ScanRecord) -> ActionOutcome {
        let text = match recognized_text(record, Action::ShareText) {
            Ok(text) => text,
            Err(rejection) => return ActionOutcome::Rejected(rejection),
        };
        match self.share.share(text).await {
            Ok(()) => {
                info!("text handed to share sheet");
                ActionOutcome::Completed(StatusMessage::success("Text shared."))
            }
            Err(err) => failed(err),
        }
    }

    #[instrument(skip_all, fields(scan = %record.id()))]
    pub fn copy_text(&self, record: &ScanRecord) -> ActionOutcome {
        let text = match recognized_text(record, Action::CopyText) {
            Ok(text) => text,
            Err(rejection) => return ActionOutcome::Rejected(rejection),
        };
        self.clipboard.set_text(text);
        info!(chars = text.chars().count(), "text copied to clipboard");
        ActionOutcome::Completed(StatusMessage::success("Copied to clipboard."))
    }
}

fn recognized_text(record: &ScanRecord, action: Action) -> Result<&str, ActionRejection> {
    check_record(action, record)?;
    record.text().text().ok_or(ActionRejection::NoText)
}

fn failed(err: TextwerkError) -> ActionOutcome {
    warn!(error = %err, "action failed");
    ActionOutcome::Failed(humanize_error(&err))
}
