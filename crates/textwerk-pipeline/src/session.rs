// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session, the single owner of pipeline state.
//
// A front end holds one `ScanSession` (usually behind an `Arc`), triggers
// acquisitions and actions on it, and renders `snapshot()`. Every background
// result goes through the generation-checked machine, so anything that
// arrives for a superseded acquisition is dropped.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use textwerk_bridge::Collaborators;
use textwerk_core::config::AppConfig;
use textwerk_core::error::Result;
use textwerk_core::types::{AcquisitionSource, Capability, PipelineState, ScanRecord};
use tracing::{debug, info, instrument, warn};

use crate::acquisition::{AcquiredImage, Acquisition, AcquisitionController};
use crate::actions::{Action, ActionGate, ActionOutcome, ActionRejection, available_actions};
use crate::gate::CapabilityGate;
use crate::history::ScanHistory;
use crate::orchestrator::Orchestrator;
use crate::state::{Generation, PipelineMachine, SessionSnapshot, SharedMachine, lock};

/// How a full scan (acquire then process) ended.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Ready(Arc<ScanRecord>),
    Cancelled,
    Denied(Capability),
    /// A newer acquisition replaced this one; its results were discarded.
    Superseded,
}

pub struct ScanSession {
    machine: SharedMachine,
    acquisition: AcquisitionController,
    orchestrator: Orchestrator,
    actions: ActionGate,
    history: Option<Arc<Mutex<ScanHistory>>>,
    copy_confirmation: Duration,
}

impl ScanSession {
    pub fn new(collaborators: Collaborators, config: &AppConfig, export_dir: PathBuf) -> Self {
        let gate = CapabilityGate::new(collaborators.capabilities);
        Self {
            machine: Arc::new(Mutex::new(PipelineMachine::new())),
            acquisition: AcquisitionController::new(gate.clone(), collaborators.chooser),
            orchestrator: Orchestrator::new(
                gate.clone(),
                collaborators.recognizer,
                collaborators.positions,
                config.position_request(),
            ),
            actions: ActionGate::new(
                gate,
                collaborators.media,
                collaborators.files,
                collaborators.share,
                collaborators.clipboard,
                export_dir,
            ),
            history: None,
            copy_confirmation: config.copy_confirmation(),
        }
    }

    /// Append every finalized record to `history`.
    pub fn with_history(mut self, history: ScanHistory) -> Self {
        self.history = Some(Arc::new(Mutex::new(history)));
        self
    }

    pub fn state(&self) -> PipelineState {
        lock(&self.machine).state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.machine).snapshot()
    }

    pub fn record(&self) -> Option<Arc<ScanRecord>> {
        lock(&self.machine).record().cloned()
    }

    pub fn copy_confirmed(&self) -> bool {
        lock(&self.machine).copy_confirmed()
    }

    pub fn available_actions(&self) -> Vec<Action> {
        let machine = lock(&self.machine);
        available_actions(machine.state(), machine.record().map(Arc::as_ref))
    }

    /// Acquire an image. Discards the previous record immediately.
    pub async fn acquire(&self, source: AcquisitionSource) -> Result<Acquisition> {
        self.acquisition.acquire(&self.machine, source).await
    }

    /// Run positioning and recognition on an acquired image.
    ///
    /// Returns `None` when the acquisition was superseded before or during
    /// processing; the late record is then dropped.
    #[instrument(skip_all, fields(generation = %acquired.generation()))]
    pub async fn process(&self, acquired: AcquiredImage) -> Option<Arc<ScanRecord>> {
        let AcquiredImage { generation, image } = acquired;

        let started = lock(&self.machine).transition(generation, PipelineState::Processing);
        if !started {
            debug!("superseded before processing began");
            return None;
        }

        let record = Arc::new(self.orchestrator.process(image).await);

        let applied = lock(&self.machine).finalize(generation, Arc::clone(&record));
        if !applied {
            info!(scan = %record.id(), "late result for superseded acquisition discarded");
            return None;
        }

        self.remember(Arc::clone(&record)).await;
        info!(scan = %record.id(), outcome = record.text().kind(), "scan ready");
        Some(record)
    }

    /// Acquire from `source` and process the result.
    pub async fn scan(&self, source: AcquisitionSource) -> Result<ScanOutcome> {
        let outcome = match self.acquire(source).await? {
            Acquisition::Image(acquired) => match self.process(acquired).await {
                Some(record) => ScanOutcome::Ready(record),
                None => ScanOutcome::Superseded,
            },
            Acquisition::Cancelled => ScanOutcome::Cancelled,
            Acquisition::Denied(capability) => ScanOutcome::Denied(capability),
            Acquisition::Superseded => ScanOutcome::Superseded,
        };
        Ok(outcome)
    }

    /// Save the captured image to the media library.
    pub async fn persist_image(&self) -> ActionOutcome {
        let Some((generation, record)) = lock(&self.machine).ready_record() else {
            return ActionOutcome::Rejected(ActionRejection::NotReady);
        };
        let outcome = self.actions.persist_image(&record).await;
        self.apply(generation, &outcome);
        outcome
    }

    /// Write the recognized text to a new file in the export directory.
    pub async fn export_text(&self) -> ActionOutcome {
        let Some((generation, record)) = lock(&self.machine).ready_record() else {
            return ActionOutcome::Rejected(ActionRejection::NotReady);
        };
        let outcome = self.actions.export_text(&record).await;
        self.apply(generation, &outcome);
        outcome
    }

    pub async fn share_text(&self) -> ActionOutcome {
        let Some((generation, record)) = lock(&self.machine).ready_record() else {
            return ActionOutcome::Rejected(ActionRejection::NotReady);
        };
        let outcome = self.actions.share_text(&record).await;
        self.apply(generation, &outcome);
        outcome
    }

    /// Put the recognized text on the clipboard and show the copy
    /// confirmation, which clears itself after the configured delay.
    pub async fn copy_text(&self) -> ActionOutcome {
        let Some((generation, record)) = lock(&self.machine).ready_record() else {
            return ActionOutcome::Rejected(ActionRejection::NotReady);
        };
        let outcome = self.actions.copy_text(&record);
        self.apply(generation, &outcome);

        if outcome.is_completed() {
            let token = lock(&self.machine).confirm_copy(generation);
            if let Some(token) = token {
                let machine = Arc::clone(&self.machine);
                let delay = self.copy_confirmation;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    lock(&machine).clear_copy(generation, token);
                });
            }
        }
        outcome
    }

    /// Show an action's status, unless the acquisition it ran against has
    /// been replaced meanwhile.
    fn apply(&self, generation: Generation, outcome: &ActionOutcome) {
        let Some(status) = outcome.status() else {
            return;
        };
        let mut machine = lock(&self.machine);
        if !machine.set_status(generation, status) {
            debug!("status for superseded acquisition dropped");
            return;
        }
        if let ActionOutcome::Failed(human) = outcome {
            machine.raise_alert(generation, human.clone());
        }
    }

    /// Append `record` to the history log on the blocking pool.
    async fn remember(&self, record: Arc<ScanRecord>) {
        let Some(history) = &self.history else {
            return;
        };
        let history = Arc::clone(history);
        let written = tokio::task::spawn_blocking(move || {
            history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(&record)
        })
        .await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "scan history write failed"),
            Err(err) => warn!(error = %err, "scan history task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_bridge::mock::{
        MockSet, RecordingFileWriter, ScriptedCapabilities, ScriptedChooser, ScriptedPositions,
        ScriptedRecognizer,
    };
    use textwerk_core::types::{
        CapabilityStatus, Coordinate, ImageHandle, Provenance, RecognitionOutcome,
    };

    fn captured(locator: &str) -> ImageHandle {
        ImageHandle::new(locator, Provenance::Captured)
    }

    fn selected(locator: &str) -> ImageHandle {
        ImageHandle::new(locator, Provenance::Selected)
    }

    fn session(mocks: &MockSet) -> ScanSession {
        ScanSession::new(mocks.collaborators(), &AppConfig::default(), PathBuf::from("/exports"))
    }

    fn ready(outcome: ScanOutcome) -> Arc<ScanRecord> {
        match outcome {
            ScanOutcome::Ready(record) => record,
            other => panic!("expected a ready scan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_with_location_and_text() {
        let mut mocks = MockSet::new(
            ScriptedChooser::new().then_image(captured("/tmp/a.jpg")),
            "INVOICE #102\nTOTAL 45.00",
        );
        let fix = Coordinate::new(40.71, -74.00);
        mocks.positions = Arc::new(ScriptedPositions::fixed(fix, Duration::from_millis(50)));
        let session = session(&mocks);

        let record = ready(session.scan(AcquisitionSource::Capture).await.unwrap());
        assert_eq!(record.text(), &RecognitionOutcome::Recognized("INVOICE #102\nTOTAL 45.00".into()));
        assert_eq!(record.coordinate(), Some(fix));
        assert_eq!(record.provenance(), Provenance::Captured);
        assert_eq!(session.state(), PipelineState::Ready);
        assert_eq!(session.available_actions(), Action::ALL.to_vec());
    }

    #[tokio::test]
    async fn blank_text_disables_text_actions() {
        let mocks = MockSet::new(ScriptedChooser::new().then_image(selected("/tmp/b.jpg")), "   \n  ");
        let session = session(&mocks);

        let record = ready(session.scan(AcquisitionSource::Library).await.unwrap());
        assert_eq!(record.text(), &RecognitionOutcome::Empty);
        assert_eq!(record.coordinate(), None);

        let no_text = ActionOutcome::Rejected(ActionRejection::NoText);
        assert_eq!(session.export_text().await, no_text);
        assert_eq!(session.share_text().await, no_text);
        assert_eq!(session.copy_text().await, no_text);
        assert_eq!(
            session.persist_image().await,
            ActionOutcome::Rejected(ActionRejection::NotCaptured)
        );
        assert!(mocks.files.written().is_empty());
        assert!(mocks.share.shared().is_empty());
        assert!(mocks.clipboard.history().is_empty());
        assert!(mocks.media.saved().is_empty());
        assert!(session.available_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_positioning_is_abandoned_at_timeout() {
        let mut mocks = MockSet::new(ScriptedChooser::new().then_image(captured("/tmp/c.jpg")), "TEXT");
        mocks.positions = Arc::new(ScriptedPositions::fixed(
            Coordinate::new(1.0, 1.0),
            Duration::from_secs(15),
        ));
        let session = session(&mocks);

        let started = tokio::time::Instant::now();
        let record = ready(session.scan(AcquisitionSource::Capture).await.unwrap());
        assert_eq!(record.coordinate(), None);
        assert!(record.text().is_recognized());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11), "{elapsed:?}");
    }

    #[tokio::test]
    async fn cancelled_capture_returns_to_idle() {
        let mocks = MockSet::new(ScriptedChooser::new().then_cancel(), "unused");
        let session = session(&mocks);

        assert!(matches!(
            session.scan(AcquisitionSource::Capture).await.unwrap(),
            ScanOutcome::Cancelled
        ));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.record.is_none());
        assert!(snapshot.alert.is_none());
        assert_eq!(mocks.recognizer.calls(), 0);
    }

    #[tokio::test]
    async fn denied_media_write_saves_nothing() {
        let mut mocks = MockSet::new(ScriptedChooser::new().then_image(captured("/tmp/d.jpg")), "TEXT");
        mocks.capabilities = Arc::new(
            ScriptedCapabilities::granting_all()
                .with_status(Capability::MediaWrite, CapabilityStatus::Denied),
        );
        let session = session(&mocks);
        ready(session.scan(AcquisitionSource::Capture).await.unwrap());

        let outcome = session.persist_image().await;
        assert!(matches!(outcome, ActionOutcome::Denied(_)));
        assert!(mocks.media.saved().is_empty());
        assert!(session.snapshot().status.is_some());
        assert!(session.snapshot().alert.is_none());
    }

    #[tokio::test]
    async fn denied_capture_never_opens_chooser() {
        let mut mocks = MockSet::new(ScriptedChooser::new().then_image(captured("/tmp/e.jpg")), "TEXT");
        mocks.capabilities = Arc::new(
            ScriptedCapabilities::granting_all()
                .with_status(Capability::Capture, CapabilityStatus::Denied),
        );
        let session = session(&mocks);

        assert!(matches!(
            session.scan(AcquisitionSource::Capture).await.unwrap(),
            ScanOutcome::Denied(Capability::Capture)
        ));
        assert_eq!(mocks.chooser.calls(), 0);
        assert_eq!(session.state(), PipelineState::AcquisitionFailed);
    }

    #[tokio::test]
    async fn device_error_surfaces_alert() {
        let mocks = MockSet::new(ScriptedChooser::new().then_error("camera busy"), "TEXT");
        let session = session(&mocks);

        assert!(session.scan(AcquisitionSource::Capture).await.is_err());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.alert.is_some());
    }

    #[tokio::test]
    async fn recognition_failure_still_finalizes() {
        let mut mocks = MockSet::new(ScriptedChooser::new().then_image(captured("/tmp/f.jpg")), "unused");
        mocks.recognizer = Arc::new(ScriptedRecognizer::failing("engine offline"));
        let session = session(&mocks);

        let record = ready(session.scan(AcquisitionSource::Capture).await.unwrap());
        assert!(matches!(record.text(), RecognitionOutcome::Failed(_)));
        assert!(session.snapshot().alert.is_none());
        assert_eq!(session.available_actions(), vec![Action::PersistImage]);
    }

    #[tokio::test]
    async fn actions_before_any_scan_are_rejected() {
        let mocks = MockSet::new(ScriptedChooser::new(), "TEXT");
        let session = session(&mocks);
        let not_ready = ActionOutcome::Rejected(ActionRejection::NotReady);
        assert_eq!(session.persist_image().await, not_ready);
        assert_eq!(session.export_text().await, not_ready);
        assert_eq!(session.share_text().await, not_ready);
        assert_eq!(session.copy_text().await, not_ready);
    }

    #[tokio::test]
    async fn text_actions_deliver_verbatim_text() {
        let mocks = MockSet::new(
            ScriptedChooser::new().then_image(selected("/tmp/g.jpg")),
            "Total: 12.50\n",
        );
        let session = session(&mocks);
        ready(session.scan(AcquisitionSource::Library).await.unwrap());

        assert!(session.export_text().await.is_completed());
        assert!(session.export_text().await.is_completed());
        assert!(session.share_text().await.is_completed());
        assert!(session.copy_text().await.is_completed());

        let written = mocks.files.written();
        assert_eq!(written.len(), 2);
        assert_ne!(written[0].0, written[1].0);
        assert!(written.iter().all(|(_, text)| text == "Total: 12.50\n"));
        assert_eq!(mocks.share.shared(), vec!["Total: 12.50\n".to_string()]);
        assert_eq!(mocks.clipboard.history(), vec!["Total: 12.50\n".to_string()]);
    }

    #[tokio::test]
    async fn export_failure_raises_alert() {
        let mut mocks = MockSet::new(ScriptedChooser::new().then_image(selected("/tmp/h.jpg")), "TEXT");
        mocks.files = Arc::new(RecordingFileWriter::failing());
        let session = session(&mocks);
        ready(session.scan(AcquisitionSource::Library).await.unwrap());

        assert!(matches!(session.export_text().await, ActionOutcome::Failed(_)));
        let snapshot = session.snapshot();
        assert!(snapshot.alert.is_some());
        assert_eq!(snapshot.state, PipelineState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_confirmation_clears_itself() {
        let mocks = MockSet::new(ScriptedChooser::new().then_image(selected("/tmp/i.jpg")), "TEXT");
        let session = session(&mocks);
        ready(session.scan(AcquisitionSource::Library).await.unwrap());

        session.copy_text().await;
        assert!(session.copy_confirmed());

        tokio::time::sleep(Duration::from_millis(1_400)).await;
        assert!(session.copy_confirmed());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!session.copy_confirmed());
    }

    #[tokio::test]
    async fn new_acquisition_discards_previous_scan() {
        let mocks = MockSet::new(
            ScriptedChooser::new()
                .then_image(selected("/tmp/j.jpg"))
                .then_cancel(),
            "TEXT",
        );
        let session = session(&mocks);
        ready(session.scan(AcquisitionSource::Library).await.unwrap());
        session.copy_text().await;
        assert!(session.copy_confirmed());

        session.scan(AcquisitionSource::Library).await.unwrap();
        let snapshot = session.snapshot();
        assert!(snapshot.record.is_none());
        assert!(snapshot.status.is_none());
        assert!(!snapshot.copy_confirmed);
        assert_eq!(
            session.export_text().await,
            ActionOutcome::Rejected(ActionRejection::NotReady)
        );
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let mut mocks = MockSet::new(
            ScriptedChooser::new()
                .then_image(selected("/tmp/old.jpg"))
                .then_image(selected("/tmp/new.jpg")),
            "fallback",
        );
        let recognizer = ScriptedRecognizer::returning("fallback")
            .on("/tmp/old.jpg", "OLD")
            .on("/tmp/new.jpg", "NEW");
        let release_old = recognizer.hold("/tmp/old.jpg");
        mocks.recognizer = Arc::new(recognizer);
        let session = Arc::new(session(&mocks));

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.scan(AcquisitionSource::Library).await }
        });
        while session.state() != PipelineState::Processing {
            tokio::task::yield_now().await;
        }

        let second = ready(session.scan(AcquisitionSource::Library).await.unwrap());
        assert_eq!(second.text().text(), Some("NEW"));

        release_old.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, ScanOutcome::Superseded));

        let current = session.record().unwrap();
        assert_eq!(current.id(), second.id());
        assert_eq!(current.text().text(), Some("NEW"));
        assert_eq!(session.state(), PipelineState::Ready);
    }

    #[tokio::test]
    async fn undecided_capability_is_prompted_once() {
        let mut mocks = MockSet::new(
            ScriptedChooser::new()
                .then_image(selected("/tmp/k.jpg"))
                .then_image(selected("/tmp/l.jpg")),
            "TEXT",
        );
        let caps = Arc::new(ScriptedCapabilities::new());
        mocks.capabilities = caps.clone();
        let session = session(&mocks);

        ready(session.scan(AcquisitionSource::Library).await.unwrap());
        ready(session.scan(AcquisitionSource::Library).await.unwrap());
        assert_eq!(caps.prompt_count(Capability::MediaRead), 1);
        assert_eq!(caps.prompt_count(Capability::Positioning), 1);
    }

    #[tokio::test]
    async fn finalized_scans_are_written_to_history() {
        let mocks = MockSet::new(
            ScriptedChooser::new()
                .then_image(selected("/tmp/m.jpg"))
                .then_cancel(),
            "TEXT",
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let session = session(&mocks).with_history(ScanHistory::open(&path).unwrap());

        let record = ready(session.scan(AcquisitionSource::Library).await.unwrap());
        session.scan(AcquisitionSource::Library).await.unwrap();

        let history = ScanHistory::open(&path).unwrap();
        let entries = history.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].scan_id, record.id().to_string());
        assert_eq!(entries[0].outcome, "recognized");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn history_is_written_before_process_returns() {
        let mocks = MockSet::new(
            ScriptedChooser::new()
                .then_image(selected("/tmp/a.jpg"))
                .then_image(selected("/tmp/b.jpg")),
            "TEXT",
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let session = session(&mocks).with_history(ScanHistory::open(&path).unwrap());

        for expected in 1..=2 {
            ready(session.scan(AcquisitionSource::Library).await.unwrap());
            assert_eq!(ScanHistory::open(&path).unwrap().count().unwrap(), expected);
        }
    }
}
