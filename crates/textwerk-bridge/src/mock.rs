// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted collaborators for tests and demos.
//
// Each fake answers from a script and counts its invocations, so callers can
// assert both what the pipeline produced and which collaborators it touched.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::{
    Capability, CapabilityStatus, Coordinate, ImageHandle, PositionRequest,
};
use tokio::sync::Notify;

use crate::traits::*;

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Authorization subsystem with a fixed current status and a scripted answer
/// to prompts.
pub struct ScriptedCapabilities {
    current: Mutex<HashMap<Capability, CapabilityStatus>>,
    answers: Mutex<HashMap<Capability, CapabilityStatus>>,
    prompts: Mutex<HashMap<Capability, usize>>,
}

impl ScriptedCapabilities {
    /// Everything undecided; prompts are granted unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(HashMap::new()),
            answers: Mutex::new(HashMap::new()),
            prompts: Mutex::new(HashMap::new()),
        }
    }

    /// Everything already granted.
    pub fn granting_all() -> Self {
        let caps = Self::new();
        for capability in [
            Capability::Capture,
            Capability::Positioning,
            Capability::MediaRead,
            Capability::MediaWrite,
        ] {
            caps.set_status(capability, CapabilityStatus::Granted);
        }
        caps
    }

    /// Builder form of [`set_status`](Self::set_status).
    pub fn with_status(self, capability: Capability, status: CapabilityStatus) -> Self {
        self.set_status(capability, status);
        self
    }

    /// What the user will answer when prompted for `capability`.
    pub fn answering(self, capability: Capability, status: CapabilityStatus) -> Self {
        self.answers
            .lock()
            .expect("capabilities lock poisoned")
            .insert(capability, status);
        self
    }

    pub fn set_status(&self, capability: Capability, status: CapabilityStatus) {
        self.current
            .lock()
            .expect("capabilities lock poisoned")
            .insert(capability, status);
    }

    /// How many times the user was prompted for `capability`.
    pub fn prompt_count(&self, capability: Capability) -> usize {
        self.prompts
            .lock()
            .expect("capabilities lock poisoned")
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }

    fn status_of(&self, capability: Capability) -> CapabilityStatus {
        self.current
            .lock()
            .expect("capabilities lock poisoned")
            .get(&capability)
            .copied()
            .unwrap_or(CapabilityStatus::Undecided)
    }
}

impl Default for ScriptedCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapabilityService for ScriptedCapabilities {
    async fn check(&self, capability: Capability) -> Result<CapabilityStatus> {
        Ok(self.status_of(capability))
    }

    async fn request(&self, capability: Capability, _rationale: &str) -> Result<CapabilityStatus> {
        *self
            .prompts
            .lock()
            .expect("capabilities lock poisoned")
            .entry(capability)
            .or_insert(0) += 1;

        let answer = self
            .answers
            .lock()
            .expect("capabilities lock poisoned")
            .get(&capability)
            .copied()
            .unwrap_or(CapabilityStatus::Granted);
        self.set_status(capability, answer);
        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// Chooser
// ---------------------------------------------------------------------------

/// Chooser that replays a queue of outcomes, one per invocation.
pub struct ScriptedChooser {
    script: Mutex<VecDeque<Result<Option<ImageHandle>>>>,
    calls: AtomicUsize,
}

impl ScriptedChooser {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then_image(self, image: ImageHandle) -> Self {
        self.push(Ok(Some(image)));
        self
    }

    pub fn then_cancel(self) -> Self {
        self.push(Ok(None));
        self
    }

    pub fn then_error(self, reason: impl Into<String>) -> Self {
        self.push(Err(TextwerkError::Device(reason.into())));
        self
    }

    pub fn push(&self, outcome: Result<Option<ImageHandle>>) {
        self.script
            .lock()
            .expect("chooser lock poisoned")
            .push_back(outcome);
    }

    /// Number of times the chooser was opened (capture or library).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<Option<ImageHandle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("chooser lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(TextwerkError::Device("chooser script exhausted".into())))
    }
}

impl Default for ScriptedChooser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Chooser for ScriptedChooser {
    async fn capture(&self) -> Result<Option<ImageHandle>> {
        self.next()
    }

    async fn select_from_library(&self) -> Result<Option<ImageHandle>> {
        self.next()
    }
}

// ---------------------------------------------------------------------------
// Recognizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(String),
}

/// Recognizer answering per image locator after a fixed latency, optionally
/// held until released.
pub struct ScriptedRecognizer {
    fallback: Reply,
    replies: Mutex<HashMap<String, Reply>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    /// Return `text` for every image not scripted otherwise.
    pub fn returning(text: impl Into<String>) -> Self {
        Self::with_fallback(Reply::Text(text.into()))
    }

    /// Fail every image not scripted otherwise.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_fallback(Reply::Error(reason.into()))
    }

    fn with_fallback(fallback: Reply) -> Self {
        Self {
            fallback,
            replies: Mutex::new(HashMap::new()),
            holds: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Take `latency` to answer every image.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Return `text` for the image at `locator`.
    pub fn on(self, locator: impl Into<String>, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("recognizer lock poisoned")
            .insert(locator.into(), Reply::Text(text.into()));
        self
    }

    /// Block recognition of `locator` until the returned handle is notified.
    pub fn hold(&self, locator: impl Into<String>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.holds
            .lock()
            .expect("recognizer lock poisoned")
            .insert(locator.into(), gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn recognize(&self, image: &ImageHandle) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self
            .holds
            .lock()
            .expect("recognizer lock poisoned")
            .get(image.locator())
            .cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .replies
            .lock()
            .expect("recognizer lock poisoned")
            .get(image.locator())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Error(reason) => Err(TextwerkError::Recognition(reason)),
        }
    }
}

// ---------------------------------------------------------------------------
// Positioning
// ---------------------------------------------------------------------------

/// Positioning service with a fixed answer and latency.
pub struct ScriptedPositions {
    fix: Option<Coordinate>,
    latency: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<PositionRequest>>,
}

impl ScriptedPositions {
    /// Answer `fix` after `latency`.
    pub fn fixed(fix: Coordinate, latency: Duration) -> Self {
        Self {
            fix: Some(fix),
            latency,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Fail every query immediately.
    pub fn unavailable() -> Self {
        Self {
            fix: None,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PositionRequest> {
        *self.last_request.lock().expect("positions lock poisoned")
    }
}

#[async_trait]
impl PositionService for ScriptedPositions {
    async fn current_position(&self, request: &PositionRequest) -> Result<Coordinate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("positions lock poisoned") = Some(*request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.fix
            .ok_or_else(|| TextwerkError::Positioning("no fix available".into()))
    }
}

// ---------------------------------------------------------------------------
// Writers, share sheet, clipboard
// ---------------------------------------------------------------------------

/// Media writer that records saved locators.
#[derive(Default)]
pub struct RecordingMediaWriter {
    fail: bool,
    saved: Mutex<Vec<String>>,
}

impl RecordingMediaWriter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Locators of every save attempt, failed ones included.
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().expect("media lock poisoned").clone()
    }
}

#[async_trait]
impl MediaWriter for RecordingMediaWriter {
    async fn save(&self, image: &ImageHandle) -> Result<()> {
        self.saved
            .lock()
            .expect("media lock poisoned")
            .push(image.locator().to_owned());
        if self.fail {
            return Err(TextwerkError::MediaWrite("library is read-only".into()));
        }
        Ok(())
    }
}

/// File writer that keeps written files in memory.
#[derive(Default)]
pub struct RecordingFileWriter {
    fail: bool,
    written: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingFileWriter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn written(&self) -> Vec<(PathBuf, String)> {
        self.written.lock().expect("files lock poisoned").clone()
    }
}

#[async_trait]
impl FileWriter for RecordingFileWriter {
    async fn write(&self, path: &Path, text: &str) -> Result<()> {
        if self.fail {
            return Err(TextwerkError::Export("disk full".into()));
        }
        self.written
            .lock()
            .expect("files lock poisoned")
            .push((path.to_path_buf(), text.to_owned()));
        Ok(())
    }
}

/// Share sheet that records shared text.
#[derive(Default)]
pub struct RecordingShareSheet {
    fail: bool,
    shared: Mutex<Vec<String>>,
}

impl RecordingShareSheet {
    pub fn failing() -> Self {
        Self {
            fail: true,
            shared: Mutex::new(Vec::new()),
        }
    }

    /// Texts handed to the share sheet, failed attempts included.
    pub fn shared(&self) -> Vec<String> {
        self.shared.lock().expect("share lock poisoned").clone()
    }
}

#[async_trait]
impl ShareSheet for RecordingShareSheet {
    async fn share(&self, text: &str) -> Result<()> {
        self.shared
            .lock()
            .expect("share lock poisoned")
            .push(text.to_owned());
        if self.fail {
            return Err(TextwerkError::Share("share sheet dismissed with error".into()));
        }
        Ok(())
    }
}

/// Clipboard that records every value set.
#[derive(Default)]
pub struct RecordingClipboard {
    history: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn history(&self) -> Vec<String> {
        self.history.lock().expect("clipboard lock poisoned").clone()
    }
}

impl ClipboardService for RecordingClipboard {
    fn set_text(&self, text: &str) {
        self.history
            .lock()
            .expect("clipboard lock poisoned")
            .push(text.to_owned());
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// One of each fake, kept as concrete `Arc`s so tests can inspect them after
/// handing [`collaborators`](Self::collaborators) to the pipeline.
pub struct MockSet {
    pub capabilities: Arc<ScriptedCapabilities>,
    pub chooser: Arc<ScriptedChooser>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub positions: Arc<ScriptedPositions>,
    pub media: Arc<RecordingMediaWriter>,
    pub files: Arc<RecordingFileWriter>,
    pub share: Arc<RecordingShareSheet>,
    pub clipboard: Arc<RecordingClipboard>,
}

impl MockSet {
    /// All capabilities granted, positioning unavailable, recognizer returning `text`.
    pub fn new(chooser: ScriptedChooser, text: impl Into<String>) -> Self {
        Self {
            capabilities: Arc::new(ScriptedCapabilities::granting_all()),
            chooser: Arc::new(chooser),
            recognizer: Arc::new(ScriptedRecognizer::returning(text)),
            positions: Arc::new(ScriptedPositions::unavailable()),
            media: Arc::new(RecordingMediaWriter::default()),
            files: Arc::new(RecordingFileWriter::default()),
            share: Arc::new(RecordingShareSheet::default()),
            clipboard: Arc::new(RecordingClipboard::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            capabilities: self.capabilities.clone(),
            chooser: self.chooser.clone(),
            recognizer: self.recognizer.clone(),
            positions: self.positions.clone(),
            media: self.media.clone(),
            files: self.files.clone(),
            share: self.share.clone(),
            clipboard: self.clipboard.clone(),
        }
    }
}
