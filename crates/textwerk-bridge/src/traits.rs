// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the scan pipeline's collaborators.
//
// The pipeline never talks to a device directly. Everything it needs (the
// authorization subsystem, the chooser, positioning, recognition, storage,
// share sheet and clipboard) is reached through one of these traits, so the
// same core runs against a phone, a desktop, or scripted fakes in tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use textwerk_core::error::Result;
use textwerk_core::types::{
    Capability, CapabilityStatus, Coordinate, ImageHandle, PositionRequest,
};

/// Runtime authorization for device features.
#[async_trait]
pub trait CapabilityService: Send + Sync {
    /// Current decision for `capability`, without prompting.
    async fn check(&self, capability: Capability) -> Result<CapabilityStatus>;

    /// Prompt the user. Returns the decision they made.
    async fn request(&self, capability: Capability, rationale: &str) -> Result<CapabilityStatus>;
}

/// Obtains images from the capture device or the media library.
#[async_trait]
pub trait Chooser: Send + Sync {
    /// Launch the camera. `Ok(None)` means the user cancelled.
    async fn capture(&self) -> Result<Option<ImageHandle>>;

    /// Open the library picker. `Ok(None)` means the user cancelled.
    async fn select_from_library(&self) -> Result<Option<ImageHandle>>;
}

/// Optical text recognition.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Return all text found in the image, lines separated by `\n`.
    async fn recognize(&self, image: &ImageHandle) -> Result<String>;
}

/// Location fixes.
#[async_trait]
pub trait PositionService: Send + Sync {
    async fn current_position(&self, request: &PositionRequest) -> Result<Coordinate>;
}

/// Writes images into the device media library.
#[async_trait]
pub trait MediaWriter: Send + Sync {
    async fn save(&self, image: &ImageHandle) -> Result<()>;
}

/// Writes plain-text files.
#[async_trait]
pub trait FileWriter: Send + Sync {
    /// Write `text` as UTF-8 to `path`, creating parent directories.
    async fn write(&self, path: &Path, text: &str) -> Result<()>;
}

/// Hands text to the OS share sheet.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, text: &str) -> Result<()>;
}

/// System clipboard. Fire-and-forget.
pub trait ClipboardService: Send + Sync {
    fn set_text(&self, text: &str);
}

/// The native half of the collaborators: everything a platform SDK provides.
///
/// Recognition and file writing are done in Rust and are supplied separately.
pub trait PlatformBridge:
    CapabilityService + Chooser + PositionService + MediaWriter + ShareSheet + ClipboardService
{
    /// Human-readable platform name (e.g. "iOS 17", "Desktop").
    fn platform_name(&self) -> &str;
}

/// Every collaborator the pipeline needs, as shared trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub capabilities: Arc<dyn CapabilityService>,
    pub chooser: Arc<dyn Chooser>,
    pub recognizer: Arc<dyn Recognizer>,
    pub positions: Arc<dyn PositionService>,
    pub media: Arc<dyn MediaWriter>,
    pub files: Arc<dyn FileWriter>,
    pub share: Arc<dyn ShareSheet>,
    pub clipboard: Arc<dyn ClipboardService>,
}

impl Collaborators {
    /// Wire a platform bridge together with the Rust-side recognizer and file writer.
    pub fn from_platform<B>(
        bridge: Arc<B>,
        recognizer: Arc<dyn Recognizer>,
        files: Arc<dyn FileWriter>,
    ) -> Self
    where
        B: PlatformBridge + 'static,
    {
        Self {
            capabilities: bridge.clone(),
            chooser: bridge.clone(),
            recognizer,
            positions: bridge.clone(),
            media: bridge.clone(),
            files,
            share: bridge.clone(),
            clipboard: bridge,
        }
    }
}
