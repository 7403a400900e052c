// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Desktop bridge.
//
// Desktops have no runtime permission model, no camera picker and no
// positioning service we can rely on. Library selection goes through the
// native file dialog (`rfd`); "saving to the media library" copies the image
// into a pictures directory; copied text goes to the system clipboard
// (`arboard`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::{
    Capability, CapabilityStatus, Coordinate, ImageHandle, PositionRequest, Provenance,
};
use tracing::{debug, info, warn};

use crate::traits::*;

/// Image extensions offered in the file dialog.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp", "webp"];

pub struct DesktopBridge {
    pictures_dir: PathBuf,
    /// When set, library selection returns this path instead of opening a dialog.
    preselected: Option<PathBuf>,
}

impl DesktopBridge {
    pub fn new(pictures_dir: impl Into<PathBuf>) -> Self {
        Self {
            pictures_dir: pictures_dir.into(),
            preselected: None,
        }
    }

    /// Skip the file dialog and "select" `path` whenever the library is opened.
    pub fn with_preselected(mut self, path: impl Into<PathBuf>) -> Self {
        self.preselected = Some(path.into());
        self
    }

    fn pick_with_dialog() -> Option<PathBuf> {
        rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
    }
}

impl PlatformBridge for DesktopBridge {
    fn platform_name(&self) -> &str {
        "Desktop"
    }
}

#[async_trait]
impl CapabilityService for DesktopBridge {
    async fn check(&self, capability: Capability) -> Result<CapabilityStatus> {
        Ok(match capability {
            Capability::MediaRead | Capability::MediaWrite => CapabilityStatus::Granted,
            Capability::Capture | Capability::Positioning => CapabilityStatus::Denied,
        })
    }

    async fn request(&self, capability: Capability, _rationale: &str) -> Result<CapabilityStatus> {
        self.check(capability).await
    }
}

#[async_trait]
impl Chooser for DesktopBridge {
    async fn capture(&self) -> Result<Option<ImageHandle>> {
        Err(TextwerkError::PlatformUnavailable)
    }

    async fn select_from_library(&self) -> Result<Option<ImageHandle>> {
        let picked = match &self.preselected {
            Some(path) => Some(path.clone()),
            None => tokio::task::spawn_blocking(Self::pick_with_dialog)
                .await
                .map_err(|e| TextwerkError::Device(format!("file dialog task failed: {e}")))?,
        };

        let Some(path) = picked else {
            debug!("file dialog dismissed");
            return Ok(None);
        };

        if !tokio::fs::try_exists(&path).await? {
            return Err(TextwerkError::Device(format!(
                "selected file does not exist: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), "image selected from disk");
        Ok(Some(ImageHandle::new(
            path.to_string_lossy().into_owned(),
            Provenance::Selected,
        )))
    }
}

#[async_trait]
impl PositionService for DesktopBridge {
    async fn current_position(&self, _request: &PositionRequest) -> Result<Coordinate> {
        Err(TextwerkError::PlatformUnavailable)
    }
}

#[async_trait]
impl MediaWriter for DesktopBridge {
    async fn save(&self, image: &ImageHandle) -> Result<()> {
        let source = Path::new(image.locator());
        let file_name = source.file_name().ok_or_else(|| {
            TextwerkError::MediaWrite(format!("not a file locator: {}", image.locator()))
        })?;

        tokio::fs::create_dir_all(&self.pictures_dir).await?;
        let target = self.pictures_dir.join(file_name);
        tokio::fs::copy(source, &target)
            .await
            .map_err(|e| TextwerkError::MediaWrite(e.to_string()))?;

        info!(target = %target.display(), "image copied to pictures directory");
        Ok(())
    }
}

#[async_trait]
impl ShareSheet for DesktopBridge {
    async fn share(&self, _text: &str) -> Result<()> {
        Err(TextwerkError::PlatformUnavailable)
    }
}

impl ClipboardService for DesktopBridge {
    fn set_text(&self, text: &str) {
        match write_system_clipboard(text) {
            Ok(()) => debug!(chars = text.chars().count(), "text placed on system clipboard"),
            Err(err) => warn!(error = %err, "text not copied"),
        }
    }
}

/// Replace the system clipboard contents with `text`.
fn write_system_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| TextwerkError::Device(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(text)
        .map_err(|e| TextwerkError::Device(format!("clipboard write failed: {e}")))
}
