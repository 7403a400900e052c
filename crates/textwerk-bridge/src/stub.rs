// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for builds where no native device APIs are wired in.
//
// Every capability reports `Denied` and every device call returns
// `PlatformUnavailable`, so the pipeline degrades instead of failing.

use async_trait::async_trait;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::{
    Capability, CapabilityStatus, Coordinate, ImageHandle, PositionRequest,
};

use crate::traits::*;

/// No-op bridge.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Unsupported (stub)"
    }
}

#[async_trait]
impl CapabilityService for StubBridge {
    async fn check(&self, _capability: Capability) -> Result<CapabilityStatus> {
        Ok(CapabilityStatus::Denied)
    }

    async fn request(&self, capability: Capability, _rationale: &str) -> Result<CapabilityStatus> {
        tracing::warn!(%capability, "CapabilityService::request called on stub bridge");
        Ok(CapabilityStatus::Denied)
    }
}

#[async_trait]
impl Chooser for StubBridge {
    async fn capture(&self) -> Result<Option<ImageHandle>> {
        tracing::warn!("Chooser::capture called on stub bridge");
        Err(TextwerkError::PlatformUnavailable)
    }

    async fn select_from_library(&self) -> Result<Option<ImageHandle>> {
        tracing::warn!("Chooser::select_from_library called on stub bridge");
        Err(TextwerkError::PlatformUnavailable)
    }
}

#[async_trait]
impl PositionService for StubBridge {
    async fn current_position(&self, _request: &PositionRequest) -> Result<Coordinate> {
        Err(TextwerkError::PlatformUnavailable)
    }
}

#[async_trait]
impl MediaWriter for StubBridge {
    async fn save(&self, _image: &ImageHandle) -> Result<()> {
        tracing::warn!("MediaWriter::save called on stub bridge");
        Err(TextwerkError::PlatformUnavailable)
    }
}

#[async_trait]
impl ShareSheet for StubBridge {
    async fn share(&self, _text: &str) -> Result<()> {
        tracing::warn!("ShareSheet::share called on stub bridge");
        Err(TextwerkError::PlatformUnavailable)
    }
}

impl ClipboardService for StubBridge {
    fn set_text(&self, _text: &str) {
        tracing::warn!("ClipboardService::set_text called on stub bridge");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_denies_every_capability() {
        let bridge = StubBridge;
        for capability in [
            Capability::Capture,
            Capability::Positioning,
            Capability::MediaRead,
            Capability::MediaWrite,
        ] {
            assert_eq!(bridge.check(capability).await.unwrap(), CapabilityStatus::Denied);
        }
    }

    #[tokio::test]
    async fn stub_chooser_is_unavailable() {
        let err = StubBridge.capture().await.unwrap_err();
        assert!(matches!(err, TextwerkError::PlatformUnavailable));
    }
}
