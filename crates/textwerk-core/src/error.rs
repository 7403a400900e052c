// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Textwerk.

use thiserror::Error;

use crate::types::Capability;

/// Top-level error type for all Textwerk operations.
#[derive(Debug, Error)]
pub enum TextwerkError {
    // -- Acquisition --
    #[error("{0} access was denied")]
    CapabilityDenied(Capability),

    #[error("capture device or chooser failed: {0}")]
    Device(String),

    // -- Processing --
    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("positioning failed: {0}")]
    Positioning(String),

    #[error("positioning timed out after {0} ms")]
    PositioningTimeout(u64),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Actions --
    #[error("saving to the media library failed: {0}")]
    MediaWrite(String),

    #[error("writing export file failed: {0}")]
    Export(String),

    #[error("sharing failed: {0}")]
    Share(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TextwerkError>;
