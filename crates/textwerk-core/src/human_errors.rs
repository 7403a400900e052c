// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how a front end presents the alert.

use crate::error::TextwerkError;
use crate::types::Capability;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again is likely to work.
    Transient,
    /// The user must change something first (grant access, free space).
    ActionRequired,
    /// Retrying will not help on this device.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether a fresh attempt may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `TextwerkError` into a `HumanError`.
pub fn humanize_error(err: &TextwerkError) -> HumanError {
    match err {
        TextwerkError::CapabilityDenied(capability) => humanize_denial(*capability),

        TextwerkError::Device(_) => HumanError {
            message: "We couldn't get a picture.".into(),
            suggestion: "The camera or photo picker stopped unexpectedly. Please try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Recognition(_) => HumanError {
            message: "Text recognition didn't work on this picture.".into(),
            suggestion: "Try again with better lighting, making sure the text is clear and in focus.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Positioning(_) | TextwerkError::PositioningTimeout(_) => HumanError {
            message: "We couldn't find your location.".into(),
            suggestion: "The scan was kept without a location. Moving near a window can help next time.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try a JPEG or PNG instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        TextwerkError::MediaWrite(_) => HumanError {
            message: "The photo couldn't be saved.".into(),
            suggestion: "Check that your device has free space, then try saving again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Export(_) => HumanError {
            message: "The text file couldn't be written.".into(),
            suggestion: "Check that your device has free space, then try exporting again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Share(_) => HumanError {
            message: "Sharing didn't work.".into(),
            suggestion: "Try again, or copy the text and paste it into the other app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Database(_) => HumanError {
            message: "The scan history had a problem.".into(),
            suggestion: "Your scan is still available. Try closing and reopening the app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing it again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The app doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or pick a different location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        TextwerkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::Bridge(_) => HumanError {
            message: "A device feature didn't work.".into(),
            suggestion: "Try restarting the app. Some features may not be available on all devices.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        TextwerkError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Some features need a phone or tablet with a camera and location services.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

fn humanize_denial(capability: Capability) -> HumanError {
    let (message, suggestion) = match capability {
        Capability::Capture => (
            "Camera access is turned off.",
            "Allow camera access in your device settings to take a picture.",
        ),
        Capability::Positioning => (
            "Location access is turned off.",
            "Scans will be saved without a location. Allow location access in settings to add one.",
        ),
        Capability::MediaRead => (
            "Photo library access is turned off.",
            "Allow photo library access in your device settings to pick a picture.",
        ),
        Capability::MediaWrite => (
            "Saving photos is not allowed.",
            "Allow the app to add photos in your device settings, then save again.",
        ),
    };
    HumanError {
        message: message.into(),
        suggestion: suggestion.into(),
        retriable: false,
        severity: Severity::ActionRequired,
    }
}
