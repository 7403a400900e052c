// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Textwerk scan pipeline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a scan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A runtime-revocable permission to use a device feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Live camera capture.
    Capture,
    /// Location fix.
    Positioning,
    /// Reading from the media library.
    MediaRead,
    /// Writing into the media library.
    MediaWrite,
}

impl Capability {
    /// Short reason handed to the authorization prompt.
    pub fn default_rationale(&self) -> &'static str {
        match self {
            Self::Capture => "The camera is used to photograph documents for text recognition.",
            Self::Positioning => "Your location is attached to each scan.",
            Self::MediaRead => "Photos from your library can be scanned for text.",
            Self::MediaWrite => "Captured photos can be saved to your library.",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Capture => "camera",
            Self::Positioning => "location",
            Self::MediaRead => "photo library (read)",
            Self::MediaWrite => "photo library (write)",
        };
        f.write_str(name)
    }
}

/// Answer of the platform authorization subsystem for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityStatus {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undecided,
}

impl CapabilityStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Taken just now with the capture device.
    Captured,
    /// Picked from the stored media library.
    Selected,
}

/// What the user asked to acquire an image from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionSource {
    Capture,
    Library,
}

impl AcquisitionSource {
    /// Capability that must be granted before the chooser is opened.
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::Capture => Capability::Capture,
            Self::Library => Capability::MediaRead,
        }
    }

    /// Provenance stamped on images produced by this source.
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Capture => Provenance::Captured,
            Self::Library => Provenance::Selected,
        }
    }
}

/// Opaque reference to an acquired image. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    locator: String,
    provenance: Provenance,
}

impl ImageHandle {
    pub fn new(locator: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            locator: locator.into(),
            provenance,
        }
    }

    /// Platform locator (file path or content URI).
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}

/// A geolocation fix in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within WGS-84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Parameters for a single positioning query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    /// Upper bound on how long the query may take.
    pub timeout: Duration,
    /// Oldest cached fix that is still acceptable.
    pub max_cache_age: Duration,
}

/// Settled result of a recognition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecognitionOutcome {
    /// Text was found. Never blank.
    Recognized(String),
    /// The recognizer ran but found nothing but whitespace.
    Empty,
    /// The recognizer could not be invoked or reported an error.
    Failed(String),
}

impl RecognitionOutcome {
    /// Classify raw recognizer output. Text is kept verbatim when non-blank.
    pub fn from_text(text: String) -> Self {
        if text.trim().is_empty() {
            Self::Empty
        } else {
            Self::Recognized(text)
        }
    }

    /// The recognized text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Recognized(text) => Some(text),
            Self::Empty | Self::Failed(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Recognized(_))
    }

    /// Stable lowercase tag used for persistence.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Recognized(_) => "recognized",
            Self::Empty => "empty",
            Self::Failed(_) => "failed",
        }
    }
}

/// Finalized result of one pipeline run.
///
/// Built once both attempts have settled and never mutated afterwards; the
/// fields are private so consumers only get read access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    id: ScanId,
    image: ImageHandle,
    text: RecognitionOutcome,
    coordinate: Option<Coordinate>,
    created_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Build a record from settled values, stamped with the current time.
    pub fn new(image: ImageHandle, text: RecognitionOutcome, coordinate: Option<Coordinate>) -> Self {
        Self {
            id: ScanId::new(),
            image,
            text,
            coordinate,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn provenance(&self) -> Provenance {
        self.image.provenance()
    }

    pub fn text(&self) -> &RecognitionOutcome {
        &self.text
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Lifecycle states of the acquisition-and-processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Nothing in flight and no record.
    Idle,
    /// Waiting on the authorization subsystem.
    AwaitingCapability,
    /// The chooser or capture device is open.
    Acquiring,
    /// Positioning and recognition are running.
    Processing,
    /// A record is available to the action gate.
    Ready,
    /// The required capability was denied.
    AcquisitionFailed,
}

/// Tone of a transient status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Info,
    Success,
    Failure,
}

/// Short user-facing status line produced by acquisitions and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Failure,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_empty() {
        assert_eq!(RecognitionOutcome::from_text(String::new()), RecognitionOutcome::Empty);
        assert_eq!(
            RecognitionOutcome::from_text("  \n\t ".into()),
            RecognitionOutcome::Empty
        );
    }

    #[test]
    fn recognized_text_is_kept_verbatim() {
        let outcome = RecognitionOutcome::from_text("  INVOICE #102\n".into());
        assert_eq!(outcome.text(), Some("  INVOICE #102\n"));
        assert!(outcome.is_recognized());
    }

    #[test]
    fn failed_outcome_has_no_text() {
        let outcome = RecognitionOutcome::Failed("engine offline".into());
        assert_eq!(outcome.text(), None);
        assert_eq!(outcome.kind(), "failed");
    }

    #[test]
    fn source_maps_to_capability_and_provenance() {
        assert_eq!(AcquisitionSource::Capture.required_capability(), Capability::Capture);
        assert_eq!(AcquisitionSource::Library.required_capability(), Capability::MediaRead);
        assert_eq!(AcquisitionSource::Capture.provenance(), Provenance::Captured);
        assert_eq!(AcquisitionSource::Library.provenance(), Provenance::Selected);
    }

    #[test]
    fn coordinate_bounds() {
        assert!(Coordinate::new(40.71, -74.00).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn record_exposes_provenance_of_its_image() {
        let image = ImageHandle::new("file:///tmp/a.jpg", Provenance::Captured);
        let record = ScanRecord::new(image, RecognitionOutcome::Empty, None);
        assert_eq!(record.provenance(), Provenance::Captured);
        assert_eq!(record.coordinate(), None);
    }
}
