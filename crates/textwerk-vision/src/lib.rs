// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// textwerk-vision: image preparation and on-device text recognition.
//
// `prepare` normalises an acquired image for recognition (downscale,
// grayscale, histogram equalisation). With the `ocr` feature, `ocr` wraps the
// `ocrs` engine and `recognizer` exposes it as a pipeline `Recognizer`.

pub mod prepare;

#[cfg(feature = "ocr")]
pub mod ocr;

#[cfg(feature = "ocr")]
pub mod recognizer;

pub use prepare::{PageImage, PrepareOptions};

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrEngine};

#[cfg(feature = "ocr")]
pub use recognizer::OcrRecognizer;
