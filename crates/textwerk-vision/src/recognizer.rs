// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `Recognizer` backed by the bundled OCR engine.

use std::sync::Arc;

use async_trait::async_trait;
use textwerk_bridge::Recognizer;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::ImageHandle;
use tracing::instrument;

use crate::ocr::{OcrConfig, OcrEngine};
use crate::prepare::{PageImage, PrepareOptions, locator_path};

/// Loads the image behind a handle, prepares it, and runs OCR on the blocking
/// thread pool.
pub struct OcrRecognizer {
    engine: Arc<OcrEngine>,
    options: PrepareOptions,
}

impl OcrRecognizer {
    pub fn new(engine: OcrEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            options: PrepareOptions::default(),
        }
    }

    /// Load the models described by `config`.
    pub fn load(config: &OcrConfig) -> Result<Self> {
        Ok(Self::new(OcrEngine::new(config)?))
    }

    pub fn with_options(mut self, options: PrepareOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl Recognizer for OcrRecognizer {
    #[instrument(skip_all, fields(locator = %image.locator()))]
    async fn recognize(&self, image: &ImageHandle) -> Result<String> {
        let path = locator_path(image.locator());
        let engine = Arc::clone(&self.engine);
        let options = self.options;

        tokio::task::spawn_blocking(move || {
            let page = PageImage::open(&path)?.prepare(&options).into_dynamic();
            engine.recognize_text(&page)
        })
        .await
        .map_err(|e| TextwerkError::Recognition(format!("recognition task failed: {e}")))?
    }
}
