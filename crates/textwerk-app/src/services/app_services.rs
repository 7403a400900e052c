// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: loads configuration, opens the scan history and
// assembles the collaborators for a `ScanSession`.
//
// OCR models are loaded once per session. When they are missing the session
// still runs; every recognition then settles as a failure carrying the load
// error, so the photo and location are kept.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use textwerk_bridge::{Collaborators, LocalFileWriter, Recognizer};
use textwerk_core::AppConfig;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::types::ImageHandle;
use textwerk_pipeline::{HistoryEntry, ScanHistory, ScanSession};
use textwerk_vision::{OcrConfig, OcrRecognizer};
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const HISTORY_FILE: &str = "history.db";

pub struct AppServices {
    data_dir: PathBuf,
    config: AppConfig,
}

impl AppServices {
    /// Resolve the data directory and load the persisted config.
    pub fn init() -> Self {
        Self::at(data_dir::data_dir())
    }

    /// Services rooted at `dir` instead of the platform data directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        let config = load_config(&data_dir).unwrap_or_default();
        info!(path = %data_dir.display(), "app services initialised");
        Self { data_dir, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Update and persist the config.
    pub fn save_config(&mut self, config: AppConfig) -> Result<()> {
        persist_config(&self.data_dir, &config)?;
        self.config = config;
        Ok(())
    }

    /// Where exported text files go: the configured directory, or
    /// `<data>/exports`.
    pub fn export_dir(&self) -> PathBuf {
        match &self.config.export_dir {
            Some(dir) => dir.clone(),
            None => data_dir::subdir(&self.data_dir, "exports"),
        }
    }

    pub fn open_history(&self) -> Result<ScanHistory> {
        ScanHistory::open(self.data_dir.join(HISTORY_FILE))
    }

    pub fn recent_history(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        self.open_history()?.recent(limit)
    }

    /// Build a session on the native bridge.
    ///
    /// `image`, when given, answers the library chooser without opening a
    /// dialog.
    pub fn session(&self, image: Option<PathBuf>, models: Option<&Path>) -> Result<ScanSession> {
        let pictures = data_dir::subdir(&self.data_dir, "pictures");
        let bridge = textwerk_bridge::platform_bridge(pictures);
        #[cfg(not(any(target_os = "ios", target_os = "android")))]
        let bridge = match image {
            Some(path) => bridge.with_preselected(path),
            None => bridge,
        };
        #[cfg(any(target_os = "ios", target_os = "android"))]
        let _ = image;

        let collaborators = Collaborators::from_platform(
            Arc::new(bridge),
            load_recognizer(models),
            Arc::new(LocalFileWriter),
        );
        self.session_with(collaborators)
    }

    /// Build a session on caller-supplied collaborators.
    pub fn session_with(&self, collaborators: Collaborators) -> Result<ScanSession> {
        let session = ScanSession::new(collaborators, &self.config, self.export_dir());
        if !self.config.history_enabled {
            return Ok(session);
        }
        Ok(session.with_history(self.open_history()?))
    }
}

fn load_recognizer(models: Option<&Path>) -> Arc<dyn Recognizer> {
    let config = match models {
        Some(dir) => OcrConfig::from_dir(dir),
        None => OcrConfig::default(),
    };
    match OcrRecognizer::load(&config) {
        Ok(recognizer) => Arc::new(recognizer),
        Err(err) => {
            warn!(error = %err, "OCR engine unavailable; recognition will fail");
            Arc::new(UnavailableRecognizer {
                reason: err.to_string(),
            })
        }
    }
}

/// Stands in for the OCR engine when its models could not be loaded.
struct UnavailableRecognizer {
    reason: String,
}

#[async_trait]
impl Recognizer for UnavailableRecognizer {
    async fn recognize(&self, _image: &ImageHandle) -> Result<String> {
        Err(TextwerkError::Recognition(self.reason.clone()))
    }
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(data_dir.join(CONFIG_FILE), json)?;
    Ok(())
}
