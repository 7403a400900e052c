// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local filesystem writer for exported text.

use std::path::Path;

use async_trait::async_trait;
use textwerk_core::error::{Result, TextwerkError};
use tracing::debug;

use crate::traits::FileWriter;

/// Writes UTF-8 text files with `tokio::fs`.
pub struct LocalFileWriter;

#[async_trait]
impl FileWriter for LocalFileWriter {
    async fn write(&self, path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TextwerkError::Export(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(path, text.as_bytes())
            .await
            .map_err(|e| TextwerkError::Export(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = text.len(), "text file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("ocr_result_1.txt");

        LocalFileWriter.write(&path, "TOTAL 45.00").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TOTAL 45.00");
    }
}
