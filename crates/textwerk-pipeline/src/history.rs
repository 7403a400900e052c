// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan history: append-only SQLite log of finalized scan records.
//
// Schema:
//   scan_history(
//     id          INTEGER PRIMARY KEY AUTOINCREMENT,
//     scan_id     TEXT    NOT NULL UNIQUE,  -- ScanId (UUID)
//     created_at  TEXT    NOT NULL,         -- RFC 3339
//     provenance  TEXT    NOT NULL,         -- "captured" | "selected"
//     locator     TEXT    NOT NULL,
//     outcome     TEXT    NOT NULL,         -- "recognized" | "empty" | "failed"
//     text        TEXT,                     -- recognized text, verbatim
//     failure     TEXT,                     -- recognizer error, if failed
//     latitude    REAL,
//     longitude   REAL
//   )

use std::path::Path;

use rusqlite::{Connection, params};
use serde::Serialize;
use textwerk_core::error::TextwerkError;
use textwerk_core::types::{Provenance, RecognitionOutcome, ScanRecord};
use tracing::{debug, instrument};

fn db_err(e: rusqlite::Error) -> TextwerkError {
    TextwerkError::Database(e.to_string())
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scan_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id     TEXT    NOT NULL UNIQUE,
    created_at  TEXT    NOT NULL,
    provenance  TEXT    NOT NULL,
    locator     TEXT    NOT NULL,
    outcome     TEXT    NOT NULL,
    text        TEXT,
    failure     TEXT,
    latitude    REAL,
    longitude   REAL
);";

/// One stored scan, as read back from the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub scan_id: String,
    pub created_at: String,
    pub provenance: String,
    pub locator: String,
    pub outcome: String,
    pub text: Option<String>,
    pub failure: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub struct ScanHistory {
    conn: Connection,
}

impl ScanHistory {
    /// Open (or create) the history database at `path`, in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TextwerkError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        debug!("scan history opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, TextwerkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Append a finalized record. Recording the same scan twice is a no-op.
    #[instrument(skip_all, fields(scan = %record.id(), outcome = record.text().kind()))]
    pub fn record(&self, record: &ScanRecord) -> Result<(), TextwerkError> {
        let provenance = match record.provenance() {
            Provenance::Captured => "captured",
            Provenance::Selected => "selected",
        };
        let failure = match record.text() {
            RecognitionOutcome::Failed(reason) => Some(reason.as_str()),
            _ => None,
        };
        let coordinate = record.coordinate();

        self.conn
            .execute(
                "INSERT OR IGNORE INTO scan_history
                   (scan_id, created_at, provenance, locator, outcome, text, failure, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id().to_string(),
                    record.created_at().to_rfc3339(),
                    provenance,
                    record.image().locator(),
                    record.text().kind(),
                    record.text().text(),
                    failure,
                    coordinate.map(|c| c.latitude),
                    coordinate.map(|c| c.longitude),
                ],
            )
            .map_err(db_err)?;

        debug!("scan recorded");
        Ok(())
    }

    /// The most recent `limit` scans, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<HistoryEntry>, TextwerkError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, scan_id, created_at, provenance, locator, outcome, text, failure,
                        latitude, longitude
                 FROM scan_history
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    scan_id: row.get(1)?,
                    created_at: row.get(2)?,
                    provenance: row.get(3)?,
                    locator: row.get(4)?,
                    outcome: row.get(5)?,
                    text: row.get(6)?,
                    failure: row.get(7)?,
                    latitude: row.get(8)?,
                    longitude: row.get(9)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64, TextwerkError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM scan_history", [], |row| row.get(0))
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_core::types::{Coordinate, ImageHandle};

    fn make_history() -> ScanHistory {
        ScanHistory::open_in_memory().expect("open in-memory history")
    }

    fn scan(text: RecognitionOutcome, coordinate: Option<Coordinate>) -> ScanRecord {
        ScanRecord::new(
            ImageHandle::new("/tmp/page.jpg", Provenance::Captured),
            text,
            coordinate,
        )
    }

    #[test]
    fn record_and_count() {
        let history = make_history();
        assert_eq!(history.count().unwrap(), 0);
        history
            .record(&scan(RecognitionOutcome::Recognized("a".into()), None))
            .unwrap();
        history.record(&scan(RecognitionOutcome::Empty, None)).unwrap();
        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn same_scan_is_stored_once() {
        let history = make_history();
        let record = scan(RecognitionOutcome::Empty, None);
        history.record(&record).unwrap();
        history.record(&record).unwrap();
        assert_eq!(history.count().unwrap(), 1);
    }

    #[test]
    fn fields_round_trip() {
        let history = make_history();
        let record = scan(
            RecognitionOutcome::Recognized(" INVOICE\n".into()),
            Some(Coordinate::new(40.71, -74.0)),
        );
        history.record(&record).unwrap();

        let entries = history.recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.scan_id, record.id().to_string());
        assert_eq!(entry.provenance, "captured");
        assert_eq!(entry.outcome, "recognized");
        assert_eq!(entry.text.as_deref(), Some(" INVOICE\n"));
        assert_eq!(entry.failure, None);
        assert_eq!(entry.latitude, Some(40.71));
        assert_eq!(entry.longitude, Some(-74.0));
    }

    #[test]
    fn failure_reason_is_kept() {
        let history = make_history();
        history
            .record(&scan(RecognitionOutcome::Failed("model missing".into()), None))
            .unwrap();
        let entry = &history.recent(1).unwrap()[0];
        assert_eq!(entry.outcome, "failed");
        assert_eq!(entry.text, None);
        assert_eq!(entry.failure.as_deref(), Some("model missing"));
        assert_eq!(entry.latitude, None);
    }

    #[test]
    fn recent_is_newest_first() {
        let history = make_history();
        for _ in 0..5 {
            history.record(&scan(RecognitionOutcome::Empty, None)).unwrap();
        }
        let recent = history.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
    }

    #[test]
    fn file_backed_history_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let history = ScanHistory::open(&path).unwrap();
            history.record(&scan(RecognitionOutcome::Empty, None)).unwrap();
        }
        let reopened = ScanHistory::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
