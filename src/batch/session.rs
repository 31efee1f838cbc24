//! Persisted batch sessions.
//! A session is the batch state plus the context needed to resume it
//! (input name, language pair), stored as pretty JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{BatchError, BatchState};
use crate::translate::LanguageTag;

pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported session version {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Invalid(#[from] BatchError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSession {
    pub version: u32,
    /// File name of the document the units were extracted from.
    pub input: String,
    pub source: LanguageTag,
    pub target: LanguageTag,
    #[serde(default)]
    pub tables_skipped: usize,
    pub state: BatchState,
}

impl BatchSession {
    pub fn new(
        input: impl Into<String>,
        source: LanguageTag,
        target: LanguageTag,
        state: BatchState,
    ) -> Self {
        Self {
            version: SESSION_VERSION,
            input: input.into(),
            source,
            target,
            tables_skipped: 0,
            state,
        }
    }

    /// Load and validate a session. A unit left InProgress by an
    /// interrupted run goes back to Pending; the batch comes back paused.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut session: BatchSession = serde_json::from_str(&raw)?;
        if session.version != SESSION_VERSION {
            return Err(SessionError::UnsupportedVersion(session.version));
        }
        session.state.validate()?;
        session.state.recover_interrupted();

        info!(
            path = %path.display(),
            units = session.state.len(),
            cursor = session.state.cursor(),
            "session_loaded"
        );
        Ok(session)
    }

    /// Write through a temp file and rename, so a crash never leaves a
    /// truncated session behind.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        let io_err = |source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), cursor = self.state.cursor(), "session_saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{TranslationUnit, UnitStatus};

    fn session_with_interrupted_step() -> BatchSession {
        let mut state = BatchState::new();
        state.start(TranslationUnit::from_paragraphs(["one", "two"]));
        state.begin_step();
        BatchSession::new(
            "doc.docx",
            LanguageTag::new("eng_Latn"),
            LanguageTag::new("fra_Latn"),
            state,
        )
    }

    #[test]
    fn save_then_load_recovers_interrupted_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        session_with_interrupted_step().save(&path).unwrap();

        let loaded = BatchSession::load(&path).unwrap();
        assert_eq!(loaded.input, "doc.docx");
        assert_eq!(loaded.state.cursor(), 0);
        assert!(!loaded.state.is_running());
        assert_eq!(loaded.state.units()[0].status, UnitStatus::Pending);
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn rejects_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = session_with_interrupted_step();
        session.version = 99;
        session.save(&path).unwrap();
        assert!(matches!(
            BatchSession::load(&path),
            Err(SessionError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn failed_unit_ahead_of_cursor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = session_with_interrupted_step();
        session.state.recover_interrupted();
        session.save(&path).unwrap();

        let edited = std::fs::read_to_string(&path)
            .unwrap()
            .replacen("\"Pending\"", "\"Failed\"", 1);
        std::fs::write(&path, edited).unwrap();

        assert!(matches!(
            BatchSession::load(&path),
            Err(SessionError::Invalid(BatchError::Corrupt(_)))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BatchSession::load(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(matches!(err, SessionError::Io { .. }));
    }
}
