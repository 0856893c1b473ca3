//! JSONL log of generation calls (chat completions and image requests).
//!
//! One line per call, bucketed by UTC day under the data directory:
//! `<data_dir>/logs/generation_logs_YYYY-MM-DD.jsonl`.
//! Set `NOTHINGAI_LOGGING_DISABLED=1` to turn every write into a no-op.

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub use chrono;

/// Errors that can occur while appending a record.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which generation path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Chat,
    Image,
}

/// One completed (or failed) generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub call_id: String,
    pub kind: GenerationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Model requested by the caller.
    pub model: String,
    /// Model that finally answered, when fallback switched it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u128,
    pub attempts: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt_chars: usize,
    pub output_chars: usize,
    /// Set when the call ended through cancellation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

/// Check if logging is disabled via environment variable.
pub fn logging_disabled() -> bool {
    std::env::var("NOTHINGAI_LOGGING_DISABLED")
        .is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

/// Measures a call and hands out its id.
pub struct CallTimer {
    pub call_id: String,
    pub started_at: DateTime<Utc>,
    start_instant: std::time::Instant,
}

impl CallTimer {
    /// Start a new timer with a fresh call id.
    pub fn start() -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            start_instant: std::time::Instant::now(),
        }
    }

    /// Completion timestamp and elapsed milliseconds.
    pub fn finish(&self) -> (DateTime<Utc>, u128) {
        (Utc::now(), self.start_instant.elapsed().as_millis())
    }

    /// Start a record for this call. Outcome fields default to a failed,
    /// zero-attempt call; fill them in before appending.
    pub fn record(&self, kind: GenerationKind, model: impl Into<String>) -> GenerationRecord {
        let (completed_at, duration_ms) = self.finish();
        GenerationRecord {
            call_id: self.call_id.clone(),
            kind,
            conversation_id: None,
            model: model.into(),
            served_by: None,
            started_at: self.started_at,
            completed_at,
            duration_ms,
            attempts: 0,
            success: false,
            error: None,
            prompt_chars: 0,
            output_chars: 0,
            cancelled: false,
        }
    }
}

/// Appends [`GenerationRecord`]s to day-bucketed JSONL files.
#[derive(Debug, Clone)]
pub struct LogWriter {
    logs_dir: PathBuf,
}

impl LogWriter {
    /// Writer rooted at `logs_dir` (created lazily).
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
        }
    }

    /// Writer rooted at `<data_dir>/logs`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("logs"))
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    fn day_file_name(date: DateTime<Utc>) -> String {
        date.format("generation_logs_%Y-%m-%d.jsonl").to_string()
    }

    /// Path of the JSONL file a record completed at `date` lands in.
    pub fn day_file(&self, date: DateTime<Utc>) -> PathBuf {
        self.logs_dir.join(Self::day_file_name(date))
    }

    /// Append one record under an exclusive file lock.
    ///
    /// Returns `Ok(())` without touching disk when logging is disabled.
    pub fn append(&self, record: &GenerationRecord) -> Result<(), LogError> {
        if logging_disabled() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.logs_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.day_file(record.completed_at))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write()?;

        // One write per line so concurrent appenders never interleave
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        guard.write_all(&line)?;
        Ok(())
    }

    /// Read back every record from one day's file, skipping unparsable lines.
    pub fn read_day(&self, date: DateTime<Utc>) -> Result<Vec<GenerationRecord>, LogError> {
        let path = self.day_file(date);
        if !path.exists() {
            return Ok(vec![]);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn sample(kind: GenerationKind) -> GenerationRecord {
        let timer = CallTimer::start();
        let mut record = timer.record(kind, "meta-llama/llama-3.3-70b-instruct:free");
        record.attempts = 1;
        record.success = true;
        record.prompt_chars = 12;
        record.output_chars = 40;
        record
    }

    #[test]
    fn call_timer_ids_are_uuids() {
        let timer = CallTimer::start();
        assert!(Uuid::parse_str(&timer.call_id).is_ok());
    }

    #[test]
    fn call_timer_measures_duration() {
        let timer = CallTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let (completed_at, duration_ms) = timer.finish();
        assert!(duration_ms >= 10);
        assert!(completed_at >= timer.started_at);
    }

    #[test]
    fn day_file_name_format() {
        let date = DateTime::parse_from_rfc3339("2026-03-15T23:59:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            LogWriter::day_file_name(date),
            "generation_logs_2026-03-15.jsonl"
        );
    }

    #[test]
    #[serial(env)]
    fn disabled_env_values() {
        for (value, expected) in [
            ("1", true),
            ("true", true),
            ("on", true),
            ("0", false),
            ("false", false),
        ] {
            // SAFETY: serialized via #[serial(env)]
            unsafe { std::env::set_var("NOTHINGAI_LOGGING_DISABLED", value) };
            assert_eq!(logging_disabled(), expected, "value {value}");
        }
        // SAFETY: serialized via #[serial(env)]
        unsafe { std::env::remove_var("NOTHINGAI_LOGGING_DISABLED") };
        assert!(!logging_disabled());
    }

    #[test]
    #[serial(env)]
    fn append_then_read_back() {
        let temp = tempfile::tempdir().unwrap();
        let writer = LogWriter::in_data_dir(temp.path());

        let chat = sample(GenerationKind::Chat);
        let mut image = sample(GenerationKind::Image);
        image.success = false;
        image.error = Some("all endpoints failed".into());

        writer.append(&chat).unwrap();
        writer.append(&image).unwrap();

        let records = writer.read_day(chat.completed_at).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, GenerationKind::Chat);
        assert_eq!(records[1].error.as_deref(), Some("all endpoints failed"));
        assert!(temp.path().join("logs").is_dir());
    }

    #[test]
    #[serial(env)]
    fn disabled_logging_writes_nothing() {
        // SAFETY: serialized via #[serial(env)]
        unsafe { std::env::set_var("NOTHINGAI_LOGGING_DISABLED", "1") };

        let temp = tempfile::tempdir().unwrap();
        let writer = LogWriter::in_data_dir(temp.path());
        writer.append(&sample(GenerationKind::Chat)).unwrap();

        // SAFETY: serialized via #[serial(env)]
        unsafe { std::env::remove_var("NOTHINGAI_LOGGING_DISABLED") };

        assert!(!writer.logs_dir().exists());
    }

    #[test]
    fn optional_fields_omitted() {
        let json = serde_json::to_string(&sample(GenerationKind::Chat)).unwrap();
        assert!(!json.contains("served_by"));
        assert!(!json.contains("conversation_id"));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("cancelled"));
        assert!(json.contains("\"kind\":\"chat\""));
    }
}
