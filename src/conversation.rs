use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::LogError;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub input: String,
    pub response: String,
    pub timestamp: DateTime<Local>,
}

impl ConversationTurn {
    pub fn new(input: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
            timestamp: Local::now(),
        }
    }
}

/// Turns shown during the running process. Never filled back from the transcript.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<ConversationTurn>,
}

impl Session {
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Durable, append-only transcript of every turn.
pub trait ConversationLog: Send + Sync {
    fn append(&self, turn: &ConversationTurn) -> Result<(), LogError>;

    /// All turns in the order they were appended.
    fn read_all(&self) -> Result<Vec<ConversationTurn>, LogError>;

    /// Drops the whole transcript.
    fn clear(&self) -> Result<(), LogError>;
}

#[derive(Serialize, Deserialize)]
struct TranscriptRow {
    #[serde(rename = "User")]
    user: String,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

impl From<&ConversationTurn> for TranscriptRow {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            user: turn.input.clone(),
            response: turn.response.clone(),
            timestamp: turn.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, false),
        }
    }
}

impl TryFrom<TranscriptRow> for ConversationTurn {
    type Error = LogError;

    fn try_from(row: TranscriptRow) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&row.timestamp)?;
        Ok(Self {
            input: row.user,
            response: row.response,
            timestamp,
        })
    }
}

/// Accepts RFC 3339 and offset-less ISO-8601 local times.
fn parse_timestamp(value: &str) -> Result<DateTime<Local>, LogError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Local)),
        Err(source) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .ok_or_else(|| LogError::Timestamp {
                value: value.to_string(),
                source,
            }),
    }
}

/// CSV transcript with `User`, `Response` and `Timestamp` columns.
///
/// Writes go through a mutex so concurrent turns never interleave rows. Clearing
/// deletes the file; the next append recreates it with a header.
pub struct CsvConversationLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvConversationLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ConversationLog for CsvConversationLog {
    fn append(&self, turn: &ConversationTurn) -> Result<(), LogError> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let len = file.metadata().map_err(|e| self.io_error(e))?.len();
        let needs_header = len == 0;
        // a last row without its terminator would swallow the new one
        if !needs_header && !ends_with_line_break(&mut file).map_err(|e| self.io_error(e))? {
            log::warn!(
                "Conversation log '{}' lacks a final line break, terminating its last row",
                self.path.display()
            );
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(TranscriptRow::from(turn))
            .map_err(|source| LogError::Write {
                path: self.path.clone(),
                source,
            })?;
        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ConversationTurn>, LogError> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let read_error = |source| LogError::Read {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::Reader::from_path(&self.path).map_err(read_error)?;
        reader
            .deserialize::<TranscriptRow>()
            .map(|row| row.map_err(read_error).and_then(ConversationTurn::try_from))
            .collect()
    }

    fn clear(&self) -> Result<(), LogError> {
        let _guard = self.lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Deleted conversation log '{}'", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

fn ends_with_line_break(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(matches!(last[0], b'\n' | b'\r'))
}

/// Transcript kept in memory, for embedding and tests.
#[derive(Default)]
pub struct MemoryConversationLog {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl MemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationLog for MemoryConversationLog {
    fn append(&self, turn: &ConversationTurn) -> Result<(), LogError> {
        self.turns.lock().push(turn.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ConversationTurn>, LogError> {
        Ok(self.turns.lock().clone())
    }

    fn clear(&self) -> Result<(), LogError> {
        self.turns.lock().clear();
        Ok(())
    }
}
