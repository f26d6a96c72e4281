//! Where log records are kept.

use std::collections::HashMap;
use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jigsaw_protocol::GameId;
use serde_json::Value;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::{LogRecord, ReplayError};

/// A record as read back: either decoded or the reason it could not be.
///
/// Reads never fail because of one bad line, so a replay can skip it.
pub type StoredRecord = Result<LogRecord, ReplayError>;

/// Append-only record storage, one ordered stream per game.
pub trait ReplayStore: Send + Sync + 'static {
    fn append(
        &self,
        game_id: &GameId,
        record: &LogRecord,
    ) -> impl Future<Output = Result<(), ReplayError>> + Send;

    /// Up to `limit` records starting at `offset`. An unknown game reads
    /// as empty.
    fn read(
        &self,
        game_id: &GameId,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StoredRecord>, ReplayError>> + Send;
}

/// Timestamp of the last record in a game's log, walking the deltas from
/// the header. `None` if the log is empty or has no header.
pub async fn last_timestamp<S: ReplayStore>(
    store: &S,
    game_id: &GameId,
    page_size: usize,
) -> Result<Option<u64>, ReplayError> {
    let page_size = page_size.max(1);
    let mut ts: Option<u64> = None;
    let mut offset = 0;
    loop {
        let page = store.read(game_id, offset, page_size).await?;
        for record in page.iter().flatten() {
            ts = match (record, ts) {
                (LogRecord::Header(h), _) => Some(h.created),
                (other, Some(ts)) => Some(ts + other.dt().unwrap_or(0)),
                (_, None) => None,
            };
        }
        if page.len() < page_size {
            return Ok(ts);
        }
        offset += page.len();
    }
}

fn decode_line(value: Value) -> StoredRecord {
    LogRecord::decode(&value)
}

/// One raw line of a log file. Bad JSON and bad UTF-8 both end up as
/// `MalformedRecord` for that line only.
fn decode_bytes(line: &[u8]) -> StoredRecord {
    serde_json::from_slice::<Value>(line)
        .map_err(|e| ReplayError::MalformedRecord(e.to_string()))
        .and_then(decode_line)
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// In-process store. Keeps encoded records, so reads decode exactly like
/// the file store does.
#[derive(Debug, Default)]
pub struct MemoryReplayStore {
    logs: Mutex<HashMap<GameId, Vec<Value>>>,
}

impl MemoryReplayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an arbitrary value, decodable or not.
    pub async fn append_raw(&self, game_id: &GameId, value: Value) {
        self.logs.lock().await.entry(game_id.clone()).or_default().push(value);
    }

    pub async fn len(&self, game_id: &GameId) -> usize {
        self.logs.lock().await.get(game_id).map_or(0, Vec::len)
    }
}

impl ReplayStore for MemoryReplayStore {
    async fn append(&self, game_id: &GameId, record: &LogRecord) -> Result<(), ReplayError> {
        self.append_raw(game_id, record.encode()).await;
        Ok(())
    }

    async fn read(&self, game_id: &GameId, offset: usize, limit: usize) -> Result<Vec<StoredRecord>, ReplayError> {
        let logs = self.logs.lock().await;
        let records = logs
            .get(game_id)
            .map(|log| log.iter().skip(offset).take(limit).cloned().map(decode_line).collect())
            .unwrap_or_default();
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// One JSON-lines file per game, `<dir>/<game id>.log`.
///
/// Files are only ever appended to. The store remembers where the last
/// read of each file stopped, so paging forward through a long log seeks
/// instead of rescanning from the top.
#[derive(Debug, Clone)]
pub struct FileReplayStore {
    dir: PathBuf,
    cursors: Arc<Mutex<HashMap<GameId, ReadCursor>>>,
}

/// Start of the record numbered `line` (blank lines not counted).
#[derive(Debug, Clone, Copy, Default)]
struct ReadCursor {
    line: usize,
    byte: u64,
}

impl FileReplayStore {
    /// Creates the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            cursors: Arc::default(),
        })
    }

    fn path(&self, game_id: &GameId) -> Result<PathBuf, ReplayError> {
        if !game_id.is_valid() {
            return Err(ReplayError::InvalidGameId(game_id.clone()));
        }
        Ok(self.dir.join(format!("{game_id}.log")))
    }
}

impl ReplayStore for FileReplayStore {
    async fn append(&self, game_id: &GameId, record: &LogRecord) -> Result<(), ReplayError> {
        let path = self.path(game_id)?;
        let mut line = record.encode().to_string();
        line.push('\n');
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, game_id: &GameId, offset: usize, limit: usize) -> Result<Vec<StoredRecord>, ReplayError> {
        let path = self.path(game_id)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let start = self
            .cursors
            .lock()
            .await
            .get(game_id)
            .copied()
            .filter(|cursor| cursor.line <= offset)
            .unwrap_or_default();
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(start.byte)).await?;

        // `cursor` only moves past complete lines; an unterminated tail may
        // still be mid-append.
        let mut cursor = start;
        let mut records = Vec::new();
        let mut buf = Vec::new();
        while records.len() < limit {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                break;
            }
            let complete = buf.ends_with(b"\n");
            let line = buf.trim_ascii();
            if !complete {
                if !line.is_empty() && cursor.line >= offset {
                    records.push(decode_bytes(line));
                }
                break;
            }
            if !line.is_empty() {
                if cursor.line >= offset {
                    records.push(decode_bytes(line));
                }
                cursor.line += 1;
            }
            cursor.byte += n as u64;
        }

        self.cursors.lock().await.insert(game_id.clone(), cursor);
        Ok(records)
    }
}
