//! Where whole games are kept between loads.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use jigsaw_game::Game;
use jigsaw_protocol::GameId;
use tokio::fs;
use tokio::sync::Mutex;

use crate::StorageError;

/// Game persistence.
///
/// The actor saves a clone of its game from a spawned task, so saves may
/// be slow without holding up inputs.
pub trait Storage: Send + Sync + 'static {
    /// `None` for a game that was never saved.
    fn load(&self, game_id: &GameId) -> impl Future<Output = Result<Option<Game>, StorageError>> + Send;

    fn save(&self, game: &Game) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn exists(&self, game_id: &GameId) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
    games: Mutex<HashMap<GameId, Game>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.games.lock().await.len()
    }
}

impl Storage for MemoryStorage {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StorageError> {
        Ok(self.games.lock().await.get(game_id).cloned())
    }

    async fn save(&self, game: &Game) -> Result<(), StorageError> {
        self.games.lock().await.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn exists(&self, game_id: &GameId) -> Result<bool, StorageError> {
        Ok(self.games.lock().await.contains_key(game_id))
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// One JSON document per game, `<dir>/<game id>.json`.
///
/// Writes go to a temporary file that is then renamed over the old one,
/// so a crash mid-save leaves the previous version intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self, game_id: &GameId) -> Result<PathBuf, StorageError> {
        if !game_id.is_valid() {
            return Err(StorageError::InvalidGameId(game_id.clone()));
        }
        Ok(self.dir.join(format!("{game_id}.json")))
    }
}

impl Storage for FileStorage {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StorageError> {
        let path = self.path(game_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, game: &Game) -> Result<(), StorageError> {
        let path = self.path(&game.id)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(game)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        tracing::trace!(game_id = %game.id, path = %path.display(), "game written");
        Ok(())
    }

    async fn exists(&self, game_id: &GameId) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.path(game_id)?).await?)
    }
}
