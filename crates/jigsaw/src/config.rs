//! Server configuration.

use std::path::PathBuf;

use jigsaw_puzzle::PuzzleLimits;
use jigsaw_room::RoomConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to start a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Where games (`<id>.json`) and logs (`<id>.log`) are kept.
    pub data_dir: PathBuf,

    pub room: RoomConfig,

    pub limits: PuzzleLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("data"),
            room: RoomConfig::default(),
            limits: PuzzleLimits::default(),
        }
    }
}

impl ServerConfig {
    pub fn games_dir(&self) -> PathBuf {
        self.data_dir.join("games")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.games_dir(), PathBuf::from("data/games"));
        assert_eq!(config.logs_dir(), PathBuf::from("data/logs"));
        assert_eq!(config.limits, PuzzleLimits::default());
    }

    #[test]
    fn test_server_config_survives_json() {
        let config = ServerConfig {
            bind_addr: "0.0.0.0:9000".into(),
            data_dir: PathBuf::from("/srv/jigsaw"),
            ..ServerConfig::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bind_addr, "0.0.0.0:9000");
        assert_eq!(back.games_dir(), PathBuf::from("/srv/jigsaw/games"));
        assert_eq!(back.room.save_interval, config.room.save_interval);
    }
}
