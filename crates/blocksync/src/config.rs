//! Client and server configuration.
//!
//! Both structs deserialize from JSON. Missing fields take their defaults,
//! and the command line may override any field after loading.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BlocksyncError, Result};

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default server address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8081";

/// Configuration for one synced directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The directory to keep in sync.
    pub base_dir: PathBuf,
    /// Chunk size. Every client of one server should use the same value.
    pub block_size: usize,
    /// Address of the server.
    pub server_addr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            block_size: DEFAULT_BLOCK_SIZE,
            server_addr: DEFAULT_ADDR.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BlocksyncError::InvalidConfig(
                "block_size must be greater than zero".into(),
            ));
        }
        if self.server_addr.is_empty() {
            return Err(BlocksyncError::InvalidConfig(
                "server_addr must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: String,
    /// SQLite database path. The server keeps everything in memory if unset.
    pub database: Option<PathBuf>,
    /// Largest block the server stores.
    pub max_block_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            database: None,
            max_block_size: blocksync_sync::limits::DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_block_size == 0 {
            return Err(BlocksyncError::InvalidConfig(
                "max_block_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| BlocksyncError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| BlocksyncError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{ "block_size": 4 }"#).unwrap();

        let config = ClientConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.block_size, 4);
        assert_eq!(config.server_addr, DEFAULT_ADDR);
    }

    #[test]
    fn test_zero_block_size_is_invalid() {
        let config = ClientConfig {
            block_size: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BlocksyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_server_config_database() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{ "listen_addr": "0.0.0.0:9000", "database": "/var/lib/blocksync.db" }"#,
        )
        .unwrap();

        let config = ServerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert_eq!(
            config.database.as_deref(),
            Some(Path::new("/var/lib/blocksync.db"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_json_reports_path() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();

        let err = ServerConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, BlocksyncError::ConfigParse { .. }));
    }
}
