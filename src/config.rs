//! Runtime configuration, read from YAML

use crate::mutation::{DEFAULT_COLLECTION, DEFAULT_USERS_NAMESPACE};
use crate::storage::DEFAULT_INDEX_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default data directory (`~/.local/share/formsync` on Linux)
pub fn default_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("formsync")
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_users_namespace() -> String {
    DEFAULT_USERS_NAMESPACE.to_string()
}

fn default_mirror_collaborators() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the two stores live and how records are laid out in them.
///
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Document store database; `<data_dir>/store.db` when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    /// Search index database; `<data_dir>/index.db` when unset
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_users_namespace")]
    pub users_namespace: String,
    #[serde(default = "default_mirror_collaborators")]
    pub mirror_collaborators: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_path: None,
            index_path: None,
            index_name: default_index_name(),
            collection: default_collection(),
            users_namespace: default_users_namespace(),
            mirror_collaborators: default_mirror_collaborators(),
            log_level: default_log_level(),
        }
    }
}

impl FormsConfig {
    /// Read a YAML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("store.db"))
    }

    pub fn index_path(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("index.db"))
    }
}
