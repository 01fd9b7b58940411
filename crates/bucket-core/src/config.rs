//! Configuration for bucket-core
//!
//! Selects the storage backend, where it keeps its data, and the key the
//! collection is saved under. Loaded from TOML; every field has a default.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{FileBackend, KeyValueBackend, MemoryBackend};
use crate::error::{Result, StoreError};
use crate::item::NewItem;
use crate::persistence::PersistenceAdapter;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "bucket_list_items";

/// Directory name under the platform data/config dirs.
pub const APP_DIR_NAME: &str = "bucket-list";

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Nothing survives the process; useful for trying things out.
    Memory,
    /// One file per key in a data directory.
    #[default]
    File,
    /// A SQLite database (requires the `sqlite` feature).
    Sqlite,
}

/// Backend selection and location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Data directory. Defaults to the platform data dir.
    pub path: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Key the whole collection is stored under
    pub storage_key: String,
    /// Populate a brand-new list with sample goals
    pub seed_demo_items: bool,
    pub backend: BackendConfig,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            seed_demo_items: false,
            backend: BackendConfig::default(),
        }
    }
}

impl BucketConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load and validate a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config = match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                return Err(StoreError::Config(format!(
                    "read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Standard config file location (`<config dir>/bucket-list/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(StoreError::Config("storage_key must not be empty".into()));
        }
        if self.backend.kind == BackendKind::Sqlite && !cfg!(feature = "sqlite") {
            return Err(StoreError::Config(
                "sqlite backend requested but the `sqlite` feature is not enabled".into(),
            ));
        }
        Ok(())
    }

    /// Directory the file and sqlite backends write into.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(path) = &self.backend.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| StoreError::Config("unable to determine data directory".into()))
    }

    /// Build the configured backend.
    pub fn open_backend(&self) -> Result<Arc<dyn KeyValueBackend>> {
        self.validate()?;
        let backend: Arc<dyn KeyValueBackend> = match self.backend.kind {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::open(self.data_dir()?)?),
            #[cfg(feature = "sqlite")]
            BackendKind::Sqlite => {
                let dir = self.data_dir()?;
                fs::create_dir_all(&dir)?;
                Arc::new(crate::backend::SqliteBackend::open(&dir.join("bucket.db"))?)
            }
            #[cfg(not(feature = "sqlite"))]
            BackendKind::Sqlite => {
                return Err(StoreError::Config("sqlite feature is not enabled".into()))
            }
        };
        tracing::debug!("Opened {} backend", backend.name());
        Ok(backend)
    }

    /// Persistence adapter over the configured backend and key.
    pub fn adapter(&self) -> Result<PersistenceAdapter> {
        Ok(PersistenceAdapter::new(
            self.open_backend()?,
            self.storage_key.clone(),
        ))
    }

    /// Seed items for a first run, if enabled.
    pub fn seed(&self) -> Option<Vec<NewItem>> {
        self.seed_demo_items.then(demo_items)
    }
}

/// Sample goals shown on a fresh install.
pub fn demo_items() -> Vec<NewItem> {
    vec![
        NewItem::new("Visit Tokyo", Some("Experience cherry blossoms in spring")),
        NewItem::new("Learn to surf", Some("Take lessons in Hawaii or California")),
        NewItem::new("Write a book", Some("Fiction novel about time travel")),
    ]
}
