use crate::classifier::{Bounds, Verdict};
use crate::error::{Result, StoreError};
use crate::learner::LearnedHeaderSet;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Bounds written by `--generate-config`.
pub const DEFAULT_LOWER_BOUND: f64 = -2.0;
pub const DEFAULT_UPPER_BOUND: f64 = 2.0;

/// Persisted settings. Every key is optional on disk; unless both bounds are
/// set, every score classifies as neutral.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    pub custom_mailscanner_headers: LearnedHeaderSet,
    pub hide_icon_score_positive: bool,
    pub hide_icon_score_neutral: bool,
    pub hide_icon_score_negative: bool,
}

impl StoredConfig {
    /// Starting point for a fresh installation.
    pub fn generated() -> Self {
        Self {
            lower_bound: Some(DEFAULT_LOWER_BOUND),
            upper_bound: Some(DEFAULT_UPPER_BOUND),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            bounds: Bounds::from_optional(self.lower_bound, self.upper_bound),
            learned_headers: self.custom_mailscanner_headers.clone(),
            toggles: DisplayToggles {
                hide_positive: self.hide_icon_score_positive,
                hide_neutral: self.hide_icon_score_neutral,
                hide_negative: self.hide_icon_score_negative,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayToggles {
    pub hide_positive: bool,
    pub hide_neutral: bool,
    pub hide_negative: bool,
}

impl DisplayToggles {
    pub fn hides(&self, verdict: Verdict) -> bool {
        match verdict {
            Verdict::Positive => self.hide_positive,
            Verdict::Neutral => self.hide_neutral,
            Verdict::Negative => self.hide_negative,
        }
    }
}

/// Read-only view of the configuration for one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub bounds: Bounds,
    pub learned_headers: LearnedHeaderSet,
    pub toggles: DisplayToggles,
}

impl ConfigSnapshot {
    /// Used when the store cannot be read: everything neutral, nothing learned,
    /// nothing hidden.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Durable home of the thresholds, display toggles and learned headers.
///
/// Implementations serialize their own writes and give `append_learned_header`
/// set semantics, so callers working from a stale snapshot cannot create
/// duplicates.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<StoredConfig>> + Send;

    /// Returns true when the name was not stored before.
    fn append_learned_header(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// TOML file on disk. A missing file reads as an empty configuration.
pub struct TomlFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path() -> &'static str {
        "/etc/spam-scores.toml"
    }

    /// Replaces the whole file.
    pub async fn save(&self, config: &StoredConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(config).await
    }

    async fn read(&self) -> Result<StoredConfig> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No configuration at {}, using empty", self.path.display());
                return Ok(StoredConfig::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(toml::from_str(&content)?)
    }

    async fn write(&self, config: &StoredConfig) -> Result<()> {
        let content = toml::to_string_pretty(config)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

impl ConfigStore for TomlFileStore {
    async fn load(&self) -> Result<StoredConfig> {
        self.read().await
    }

    async fn append_learned_header(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut config = self.read().await?;
        if !config.custom_mailscanner_headers.insert(name) {
            return Ok(false);
        }
        self.write(&config).await?;
        Ok(true)
    }
}

/// Store kept in memory, for embedding and tests.
#[derive(Default)]
pub struct InMemoryStore {
    config: RwLock<StoredConfig>,
}

impl InMemoryStore {
    pub fn new(config: StoredConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub async fn get(&self) -> StoredConfig {
        self.config.read().await.clone()
    }
}

impl ConfigStore for InMemoryStore {
    async fn load(&self) -> Result<StoredConfig> {
        Ok(self.config.read().await.clone())
    }

    async fn append_learned_header(&self, name: &str) -> Result<bool> {
        Ok(self
            .config
            .write()
            .await
            .custom_mailscanner_headers
            .insert(name))
    }
}
