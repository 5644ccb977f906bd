//! Adapter state file

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use logrelay_core::AdapterKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StorageError};

pub const STATE_FILE: &str = "state.json";

/// Last raw configuration received for each kind, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedState {
    configs: BTreeMap<AdapterKind, String>,
}

impl PersistedState {
    pub fn get(&self, kind: AdapterKind) -> Option<&str> {
        self.configs.get(&kind).map(String::as_str)
    }

    pub fn insert(&mut self, kind: AdapterKind, raw: impl Into<String>) {
        self.configs.insert(kind, raw.into());
    }

    pub fn remove(&mut self, kind: AdapterKind) -> Option<String> {
        self.configs.remove(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Entries in replay order (basic, logstash, rollbar, sse).
    pub fn iter(&self) -> impl Iterator<Item = (AdapterKind, &str)> {
        self.configs.iter().map(|(kind, raw)| (*kind, raw.as_str()))
    }
}

/// JSON file store for [`PersistedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Store backed by `state.json` inside the given directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STATE_FILE))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state. A missing file is an empty state.
    pub async fn load(&self) -> Result<PersistedState> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(PersistedState::default()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Replace the whole state on disk.
    ///
    /// Writes a sibling temp file and renames it over the state file so a
    /// crash never leaves a half-written state behind.
    pub async fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    /// Record the raw configuration for a kind. A corrupt file is replaced.
    pub async fn record(&self, kind: AdapterKind, raw: &str) -> Result<()> {
        let mut state = self.load_or_default().await?;
        state.insert(kind, raw);
        self.save(&state).await
    }

    /// Forget a kind.
    pub async fn forget(&self, kind: AdapterKind) -> Result<()> {
        let mut state = self.load_or_default().await?;
        if state.remove(kind).is_some() {
            self.save(&state).await?;
        }
        Ok(())
    }

    async fn load_or_default(&self) -> Result<PersistedState> {
        match self.load().await {
            Err(StorageError::Corrupt { .. }) => Ok(PersistedState::default()),
            other => other,
        }
    }
}
