// src/store.rs
//! Baseline persistence. Reads never fail (missing or corrupt ⇒ empty baseline);
//! write errors are returned so the caller can log and move on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::tracker::Baseline;

#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn load(&self) -> Baseline;
    async fn save(&self, baseline: &Baseline) -> Result<()>;
}

/// Pretty-printed JSON document: `{"direct": {"20250101": 820}, "connecting": {...}}`.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BaselineStore for JsonFileStore {
    async fn load(&self) -> Baseline {
        let s = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no price history yet");
                return Baseline::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "read price history");
                return Baseline::default();
            }
        };
        serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "price history corrupt, starting empty");
            Baseline::default()
        })
    }

    async fn save(&self, baseline: &Baseline) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(baseline).context("encode price history")?;
        // Readers only ever see a complete document.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store; nothing touches disk.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<Baseline>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_baseline(b: Baseline) -> Self {
        Self {
            inner: Mutex::new(Some(b)),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> Option<Baseline> {
        self.inner.lock().ok().and_then(|g| g.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|g| *g).unwrap_or(0)
    }
}

#[async_trait]
impl BaselineStore for MemoryStore {
    async fn load(&self) -> Baseline {
        self.snapshot().unwrap_or_default()
    }

    async fn save(&self, baseline: &Baseline) -> Result<()> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *g = Some(baseline.clone());
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}
