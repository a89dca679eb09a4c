//! `ProgressStore` implementations.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::report::CompletionPayload;
use crate::traits::ProgressStore;

/// Writes one JSON file per payload into a directory.
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("completion-{session_id}.json"))
    }
}

#[async_trait]
impl ProgressStore for JsonDirStore {
    fn name(&self) -> &str {
        "json-dir"
    }

    async fn save(&self, payload: &CompletionPayload) -> Result<()> {
        let path = self.path_for(payload.session_id);
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || payload.save_json(&path))
            .await
            .context("payload writer task failed")?
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<CompletionPayload>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        tokio::task::spawn_blocking(move || CompletionPayload::load_json(&path))
            .await
            .context("payload reader task failed")?
            .map(Some)
    }
}

/// In-memory store for tests and embedding hosts.
#[derive(Default)]
pub struct MemoryStore {
    payloads: Mutex<Vec<CompletionPayload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All payloads saved so far, in save order.
    pub fn saved(&self) -> Vec<CompletionPayload> {
        self.payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, payload: &CompletionPayload) -> Result<()> {
        self.payloads
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?
            .push(payload.clone());
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<CompletionPayload>> {
        let payloads = self
            .payloads
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(payloads.iter().find(|p| p.session_id == session_id).cloned())
    }
}
