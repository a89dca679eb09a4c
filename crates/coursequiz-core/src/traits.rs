//! Trait definitions for the host side of the engine boundary.
//!
//! The engine itself never persists anything. Hosts receive the completion
//! payload and hand it to a `ProgressStore`; implementations live in the
//! `store` module.

use async_trait::async_trait;
use uuid::Uuid;

use crate::report::CompletionPayload;

/// Durable storage for completion payloads.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Human-readable store name (e.g. "json-dir").
    fn name(&self) -> &str;

    /// Persist a completion payload.
    async fn save(&self, payload: &CompletionPayload) -> anyhow::Result<()>;

    /// Look up a previously saved payload by session id.
    async fn load(&self, session_id: Uuid) -> anyhow::Result<Option<CompletionPayload>>;
}
