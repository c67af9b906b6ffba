//! Persistence collaborator seam
//!
//! Bodies are returned as raw JSON; shaping them is the job of
//! [`crate::ingest`]. Implementations own transport, retries and auth.

use crate::error::TransportError;
use crate::ingest::ProspectRecord;
use async_trait::async_trait;
use leadflow_model::{ProspectId, UserId};
use leadflow_scope::ListScope;
use serde_json::Value;

/// REST-style persistence API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProspectApi: Send + Sync {
    /// List prospects for `scope` as seen by `actor`
    async fn list_prospects(&self, actor: &UserId, scope: &ListScope)
        -> Result<Value, TransportError>;

    /// Read one prospect
    async fn get_prospect(&self, id: &ProspectId) -> Result<Value, TransportError>;

    /// Create a prospect; the response carries the assigned id
    async fn create_prospect(&self, record: &ProspectRecord) -> Result<Value, TransportError>;

    /// Replace a prospect's stored fields
    async fn update_prospect(
        &self,
        id: &ProspectId,
        record: &ProspectRecord,
    ) -> Result<(), TransportError>;

    /// Delete a prospect
    async fn delete_prospect(&self, id: &ProspectId) -> Result<(), TransportError>;

    /// List events
    async fn list_events(&self) -> Result<Value, TransportError>;

    /// List users
    async fn list_users(&self) -> Result<Value, TransportError>;

    /// List groups
    async fn list_groups(&self) -> Result<Value, TransportError>;
}

/// Pull the assigned id out of a create response
///
/// Accepts `{ "id": .. }`, `{ "prospect": { "id": .. } }` or a bare string.
#[must_use]
pub fn created_id(body: &Value) -> Option<ProspectId> {
    let id = match body {
        Value::String(id) => Some(id.as_str()),
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("prospect").and_then(|p| p.get("id")))
            .and_then(Value::as_str),
        _ => None,
    };
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ProspectId::from)
}
