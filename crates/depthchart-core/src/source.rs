// Seam for roster providers (league platform API, CSV import).

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Team;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("request to {url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("user `{0}` not found on the league platform")]
    UnknownUser(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Something that can produce the user's teams. The result is authoritative
/// for team and roster membership; orders it carries are a starting point
/// that reconciliation may override.
#[async_trait]
pub trait TeamSource: Send + Sync {
    /// Short label used in logs (e.g. "sleeper", "csv").
    fn name(&self) -> &str;

    async fn fetch_teams(&self) -> Result<Vec<Team>, SourceError>;
}
