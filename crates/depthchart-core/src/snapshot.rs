// Snapshot store: the last full application state, rewritten after every
// change and used as a secondary reconciliation input on refresh.

use tracing::warn;

use crate::model::AppState;
use crate::store::{SharedStore, StoreError, SNAPSHOT_KEY};

#[derive(Clone)]
pub struct SnapshotStore {
    store: SharedStore,
}

impl SnapshotStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load the saved state. Missing, unreadable and corrupt blobs all read
    /// as `None`.
    pub fn load(&self) -> Option<AppState> {
        let raw = match self.store.get(SNAPSHOT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("failed to read snapshot, ignoring it: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("snapshot is corrupt, ignoring it: {}", e);
                None
            }
        }
    }

    pub fn save(&self, state: &AppState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state).map_err(|source| StoreError::Encode {
            key: SNAPSHOT_KEY.to_string(),
            source,
        })?;
        self.store.set(SNAPSHOT_KEY, &json)
    }

    /// Drop the saved state. The edit ledger lives under its own key and is
    /// not affected.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(SNAPSHOT_KEY)
    }
}
