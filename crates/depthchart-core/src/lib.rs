// Library root for the roster model, local persistence, and the
// reconciliation engine that merges fresh league data with saved edits.

pub mod book;
pub mod ledger;
pub mod model;
pub mod mutator;
pub mod reconcile;
pub mod snapshot;
pub mod source;
pub mod store;
