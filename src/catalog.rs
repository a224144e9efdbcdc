//! The track catalog: durable track records and their backup/presence state.
//!
//! `Catalog` is the single source of truth. It reconciles scan results into
//! `Track` records, records completed backups, and hands readers immutable
//! `Snapshot`s so nobody ever sees a reconcile half-applied.

mod handle;
mod model;
mod snapshot;
mod store;

pub use handle::Catalog;
pub use model::*;
pub use snapshot::Snapshot;

#[cfg(test)]
mod tests;
