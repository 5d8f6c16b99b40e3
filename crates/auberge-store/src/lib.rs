//! # auberge-store
//!
//! Client-side cache of the hotel catalog (rooms, services, gallery).
//!
//! [`CatalogStore`] serves snapshots without waiting on the network and keeps
//! them coherent with the persistence service: revalidations are sequenced so
//! that late responses never overwrite newer state, and mutations are applied
//! optimistically and rolled back exactly when the server rejects them.
//! [`InvalidationTriggers`] refreshes mounted collections on a timer and when
//! the page becomes visible again.

pub mod api;
pub mod events;
pub mod models;
pub mod reorder;
pub mod store;
pub mod triggers;

mod error;

pub use api::CatalogApi;
pub use error::{Result, StoreError};
pub use events::{StoreEvent, StoreEventKind};
pub use models::*;
pub use store::CatalogStore;
pub use triggers::{InvalidationTriggers, TriggerConfig, TriggerHandle, Visibility};
