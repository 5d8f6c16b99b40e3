//! # auberge-shared
//!
//! Types shared by the media, store and client crates: asset
//! classification, catalog entities, the persistence API envelopes and the
//! transport error every collaborator reports.

pub mod constants;
pub mod error;
pub mod models;
pub mod types;
pub mod wire;

pub use error::TransportError;
pub use models::*;
pub use types::*;
pub use wire::ApiResult;
