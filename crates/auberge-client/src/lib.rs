//! # auberge-client
//!
//! Wiring of the media pipeline and catalog cache to the hotel site's HTTP
//! collaborators: configuration, the upload coordinator, HTTP
//! implementations of the storage and persistence APIs, and tracing setup.

pub mod config;
pub mod error;
pub mod http;
pub mod state;
pub mod upload;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, Result, ValidationError};
pub use http::{HttpCatalogApi, HttpStorage};
pub use state::AppState;
pub use upload::{StorageBackend, UploadCoordinator, UploadOptions, UploadReceipt, UploadRequest};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("auberge_client=debug,auberge_store=info,auberge_media=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    if installed.is_ok() {
        tracing::info!("Tracing initialised");
    }
}
