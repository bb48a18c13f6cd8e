//! Feedback Server Library
//!
//! Bug reports with attachments: records live in PostgreSQL, attachment bytes
//! in S3, uploaded by clients with temporary path-scoped credentials.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod storage;

pub use config::Config;
pub use db::FeedbackStore;
pub use error::{AppError, Result};

use std::sync::Arc;

use storage::{CredentialIssuer, ObjectStore};

/// Application state shared across all handlers
///
/// Built once at startup; every client inside is safe for concurrent use.
#[derive(Clone)]
pub struct AppState {
    pub store: FeedbackStore,
    pub issuer: CredentialIssuer,
    pub objects: Arc<dyn ObjectStore>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState from already constructed services
    pub fn new(
        store: FeedbackStore,
        issuer: CredentialIssuer,
        objects: Arc<dyn ObjectStore>,
        config: Config,
    ) -> Self {
        Self {
            store,
            issuer,
            objects,
            config,
        }
    }
}
