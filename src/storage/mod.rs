//! Object storage and temporary upload credentials.
//!
//! Clients upload attachment bytes straight to the bucket with short-lived,
//! path-scoped credentials; the server only records storage paths and removes
//! objects again when feedback is deleted.

pub mod aws;
pub mod credentials;
pub mod objects;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub use aws::{load_sdk_config, S3ObjectStore, StsCredentialService};
pub use credentials::{CredentialIssuer, UploadCredentials, UploadTarget};
pub use objects::delete_objects;

/// Temporary credential triple issued by the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub expiration: DateTime<Utc>,
}

/// Identity service that exchanges a scoped policy for temporary credentials
#[async_trait]
pub trait CredentialService: Send + Sync {
    /// Assume the upload role restricted by `policy` for `duration_secs`
    async fn assume_role(&self, policy: &str, duration_secs: i32) -> Result<TemporaryCredentials>;
}

/// Bucket holding uploaded attachments
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn delete_object(&self, key: &str) -> Result<()>;
}
