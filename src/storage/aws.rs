use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use chrono::DateTime;

use super::{CredentialService, ObjectStore, TemporaryCredentials};
use crate::config::Config;
use crate::error::{AppError, Result};

/// Load the shared AWS configuration (default credential chain) for `region`
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// STS-backed credential service assuming the configured upload role
pub struct StsCredentialService {
    client: aws_sdk_sts::Client,
    role_arn: String,
    role_session_name: String,
}

impl StsCredentialService {
    pub fn new(sdk_config: &SdkConfig, config: &Config) -> Self {
        let mut builder = aws_sdk_sts::config::Builder::from(sdk_config);

        // Custom endpoint for regional or compatible identity services
        if let Some(ref endpoint_url) = config.sts_endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        tracing::info!(role_arn = %config.sts_role_arn, "STS credential service initialized");

        Self {
            client: aws_sdk_sts::Client::from_conf(builder.build()),
            role_arn: config.sts_role_arn.clone(),
            role_session_name: config.sts_role_session_name.clone(),
        }
    }
}

#[async_trait]
impl CredentialService for StsCredentialService {
    async fn assume_role(&self, policy: &str, duration_secs: i32) -> Result<TemporaryCredentials> {
        let output = self
            .client
            .assume_role()
            .role_arn(&self.role_arn)
            .role_session_name(&self.role_session_name)
            .policy(policy)
            .duration_seconds(duration_secs)
            .send()
            .await
            .map_err(|e| {
                AppError::CredentialService(
                    aws_sdk_sts::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        let credentials = output.credentials().ok_or_else(|| {
            AppError::CredentialService("AssumeRole returned no credentials".to_string())
        })?;

        let expiration = DateTime::from_timestamp(credentials.expiration().secs(), 0)
            .ok_or_else(|| {
                AppError::CredentialService("AssumeRole returned an invalid expiration".to_string())
            })?;

        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            access_key_secret: credentials.secret_access_key().to_string(),
            security_token: credentials.session_token().to_string(),
            expiration,
        })
    }
}

/// S3 bucket holding feedback attachments
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, config: &Config) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.s3_endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.s3_force_path_style {
            builder = builder.force_path_style(true);
        }

        tracing::info!(
            bucket = %config.s3_bucket,
            region = %config.s3_region,
            "S3 object store initialized"
        );

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::ObjectStore(format!(
                    "failed to delete {}: {}",
                    key,
                    aws_sdk_s3::error::DisplayErrorContext(&e)
                ))
            })?;

        tracing::debug!(key = %key, "Object deleted");
        Ok(())
    }
}
