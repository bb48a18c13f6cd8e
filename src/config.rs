use std::env;
use std::str::FromStr;

use crate::constants::DEFAULT_UPLOAD_CREDENTIALS_TTL_SECS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub admin_secret_key: Option<String>,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_force_path_style: bool,
    pub s3_public_base_url: String,
    pub feedback_dir: String,
    pub sts_role_arn: String,
    pub sts_role_session_name: String,
    pub sts_endpoint_url: Option<String>,
    pub upload_credentials_ttl_secs: i32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| optional(key).ok_or_else(|| format!("{} must be set", key));

        let server_host = optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(&var, "SERVER_PORT", 8080)?;

        let database_url = required("DATABASE_URL")?;
        let database_max_connections = parse_or(&var, "DATABASE_MAX_CONNECTIONS", 10)?;

        let allowed_origins = optional("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let environment = optional("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let admin_secret_key = optional("ADMIN_SECRET_KEY");

        let s3_bucket = required("S3_BUCKET")?;
        let s3_region = optional("S3_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let s3_endpoint_url = optional("S3_ENDPOINT_URL");
        let s3_force_path_style = parse_or(&var, "S3_FORCE_PATH_STYLE", false)?;
        let s3_public_base_url = optional("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", s3_bucket, s3_region))
            .trim_end_matches('/')
            .to_string();

        let feedback_dir = optional("FEEDBACK_DIR")
            .unwrap_or_else(|| "feedback".to_string())
            .trim_matches('/')
            .to_string();
        if feedback_dir.is_empty() || feedback_dir.split('/').any(|s| s == "..") {
            return Err("Invalid FEEDBACK_DIR".to_string());
        }

        let sts_role_arn = required("STS_ROLE_ARN")?;
        let sts_role_session_name =
            optional("STS_ROLE_SESSION_NAME").unwrap_or_else(|| "feedback-upload".to_string());
        let sts_endpoint_url = optional("STS_ENDPOINT_URL");
        let upload_credentials_ttl_secs = parse_or(
            &var,
            "UPLOAD_CREDENTIALS_TTL_SECS",
            DEFAULT_UPLOAD_CREDENTIALS_TTL_SECS,
        )?;

        Ok(Config {
            server_host,
            server_port,
            database_url,
            database_max_connections,
            allowed_origins,
            environment,
            admin_secret_key,
            s3_bucket,
            s3_region,
            s3_endpoint_url,
            s3_force_path_style,
            s3_public_base_url,
            feedback_dir,
            sts_role_arn,
            sts_role_session_name,
            sts_endpoint_url,
            upload_credentials_ttl_secs,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {}", key)),
        _ => Ok(default),
    }
}
