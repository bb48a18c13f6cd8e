use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use super::CredentialService;
use crate::config::Config;
use crate::constants::{
    ERR_INVALID_FILE_NAME, ERR_TOO_MANY_FILES, MAX_FILES_PER_UPLOAD, MAX_FILE_NAME_LEN,
};
use crate::error::{AppError, Result};

/// Wildcard and policy-variable characters of IAM resource ARNs
const POLICY_SPECIAL_CHARS: [char; 3] = ['*', '?', '$'];

/// Where one client file must be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTarget {
    /// Name as sent by the client
    #[serde(rename = "originalName")]
    pub original_name: String,
    /// Object key the client uploads to and later submits with its feedback
    #[serde(rename = "storagePath")]
    pub storage_path: String,
}

/// Temporary write credentials plus the destination of every file
#[derive(Debug, Clone, Serialize)]
pub struct UploadCredentials {
    pub region: String,
    pub bucket: String,
    pub endpoint: String,
    #[serde(rename = "accessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "accessKeySecret")]
    pub access_key_secret: String,
    #[serde(rename = "securityToken")]
    pub security_token: String,
    /// RFC 3339 expiration of the credentials
    pub expiration: String,
    pub files: Vec<UploadTarget>,
}

/// Issues upload credentials scoped to freshly generated storage paths
#[derive(Clone)]
pub struct CredentialIssuer {
    service: Arc<dyn CredentialService>,
    bucket: String,
    region: String,
    endpoint: String,
    feedback_dir: String,
    ttl_secs: i32,
}

impl CredentialIssuer {
    pub fn new(service: Arc<dyn CredentialService>, config: &Config) -> Self {
        let endpoint = config
            .s3_endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.s3_region));

        Self {
            service,
            bucket: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
            endpoint,
            feedback_dir: config.feedback_dir.clone(),
            ttl_secs: config.upload_credentials_ttl_secs,
        }
    }

    pub fn feedback_dir(&self) -> &str {
        &self.feedback_dir
    }

    /// Whether `path` is a storage path this issuer could have handed out
    pub fn owns_path(&self, path: &str) -> bool {
        let Some(rest) = path
            .strip_prefix(self.feedback_dir.as_str())
            .and_then(|p| p.strip_prefix('/'))
        else {
            return false;
        };

        !path.contains('\\')
            && rest
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
    }

    /// Generate storage paths for `original_paths` and credentials that may
    /// write exactly those paths.
    ///
    /// All files of one call share a single timestamp directory. Fails with
    /// `EmptyInput` before any network call when no paths are given.
    pub async fn generate_upload_credentials(
        &self,
        original_paths: &[String],
    ) -> Result<UploadCredentials> {
        if original_paths.is_empty() {
            return Err(AppError::EmptyInput("files"));
        }

        if original_paths.len() > MAX_FILES_PER_UPLOAD {
            return Err(AppError::InvalidInput(format!(
                "{} (max: {})",
                ERR_TOO_MANY_FILES, MAX_FILES_PER_UPLOAD
            )));
        }

        let timestamp_ms = Utc::now().timestamp_millis();
        let targets = storage_paths(&self.feedback_dir, original_paths, timestamp_ms)?;
        let policy = write_policy(
            &self.bucket,
            targets.iter().map(|t| t.storage_path.as_str()),
        );

        let credentials = self.service.assume_role(&policy, self.ttl_secs).await?;

        tracing::info!(
            "Issued upload credentials for {} files under {}/{}",
            targets.len(),
            self.feedback_dir,
            timestamp_ms
        );

        Ok(UploadCredentials {
            region: self.region.clone(),
            bucket: self.bucket.clone(),
            endpoint: self.endpoint.clone(),
            access_key_id: credentials.access_key_id,
            access_key_secret: credentials.access_key_secret,
            security_token: credentials.security_token,
            expiration: credentials.expiration.to_rfc3339(),
            files: targets,
        })
    }
}

/// Extract the bare file name from an untrusted client path
///
/// Names that would widen the upload policy (`*`, `?`, `${...}`) are rejected.
pub fn base_name(original: &str) -> Result<&str> {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty()
        || name == "."
        || name == ".."
        || name.len() > MAX_FILE_NAME_LEN
        || name.chars().any(char::is_control)
        || name.contains(POLICY_SPECIAL_CHARS)
    {
        return Err(AppError::InvalidInput(ERR_INVALID_FILE_NAME.to_string()));
    }

    Ok(name)
}

/// Build `{dir}/{timestamp_ms}/{name}` for every input.
///
/// A name already used earlier in the batch gets an index suffix before its
/// extension (`a.png`, `a_1.png`, `a_2.png`) so no two targets collide.
pub fn storage_paths(
    feedback_dir: &str,
    original_paths: &[String],
    timestamp_ms: i64,
) -> Result<Vec<UploadTarget>> {
    let mut used: HashSet<String> = HashSet::with_capacity(original_paths.len());
    let mut targets = Vec::with_capacity(original_paths.len());

    for original in original_paths {
        let name = base_name(original)?;

        let mut candidate = name.to_string();
        let mut suffix = 1;
        while used.contains(&candidate) {
            candidate = with_suffix(name, suffix);
            suffix += 1;
        }

        targets.push(UploadTarget {
            original_name: original.clone(),
            storage_path: format!("{}/{}/{}", feedback_dir, timestamp_ms, candidate),
        });
        used.insert(candidate);
    }

    Ok(targets)
}

fn with_suffix(name: &str, suffix: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            format!("{}_{}.{}", stem, suffix, extension)
        }
        _ => format!("{}_{}", name, suffix),
    }
}

/// Session policy allowing only object writes to `paths` in `bucket`
pub fn write_policy<'a>(bucket: &str, paths: impl IntoIterator<Item = &'a str>) -> String {
    let resources: Vec<String> = paths
        .into_iter()
        .map(|path| format!("arn:aws:s3:::{}/{}", bucket, path))
        .collect();

    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": ["s3:PutObject"],
            "Resource": resources,
        }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TemporaryCredentials;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    struct FakeService {
        calls: Mutex<Vec<(String, i32)>>,
        fail: bool,
    }

    impl FakeService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl CredentialService for FakeService {
        async fn assume_role(&self, policy: &str, duration_secs: i32) -> Result<TemporaryCredentials> {
            self.calls
                .lock()
                .unwrap()
                .push((policy.to_string(), duration_secs));
            if self.fail {
                return Err(AppError::CredentialService("access denied".to_string()));
            }
            Ok(TemporaryCredentials {
                access_key_id: "ASIATEST".to_string(),
                access_key_secret: "secret".to_string(),
                security_token: "token".to_string(),
                expiration: DateTime::from_timestamp(1_724_503_600, 0).unwrap(),
            })
        }
    }

    fn test_config() -> Config {
        Config::from_vars(|key| {
            let value = match key {
                "DATABASE_URL" => Some("postgres://localhost/feedback"),
                "S3_BUCKET" => Some("bug-reports"),
                "S3_REGION" => Some("eu-west-1"),
                "STS_ROLE_ARN" => Some("arn:aws:iam::123456789012:role/upload"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("C:\\Users\\me\\crash.log").unwrap(), "crash.log");
        assert_eq!(base_name("/home/me/../../etc/passwd").unwrap(), "passwd");
        assert_eq!(base_name("shot.png").unwrap(), "shot.png");
    }

    #[test]
    fn test_base_name_rejects_unusable_names() {
        assert!(base_name("").is_err());
        assert!(base_name("dir/").is_err());
        assert!(base_name("..").is_err());
        assert!(base_name("a/.").is_err());
        assert!(base_name("bad\nname.txt").is_err());
        assert!(base_name(&"x".repeat(MAX_FILE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_base_name_rejects_policy_wildcards() {
        for name in ["*", "shot*.png", "a?.log", "${aws:username}", "logs/*"] {
            assert!(base_name(name).is_err(), "{} accepted", name);
        }
        assert!(storage_paths("feedback", &names(&["ok.png", "*"]), 7).is_err());
    }

    #[test]
    fn test_storage_paths_share_timestamp() {
        let targets =
            storage_paths("feedback", &names(&["a.png", "logs/app.log"]), 1_724_500_000_123)
                .unwrap();

        assert_eq!(targets[0].storage_path, "feedback/1724500000123/a.png");
        assert_eq!(targets[1].storage_path, "feedback/1724500000123/app.log");
        assert_eq!(targets[1].original_name, "logs/app.log");
    }

    #[test]
    fn test_duplicate_names_do_not_collide() {
        let targets = storage_paths(
            "feedback",
            &names(&["a.png", "x/a.png", "a.png", "a_1.png", "README"]),
            7,
        )
        .unwrap();
        let paths: Vec<&str> = targets.iter().map(|t| t.storage_path.as_str()).collect();

        assert_eq!(
            paths,
            vec![
                "feedback/7/a.png",
                "feedback/7/a_1.png",
                "feedback/7/a_2.png",
                "feedback/7/a_1_1.png",
                "feedback/7/README",
            ]
        );
    }

    #[test]
    fn test_suffix_for_names_without_extension() {
        assert_eq!(with_suffix("README", 1), "README_1");
        assert_eq!(with_suffix(".env", 2), ".env_2");
        assert_eq!(with_suffix("archive.tar.gz", 1), "archive.tar_1.gz");
    }

    #[test]
    fn test_write_policy_scopes_exact_paths() {
        let policy = write_policy("bug-reports", ["feedback/1/a.png", "feedback/1/b.txt"]);
        let value: serde_json::Value = serde_json::from_str(&policy).unwrap();

        let statement = &value["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Action"], json!(["s3:PutObject"]));
        assert_eq!(
            statement["Resource"],
            json!([
                "arn:aws:s3:::bug-reports/feedback/1/a.png",
                "arn:aws:s3:::bug-reports/feedback/1/b.txt"
            ])
        );
    }

    #[test]
    fn test_owns_path() {
        let issuer = CredentialIssuer::new(FakeService::new(false), &test_config());

        assert!(issuer.owns_path("feedback/1724500000123/a.png"));
        assert!(!issuer.owns_path("feedback"));
        assert!(!issuer.owns_path("feedback/"));
        assert!(!issuer.owns_path("feedbackx/1/a.png"));
        assert!(!issuer.owns_path("other/1/a.png"));
        assert!(!issuer.owns_path("feedback/../secrets/key.pem"));
        assert!(!issuer.owns_path("feedback//a.png"));
        assert!(!issuer.owns_path("feedback/1\\a.png"));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let service = FakeService::new(false);
        let issuer = CredentialIssuer::new(service.clone(), &test_config());

        let result = issuer.generate_upload_credentials(&[]).await;

        assert!(matches!(result, Err(AppError::EmptyInput(_))));
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_files_rejected() {
        let service = FakeService::new(false);
        let issuer = CredentialIssuer::new(service.clone(), &test_config());
        let files: Vec<String> = (0..=MAX_FILES_PER_UPLOAD).map(|i| format!("{}.png", i)).collect();

        let result = issuer.generate_upload_credentials(&files).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_issued_for_generated_paths() {
        let service = FakeService::new(false);
        let issuer = CredentialIssuer::new(service.clone(), &test_config());

        let issued = issuer
            .generate_upload_credentials(&names(&["shot.png", "shot.png"]))
            .await
            .unwrap();

        assert_eq!(issued.bucket, "bug-reports");
        assert_eq!(issued.region, "eu-west-1");
        assert_eq!(issued.endpoint, "https://s3.eu-west-1.amazonaws.com");
        assert_eq!(issued.access_key_id, "ASIATEST");
        assert_eq!(issued.expiration, "2024-08-24T12:46:40+00:00");
        assert_eq!(issued.files.len(), 2);
        assert_ne!(issued.files[0].storage_path, issued.files[1].storage_path);
        assert!(issued.files.iter().all(|f| issuer.owns_path(&f.storage_path)));

        // Both files sit in the same timestamp directory
        let dir_of = |p: &str| p.rsplit_once('/').unwrap().0.to_string();
        assert_eq!(
            dir_of(&issued.files[0].storage_path),
            dir_of(&issued.files[1].storage_path)
        );

        let calls = service.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, 3600);
        for target in &issued.files {
            assert!(calls[0].0.contains(&target.storage_path));
        }
    }

    #[tokio::test]
    async fn test_service_failure_surfaces() {
        let issuer = CredentialIssuer::new(FakeService::new(true), &test_config());

        let result = issuer
            .generate_upload_credentials(&names(&["a.png"]))
            .await;

        assert!(matches!(result, Err(AppError::CredentialService(_))));
    }
}
