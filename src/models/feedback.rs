use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Feedback record to be inserted; validated by the handler beforehand
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub bug_description: String,
    pub impacted_module: String,
    pub occurring_frequency: i32,
    pub reproduce_steps: String,
    pub user_info: Option<String>,
    pub process_info: Option<String>,
    pub email: Option<String>,
    pub app_version: Option<String>,
}

/// Attached file to be inserted alongside its feedback record
#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_name: String,
    /// Storage path issued by the credential issuer, not a public URL
    pub file_path: String,
    pub file_size: i64,
}

/// Row of the `feedback` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedbackRow {
    pub feedback_id: i64,
    pub bug_description: String,
    pub impacted_module: String,
    pub occurring_frequency: i32,
    pub reproduce_steps: String,
    pub user_info: Option<String>,
    pub process_info: Option<String>,
    pub email: Option<String>,
    pub app_version: Option<String>,
    pub time_stamp: DateTime<Utc>,
}

/// Row of the `file` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRow {
    pub feedback_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
}

/// Attached file as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// Fully-qualified public URL
    #[serde(rename = "filePathOnOss")]
    pub file_path_on_oss: String,
    #[serde(rename = "fileSize")]
    pub file_size: i64,
}

/// Feedback record with its files nested, as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackView {
    #[serde(rename = "feedbackID")]
    pub feedback_id: i64,
    #[serde(rename = "impactedModule")]
    pub impacted_module: String,
    #[serde(rename = "occurringFrequency")]
    pub occurring_frequency: i32,
    #[serde(rename = "bugDescription")]
    pub bug_description: String,
    #[serde(rename = "reproduceSteps")]
    pub reproduce_steps: String,
    #[serde(rename = "userInfo")]
    pub user_info: Option<String>,
    #[serde(rename = "processInfo")]
    pub process_info: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "appVersion")]
    pub app_version: Option<String>,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(rename = "timeStamp")]
    pub time_stamp: i64,
    pub files: Vec<FileView>,
}

/// One page of feedback
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPage {
    #[serde(rename = "totalSize")]
    pub total_size: i64,
    #[serde(rename = "currentPageIndex")]
    pub current_page_index: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    #[serde(rename = "pageData")]
    pub page_data: Vec<FeedbackView>,
}

/// Raw storage paths belonging to one feedback record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFiles {
    pub feedback_id: i64,
    pub paths: Vec<String>,
}

/// Join a storage path onto the public base URL of the bucket
pub fn public_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Nest file rows under their parent records.
///
/// Parents keep their given order; files are appended in row order. Parents
/// without files get an empty list. Files whose parent is not in `parents` are
/// ignored.
pub fn attach_files(
    parents: Vec<FeedbackRow>,
    files: Vec<FileRow>,
    base_url: &str,
) -> Vec<FeedbackView> {
    let mut views: Vec<FeedbackView> = parents
        .into_iter()
        .map(|row| FeedbackView {
            feedback_id: row.feedback_id,
            impacted_module: row.impacted_module,
            occurring_frequency: row.occurring_frequency,
            bug_description: row.bug_description,
            reproduce_steps: row.reproduce_steps,
            user_info: row.user_info,
            process_info: row.process_info,
            email: row.email,
            app_version: row.app_version,
            time_stamp: row.time_stamp.timestamp_millis(),
            files: Vec::new(),
        })
        .collect();

    let positions: HashMap<i64, usize> = views
        .iter()
        .enumerate()
        .map(|(pos, view)| (view.feedback_id, pos))
        .collect();

    for file in files {
        if let Some(&pos) = positions.get(&file.feedback_id) {
            views[pos].files.push(FileView {
                file_path_on_oss: public_url(base_url, &file.file_path),
                file_name: file.file_name,
                file_size: file.file_size,
            });
        }
    }

    views
}
