use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PAGE_SIZE, ERR_FOREIGN_FILE_PATH, ERR_INVALID_FILE_NAME, ERR_INVALID_FILE_SIZE,
    ERR_MISSING_REQUIRED_FIELDS,
};
use crate::db::RelatedFilesLookup;
use crate::error::{AppError, Result};
use crate::models::{FeedbackPage, NewFeedback, NewFile};
use crate::storage::{delete_objects, CredentialIssuer};
use crate::AppState;

/// Column width of `file.file_name` and `file.file_path`
const MAX_STORED_TEXT_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct SubmittedFile {
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    /// Storage path returned by the upload credential endpoint
    #[serde(rename = "filePathOnOss", default)]
    pub file_path_on_oss: String,
    #[serde(rename = "fileSize", default)]
    pub file_size: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequest {
    #[serde(rename = "impactedModule")]
    pub impacted_module: Option<String>,
    #[serde(rename = "occurringFrequency", default)]
    pub occurring_frequency: i32,
    #[serde(rename = "bugDescription")]
    pub bug_description: Option<String>,
    #[serde(rename = "reproduceSteps")]
    pub reproduce_steps: Option<String>,
    #[serde(rename = "userInfo")]
    pub user_info: Option<String>,
    #[serde(rename = "processInfo")]
    pub process_info: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "appVersion")]
    pub app_version: Option<String>,
    #[serde(default)]
    pub files: Vec<SubmittedFile>,
}

#[derive(Debug, Serialize)]
pub struct SubmitFeedbackResponse {
    pub success: bool,
    #[serde(rename = "feedbackId")]
    pub feedback_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListFeedbackParams {
    #[serde(rename = "pageIndex", default)]
    pub page_index: i64,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct DeleteFeedbackRequest {
    #[serde(rename = "feedbackIds", default)]
    pub feedback_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFeedbackResponse {
    pub success: bool,
    #[serde(rename = "deletedRecords")]
    pub deleted_records: u64,
    #[serde(rename = "deletedObjects")]
    pub deleted_objects: usize,
}

fn required_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SubmitFeedbackRequest {
    /// Check required fields and attached file paths, producing store inputs
    pub fn validate(self, issuer: &CredentialIssuer) -> Result<(NewFeedback, Vec<NewFile>)> {
        let (Some(impacted_module), Some(bug_description), Some(reproduce_steps)) = (
            required_text(self.impacted_module),
            required_text(self.bug_description),
            required_text(self.reproduce_steps),
        ) else {
            return Err(AppError::InvalidInput(
                ERR_MISSING_REQUIRED_FIELDS.to_string(),
            ));
        };

        let files = self
            .files
            .into_iter()
            .map(|file| {
                let file_name = file.file_name.trim().to_string();
                if file_name.is_empty() || file_name.len() > MAX_STORED_TEXT_LEN {
                    return Err(AppError::InvalidInput(ERR_INVALID_FILE_NAME.to_string()));
                }
                if file.file_path_on_oss.len() > MAX_STORED_TEXT_LEN
                    || !issuer.owns_path(&file.file_path_on_oss)
                {
                    tracing::warn!("Rejected foreign file path: {}", file.file_path_on_oss);
                    return Err(AppError::InvalidInput(ERR_FOREIGN_FILE_PATH.to_string()));
                }
                if file.file_size < 0 {
                    return Err(AppError::InvalidInput(ERR_INVALID_FILE_SIZE.to_string()));
                }
                Ok(NewFile {
                    file_name,
                    file_path: file.file_path_on_oss,
                    file_size: file.file_size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let feedback = NewFeedback {
            bug_description,
            impacted_module,
            occurring_frequency: self.occurring_frequency,
            reproduce_steps,
            user_info: optional_text(self.user_info),
            process_info: optional_text(self.process_info),
            email: optional_text(self.email),
            app_version: optional_text(self.app_version),
        };

        Ok((feedback, files))
    }
}

/// Submit a feedback record with the files the client already uploaded
///
/// Required: impactedModule, bugDescription, reproduceSteps. Every file path
/// must have been issued by the upload credential endpoint.
pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitFeedbackRequest>, JsonRejection>,
) -> Result<Json<SubmitFeedbackResponse>> {
    let Json(payload) = payload?;
    let (feedback, files) = payload.validate(&state.issuer)?;

    let feedback_id = state.store.insert_feedback(&feedback, &files).await?;

    Ok(Json(SubmitFeedbackResponse {
        success: true,
        feedback_id,
    }))
}

/// List feedback one page at a time
///
/// GET /api/feedback?pageIndex=0&pageSize=10 (pageIndex=-1 returns everything)
pub async fn list_feedback(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListFeedbackParams>, QueryRejection>,
) -> Result<Json<FeedbackPage>> {
    let Query(params) = params?;

    let page = state
        .store
        .query_feedback(params.page_index, params.page_size)
        .await?;

    Ok(Json(page))
}

/// Delete feedback records together with their stored files
///
/// Objects are removed from the bucket before the rows. Only records whose
/// file lookup succeeded are deleted; a lookup failure is still reported.
pub async fn delete_feedback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<DeleteFeedbackRequest>, JsonRejection>,
) -> Result<Json<DeleteFeedbackResponse>> {
    let Json(payload) = payload?;

    let mut feedback_ids = payload.feedback_ids;
    if feedback_ids.is_empty() {
        return Err(AppError::EmptyInput("feedbackIds"));
    }
    feedback_ids.sort_unstable();
    feedback_ids.dedup();

    let RelatedFilesLookup { entries, failure } =
        state.store.query_related_files(&feedback_ids).await;
    let failure = match failure {
        Some(failure) if entries.is_empty() => return Err(failure),
        other => other,
    };

    let covered: Vec<i64> = entries.iter().map(|e| e.feedback_id).collect();
    let paths: Vec<String> = entries.into_iter().flat_map(|entry| entry.paths).collect();

    if !paths.is_empty() {
        delete_objects(state.objects.as_ref(), &paths).await?;
    }

    let deleted_records = state.store.delete_feedback(&covered).await?;

    if let Some(failure) = failure {
        tracing::warn!(
            "Deleted {} of {} requested feedback records before lookup failed",
            covered.len(),
            feedback_ids.len()
        );
        return Err(failure);
    }

    Ok(Json(DeleteFeedbackResponse {
        success: true,
        deleted_records,
        deleted_objects: paths.len(),
    }))
}
