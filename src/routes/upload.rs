use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

use crate::error::Result;
use crate::storage::UploadCredentials;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadCredentialsRequest {
    /// File names (or client-side paths) the user wants to attach
    #[serde(default)]
    pub files: Vec<String>,
}

/// Issue temporary credentials for uploading attachments
///
/// Returns one storage path per requested file plus credentials that can
/// write only those paths. The client uploads the bytes directly to the
/// bucket and then submits the storage paths with its feedback.
pub async fn issue_upload_credentials(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UploadCredentialsRequest>, JsonRejection>,
) -> Result<Json<UploadCredentials>> {
    let Json(payload) = payload?;

    let credentials = state
        .issuer
        .generate_upload_credentials(&payload.files)
        .await?;

    Ok(Json(credentials))
}
