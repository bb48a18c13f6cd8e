use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{error::Result, AppError, AppState};

/// Query parameters for admin stats endpoint
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key for authentication
    pub key: String,
}

/// Feedback statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub feedback_count: i64,
    pub file_count: i64,
    pub total_file_bytes: i64,
}

/// Admin stats endpoint
///
/// Returns record counts and total attachment size for monitoring.
/// Requires admin secret key passed as query parameter.
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    params: std::result::Result<Query<AdminQuery>, QueryRejection>,
) -> Result<Json<AdminStatsResponse>> {
    // Admin endpoints are disabled unless a key is configured
    let admin_key = state
        .config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    let Query(params) = params.map_err(|_| AppError::Unauthorized)?;
    if params.key != *admin_key {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }

    let stats = state.store.stats().await?;

    tracing::info!(
        "Admin stats requested: {} feedback records, {} files, {} bytes",
        stats.feedback_count,
        stats.file_count,
        stats.total_file_bytes
    );

    Ok(Json(AdminStatsResponse {
        feedback_count: stats.feedback_count,
        file_count: stats.file_count,
        total_file_bytes: stats.total_file_bytes,
    }))
}
