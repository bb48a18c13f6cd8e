pub mod admin;
pub mod feedback;
pub mod health;
pub mod upload;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub use admin::admin_stats;
pub use feedback::{delete_feedback, list_feedback, submit_feedback};
pub use health::health_check;
pub use upload::issue_upload_credentials;

/// All endpoints, without transport layers (CORS, tracing)
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/feedback",
            post(submit_feedback)
                .get(list_feedback)
                .delete(delete_feedback),
        )
        .route("/api/upload-credentials", post(issue_upload_credentials))
        .route("/admin/stats", get(admin_stats))
}
