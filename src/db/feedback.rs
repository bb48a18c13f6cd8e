use sqlx::PgPool;

use crate::error::{AppError, Result};
use crate::models::{
    attach_files, effective_page_size, FeedbackPage, FeedbackRow, FileRow, NewFeedback, NewFile,
    PageWindow, RelatedFiles,
};

const SELECT_ALL_FEEDBACK: &str = "SELECT feedback_id, bug_description, impacted_module, \
     occurring_frequency, reproduce_steps, user_info, process_info, email, app_version, time_stamp \
     FROM feedback ORDER BY feedback_id";

const SELECT_FEEDBACK_PAGE: &str = "SELECT feedback_id, bug_description, impacted_module, \
     occurring_frequency, reproduce_steps, user_info, process_info, email, app_version, time_stamp \
     FROM feedback ORDER BY feedback_id LIMIT $1 OFFSET $2";

const SELECT_FILES_FOR_FEEDBACK: &str = "SELECT feedback_id, file_name, file_path, file_size \
     FROM file WHERE feedback_id = ANY($1) ORDER BY file_id";

/// Row counts reported by the admin endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StoreStats {
    pub feedback_count: i64,
    pub file_count: i64,
    pub total_file_bytes: i64,
}

/// Outcome of a related-file lookup, possibly cut short by an error
#[derive(Debug)]
pub struct RelatedFilesLookup {
    pub entries: Vec<RelatedFiles>,
    pub failure: Option<AppError>,
}

/// Feedback records and their attached files
///
/// Owns the connection pool. Every write runs in exactly one transaction.
#[derive(Clone)]
pub struct FeedbackStore {
    pool: PgPool,
    public_base_url: String,
}

impl FeedbackStore {
    /// `public_base_url` is prefixed onto stored paths when records are read
    pub fn new(pool: PgPool, public_base_url: impl Into<String>) -> Self {
        Self {
            pool,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a feedback record and its files atomically, returning the new id
    pub async fn insert_feedback(&self, feedback: &NewFeedback, files: &[NewFile]) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(AppError::Write)?;

        let feedback_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO feedback (bug_description, impacted_module, occurring_frequency, \
             reproduce_steps, user_info, process_info, email, app_version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING feedback_id",
        )
        .bind(&feedback.bug_description)
        .bind(&feedback.impacted_module)
        .bind(feedback.occurring_frequency)
        .bind(&feedback.reproduce_steps)
        .bind(&feedback.user_info)
        .bind(&feedback.process_info)
        .bind(&feedback.email)
        .bind(&feedback.app_version)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Write)?;

        for file in files {
            sqlx::query(
                "INSERT INTO file (feedback_id, file_name, file_path, file_size) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(feedback_id)
            .bind(&file.file_name)
            .bind(&file.file_path)
            .bind(file.file_size)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Write)?;
        }

        // Dropping the transaction on any early return above rolls it back
        tx.commit().await.map_err(AppError::Write)?;

        tracing::info!(
            "Feedback {} stored with {} attached files",
            feedback_id,
            files.len()
        );

        Ok(feedback_id)
    }

    /// Read one page of feedback with each record's files nested.
    ///
    /// Parents are paged first and files joined afterwards, so a record with
    /// many files never pushes other records off the page.
    pub async fn query_feedback(&self, page_index: i64, page_size: i64) -> Result<FeedbackPage> {
        let mut tx = self.pool.begin().await.map_err(AppError::Read)?;

        // Count and page must observe the same snapshot
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(AppError::Read)?;

        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM feedback")
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Read)?;

        let window = PageWindow::resolve(page_index, page_size, total_count);

        let parents: Vec<FeedbackRow> = match window {
            PageWindow::All => {
                sqlx::query_as::<_, FeedbackRow>(SELECT_ALL_FEEDBACK)
                    .fetch_all(&mut *tx)
                    .await
            }
            PageWindow::Page { limit, offset, .. } => {
                sqlx::query_as::<_, FeedbackRow>(SELECT_FEEDBACK_PAGE)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&mut *tx)
                    .await
            }
        }
        .map_err(AppError::Read)?;

        let files: Vec<FileRow> = if parents.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<i64> = parents.iter().map(|p| p.feedback_id).collect();
            sqlx::query_as::<_, FileRow>(SELECT_FILES_FOR_FEEDBACK)
                .bind(&ids[..])
                .fetch_all(&mut *tx)
                .await
                .map_err(AppError::Read)?
        };

        tx.commit().await.map_err(AppError::Read)?;

        tracing::debug!(
            "Feedback page {} served: {} records, {} files, {} total",
            window.index(),
            parents.len(),
            files.len(),
            total_count
        );

        Ok(FeedbackPage {
            total_size: total_count,
            current_page_index: window.index(),
            page_size: effective_page_size(page_size),
            page_data: attach_files(parents, files, &self.public_base_url),
        })
    }

    /// Collect the raw storage paths of each record's files.
    ///
    /// Entries line up with `feedback_ids`; unknown ids get an empty list. A
    /// failed lookup stops the loop: the entries gathered so far are kept and
    /// the error is reported alongside them.
    pub async fn query_related_files(&self, feedback_ids: &[i64]) -> RelatedFilesLookup {
        let mut entries = Vec::with_capacity(feedback_ids.len());

        for &feedback_id in feedback_ids {
            let paths = sqlx::query_scalar::<_, String>(
                "SELECT file_path FROM file WHERE feedback_id = $1 ORDER BY file_id",
            )
            .bind(feedback_id)
            .fetch_all(&self.pool)
            .await;

            match paths {
                Ok(paths) => entries.push(RelatedFiles { feedback_id, paths }),
                Err(e) => {
                    tracing::error!(
                        "Related file lookup failed for feedback {}: {:?}",
                        feedback_id,
                        e
                    );
                    return RelatedFilesLookup {
                        entries,
                        failure: Some(AppError::Read(e)),
                    };
                }
            }
        }

        RelatedFilesLookup {
            entries,
            failure: None,
        }
    }

    /// Delete feedback records; their file rows go with them via ON DELETE CASCADE
    pub async fn delete_feedback(&self, feedback_ids: &[i64]) -> Result<u64> {
        if feedback_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Write)?;

        let deleted = sqlx::query("DELETE FROM feedback WHERE feedback_id = ANY($1)")
            .bind(feedback_ids)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Write)?
            .rows_affected();

        tx.commit().await.map_err(AppError::Write)?;

        tracing::info!(
            "Deleted {} feedback records ({} requested)",
            deleted,
            feedback_ids.len()
        );

        Ok(deleted)
    }

    /// Record counts for monitoring
    pub async fn stats(&self) -> Result<StoreStats> {
        sqlx::query_as::<_, StoreStats>(
            "SELECT (SELECT COUNT(*) FROM feedback) AS feedback_count, \
             (SELECT COUNT(*) FROM file) AS file_count, \
             (SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM file) AS total_file_bytes",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Read)
    }

    /// Check that a connection can be acquired and used
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::Read)?;
        Ok(())
    }
}
