//! Background reconciliation sweep.
//!
//! Uploads are two-phase, so a crash between the pending insert and the blob
//! confirmation leaves a `pending` row with no readable blob. The sweep runs
//! hourly, deletes pending rows older than the configured age, and removes
//! any blob the partial upload may have left behind.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use smcm_storage::BlobStore;

/// Builds and starts the background job scheduler with the pending-media
/// sweep registered.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    blobs: BlobStore,
    config: Arc<smcm_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let pool = Arc::new(pool);
    let blobs = Arc::new(blobs);
    let max_age_secs = config.media_pending_max_age_secs;

    // Top of every hour.
    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let blobs = Arc::clone(&blobs);

        Box::pin(async move {
            tracing::info!("sweeper: starting pending-media sweep");
            run_pending_sweep(&pool, &blobs, max_age_secs).await;
            tracing::info!("sweeper: pending-media sweep complete");
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Delete pending media rows older than `max_age_secs`, blobs first where one
/// exists. Failures are logged and skipped; the next sweep retries.
pub(crate) async fn run_pending_sweep(pool: &PgPool, blobs: &BlobStore, max_age_secs: u64) {
    let cutoff = Utc::now() - Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));

    let stale = match smcm_db::list_stale_pending_media(pool, cutoff).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "sweeper: failed to list stale pending media");
            return;
        }
    };

    if stale.is_empty() {
        tracing::debug!("sweeper: no stale pending media");
        return;
    }

    let mut removed = 0_usize;
    for row in &stale {
        if let Some(key) = row.blob_key.as_deref() {
            if let Err(e) = blobs.delete(key).await {
                tracing::warn!(error = %e, media_id = %row.id, "sweeper: blob delete failed");
            }
        }
        match smcm_db::delete_media(pool, row.id).await {
            Ok(_) => removed += 1,
            // Already gone; a concurrent confirm or delete won the race.
            Err(smcm_db::DbError::NotFound) => {}
            Err(e) => {
                tracing::error!(error = %e, media_id = %row.id, "sweeper: row delete failed");
            }
        }
    }

    tracing::info!(
        candidates = stale.len(),
        removed,
        "sweeper: cleaned up stale pending media"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use smcm_storage::UrlSigner;

    fn test_blobs(dir: &tempfile::TempDir) -> BlobStore {
        BlobStore::new(
            dir.path(),
            "http://localhost:3000",
            UrlSigner::new("test-signing-secret"),
            3600,
        )
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sweep_removes_only_stale_pending_rows(pool: PgPool) {
        let brand = smcm_db::create_brand(&pool, "u1", "Acme", None, &serde_json::json!({}))
            .await
            .expect("seed brand");

        let stale = smcm_db::create_pending_media(
            &pool,
            brand.id,
            "image",
            "u1/b/stale.png",
            None,
            None,
            None,
            &serde_json::json!([]),
        )
        .await
        .expect("seed stale");
        sqlx::query("UPDATE media SET created_at = NOW() - INTERVAL '3 hours' WHERE id = $1")
            .bind(stale.id)
            .execute(&pool)
            .await
            .expect("age the row");

        let fresh = smcm_db::create_pending_media(
            &pool,
            brand.id,
            "image",
            "u1/b/fresh.png",
            None,
            None,
            None,
            &serde_json::json!([]),
        )
        .await
        .expect("seed fresh");

        let ready = smcm_db::create_pending_media(
            &pool,
            brand.id,
            "image",
            "u1/b/ready.png",
            None,
            None,
            None,
            &serde_json::json!([]),
        )
        .await
        .expect("seed ready");
        smcm_db::confirm_media(&pool, ready.id, "http://x/blobs/u1/b/ready.png")
            .await
            .expect("confirm");
        sqlx::query("UPDATE media SET created_at = NOW() - INTERVAL '3 hours' WHERE id = $1")
            .bind(ready.id)
            .execute(&pool)
            .await
            .expect("age the ready row");

        let dir = tempfile::tempdir().expect("tempdir");
        run_pending_sweep(&pool, &test_blobs(&dir), 3600).await;

        assert!(smcm_db::get_media(&pool, stale.id)
            .await
            .expect("query")
            .is_none());
        assert!(smcm_db::get_media(&pool, fresh.id)
            .await
            .expect("query")
            .is_some());
        // Old but confirmed rows are never swept.
        assert!(smcm_db::get_media(&pool, ready.id)
            .await
            .expect("query")
            .is_some());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sweep_deletes_the_orphan_blob(pool: PgPool) {
        let brand = smcm_db::create_brand(&pool, "u1", "Acme", None, &serde_json::json!({}))
            .await
            .expect("seed brand");
        // A partial upload: the key landed on the pending row at insert, the
        // bytes were written, but the confirm never ran.
        let key = format!("u1/{}/orphan.png", brand.id);
        let row = smcm_db::create_pending_media(
            &pool,
            brand.id,
            "image",
            &key,
            None,
            None,
            None,
            &serde_json::json!([]),
        )
        .await
        .expect("seed");
        sqlx::query("UPDATE media SET created_at = NOW() - INTERVAL '3 hours' WHERE id = $1")
            .bind(row.id)
            .execute(&pool)
            .await
            .expect("age the row");

        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = test_blobs(&dir);
        blobs.put(&key, b"orphan-bytes").await.expect("put");

        run_pending_sweep(&pool, &blobs, 3600).await;

        assert!(smcm_db::get_media(&pool, row.id)
            .await
            .expect("query")
            .is_none());
        assert!(matches!(
            blobs.get(&key).await,
            Err(smcm_storage::StorageError::NotFound(_))
        ));
    }
}
