mod api;
mod middleware;
mod sweeper;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use smcm_storage::{BlobStore, UrlSigner};
use smcm_vision::VisionClient;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(smcm_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, "starting content management server");

    let pool_config = smcm_db::PoolConfig::from_app_config(&config);
    let pool = smcm_db::connect_pool(&config.database_url, pool_config).await?;
    smcm_db::run_migrations(&pool).await?;

    let blobs = BlobStore::new(
        config.storage_root.clone(),
        config.public_base_url.clone(),
        UrlSigner::new(&config.storage_signing_secret),
        config.signed_url_ttl_secs,
    );

    let vision = match (&config.vision_endpoint, &config.vision_api_key) {
        (Some(endpoint), Some(api_key)) => Some(Arc::new(VisionClient::new(
            endpoint,
            api_key,
            config.vision_request_timeout_secs,
        )?)),
        _ => {
            tracing::warn!("vision endpoint not configured; /api/v1/analyze is disabled");
            None
        }
    };

    let _scheduler =
        sweeper::build_scheduler(pool.clone(), blobs.clone(), Arc::clone(&config)).await?;

    let app = build_app(AppState { pool, blobs, vision });

    tracing::info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
