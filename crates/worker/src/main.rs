use signbank_core::config::StorageConfig;
use signbank_core::ffmpeg::FfmpegExtractor;
use signbank_core::storage::MediaStorage;
use signbank_db::{PgGlossVideoStore, PgVideoStore};
use signbank_worker::{PosterSweep, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signbank_worker=debug,signbank_core=debug,signbank_db=info".into());
    let fmt_layer = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    let storage_config = StorageConfig::from_env()?;
    let worker_config = WorkerConfig::from_env()?;

    let pool = signbank_db::create_pool(&worker_config.database_url).await?;
    signbank_db::health_check(&pool).await?;
    signbank_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let sweep = PosterSweep::new(
        MediaStorage::new(&storage_config),
        FfmpegExtractor::from_config(&storage_config),
        worker_config.sweep_concurrency,
    );
    let gloss_videos = PgGlossVideoStore::new(pool.clone());
    let videos = PgVideoStore::new(pool.clone());

    tracing::info!(
        storage_root = %storage_config.storage_root.display(),
        interval_secs = worker_config.sweep_interval.as_secs(),
        concurrency = worker_config.sweep_concurrency,
        "Worker starting"
    );

    let mut ticker = tokio::time::interval(worker_config.sweep_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep.run_once(&gloss_videos, &videos).await {
                    tracing::error!(error = %e, "Poster sweep aborted");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    pool.close().await;
    Ok(())
}
