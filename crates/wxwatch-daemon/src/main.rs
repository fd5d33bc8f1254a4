//! wxwatch daemon
//!
//! This binary coordinates:
//! - Staggered weather sweeps over the configured locations
//! - Threshold alerts for freshly stored observations
//! - The nightly per-location daily summary
//! - The read-only HTTP API

mod config;
mod pipeline;
mod scheduler;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use wxwatch_archive::{DailyAggregator, SummaryWriteMode};
use wxwatch_config::AppConfig;
use wxwatch_core::{AlertThreshold, Notifier, ObservationStore};
use wxwatch_db::{DbClient, MemoryStore};
use wxwatch_ingest::{OpenWeatherClient, RetryFetcher, RetryPolicy, SimulatedProvider, WeatherProvider};
use wxwatch_notify::{webhook::WebhookNotifier, AlertDispatcher, FsNotifier, LogNotifier};

use crate::config::{DaemonConfig, NotifierKind, ProviderKind};
use crate::pipeline::IngestJob;
use crate::scheduler::{Scheduler, SchedulerSettings};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    wxwatch_obs::init("wxwatchd");
    info!("Starting wxwatch daemon");

    let cfg = AppConfig::load().context("Failed to load configuration")?;
    let env = DaemonConfig::from_env()?;
    info!("Loaded configuration: {:?}", env);

    let (store, db) = open_store(&env).await?;
    let provider = build_provider(&env, &cfg)?;
    let notifier = build_notifier(&env).await?;
    info!(
        provider = provider.name(),
        notifier = notifier.name(),
        "Pipeline components ready"
    );

    let threshold = Arc::new(AlertThreshold::new(cfg.threshold_celsius())?);
    let fetcher = RetryFetcher::new(
        provider,
        RetryPolicy::new(cfg.max_attempts(), Duration::from_millis(cfg.backoff_ms())),
    );
    let dispatcher = AlertDispatcher::new(notifier, cfg.alert_recipient());
    let job = IngestJob::new(fetcher, store.clone(), threshold.clone(), dispatcher);

    let mode: SummaryWriteMode = cfg.summary_mode().parse()?;
    let aggregator = DailyAggregator::new(store.clone(), mode);

    let scheduler = Scheduler::new(
        SchedulerSettings {
            locations: cfg.locations(),
            sweep_interval: Duration::from_secs(cfg.sweep_interval_secs()),
            stagger: Duration::from_millis(cfg.stagger_ms()),
            daily_cron: cfg.daily_summary_cron(),
        },
        job,
        aggregator,
    )?;

    // HTTP API
    let (app, state) = wxwatch_api::build_app(store, threshold, cfg.locations())?;
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP listener")?;

    // Mark ready just before serving
    wxwatch_api::set_ready(&state, true);
    info!(%addr, "HTTP server listening");

    info!("Daemon running - press Ctrl+C to stop");

    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                error!("Scheduler error: {:#}", e);
                return Err(e);
            }
        }
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                return Err(e.into());
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        }
    }

    wxwatch_api::set_ready(&state, false);
    if let Some(db) = db {
        db.close().await;
    }
    info!("wxwatch daemon stopped");
    Ok(())
}

/// The store for the pipeline, plus the MySQL handle to close on shutdown
async fn open_store(env: &DaemonConfig) -> Result<(Arc<dyn ObservationStore>, Option<DbClient>)> {
    let Some(target) = &env.database else {
        warn!(
            "No database configured (DATABASE_URL or DB_HOST/DB_NAME); observations are kept \
             in memory only and the process grows until restart"
        );
        return Ok((Arc::new(MemoryStore::new()), None));
    };

    let db = DbClient::open(target)
        .await
        .context("Failed to open observation database")?;
    Ok((Arc::new(db.clone()), Some(db)))
}

fn build_provider(env: &DaemonConfig, cfg: &AppConfig) -> Result<Arc<dyn WeatherProvider>> {
    match env.provider {
        ProviderKind::OpenWeather => {
            let key = env
                .api_key
                .clone()
                .context("OPENWEATHER_API_KEY environment variable not set")?;
            let client = OpenWeatherClient::new(
                &cfg.provider_base_url(),
                key,
                Duration::from_secs(cfg.provider_timeout_secs()),
            )?;
            Ok(Arc::new(client))
        }
        ProviderKind::Simulator => Ok(Arc::new(SimulatedProvider::new())),
    }
}

async fn build_notifier(env: &DaemonConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match &env.notifier {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Fs(dir) => Arc::new(
            FsNotifier::new(dir)
                .await
                .with_context(|| format!("Failed to prepare alert directory {}", dir.display()))?,
        ),
        NotifierKind::Webhook(url) => Arc::new(WebhookNotifier::new(url.clone(), NOTIFY_TIMEOUT)?),
    };
    Ok(notifier)
}
