//! ShareMirror Daemon - Background mirroring service
//!
//! Runs three independent loops until SIGTERM/SIGINT:
//! - the global tick over every active task without its own interval
//! - the override sweep over tasks whose own interval elapsed
//! - the optional recycle-bin purge for every active account
//!
//! The loops share one `TaskScheduler`; its per-task guard keeps a task
//! that is already running in one loop from being started by another.

mod notifier;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Utc;
use sharemirror_cache::{pool::DatabasePool, SqliteTaskRepository};
use sharemirror_cloud::provider::share_client_for;
use sharemirror_core::{
    config::{Config, LoggingConfig},
    domain::Account,
    ports::ITaskRepository,
};
use sharemirror_sync::{registry::ClientFactory, scheduler::TaskScheduler};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configuration file location
const CONFIG_ENV: &str = "SHAREMIRROR_CONFIG";

// ============================================================================
// DaemonService
// ============================================================================

struct DaemonService {
    config: Config,
    scheduler: TaskScheduler,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the database and wires the scheduler
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::new(Path::new(&config.storage.database))
            .await
            .context("Failed to open database")?;
        let repository: Arc<dyn ITaskRepository> =
            Arc::new(SqliteTaskRepository::new(db_pool.pool().clone()));

        let provider_config = config.provider.clone();
        let factory: ClientFactory =
            Arc::new(move |account: &Account| share_client_for(&provider_config, account));

        let notifier = notifier::from_config(&config.notifications)?;
        let scheduler =
            TaskScheduler::from_config(&config, repository, factory).with_notifier(notifier);

        Ok(Self {
            config,
            scheduler,
            shutdown,
        })
    }

    /// Runs every loop until shutdown
    async fn run(&self) -> Result<()> {
        info!(
            interval_secs = self.config.scheduler.interval_secs,
            override_sweep_secs = self.config.scheduler.override_sweep_secs,
            clear_recycle_interval_secs = ?self.config.scheduler.clear_recycle_interval_secs,
            "Starting scheduler loops"
        );

        tokio::join!(
            self.global_loop(),
            self.override_loop(),
            self.recycle_loop()
        );

        info!("Scheduler loops terminated");
        Ok(())
    }

    async fn global_loop(&self) {
        let mut ticker = interval(period(self.config.scheduler.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => break,
            }

            match self.scheduler.run_global_tick().await {
                Ok(report) => info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Global tick completed"
                ),
                Err(e) => error!(error = %e, "Global tick failed"),
            }
        }
    }

    async fn override_loop(&self) {
        let mut ticker = interval(period(self.config.scheduler.override_sweep_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => break,
            }

            match self.scheduler.run_override_sweep(Utc::now()).await {
                Ok(report) if report.processed + report.failed > 0 => info!(
                    processed = report.processed,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Override sweep completed"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Override sweep failed"),
            }
        }
    }

    async fn recycle_loop(&self) {
        let Some(secs) = self.config.scheduler.clear_recycle_interval_secs else {
            return;
        };
        let mut ticker = interval(period(secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; purge only after a full period.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.cancelled() => break,
            }

            match self.scheduler.clear_recycle().await {
                Ok(lines) => {
                    for line in lines {
                        info!("{}", line);
                    }
                }
                Err(e) => error!(error = %e, "Recycle purge failed"),
            }
        }
    }
}

/// Interval period; zero is bumped to one second so `interval` never panics
fn period(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

// ============================================================================
// Startup helpers
// ============================================================================

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path)
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

/// Waits for SIGTERM or SIGINT and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = if path.exists() {
        Config::load(&path)?
    } else {
        Config::default()
    };

    init_tracing(&config.logging);
    info!(config_path = %path.display(), "ShareMirror daemon starting (sharemirrord)");

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!(%problem, "Invalid configuration");
        }
        anyhow::bail!("Configuration has {} error(s)", problems.len());
    }

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("ShareMirror daemon shut down gracefully"),
        Err(e) => error!(error = %e, "ShareMirror daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
