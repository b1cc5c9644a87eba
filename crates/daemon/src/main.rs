#![forbid(unsafe_code)]

//! jobwatch: polls a Jenkins server and notifies on job state changes.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jobwatch_core::policy::NotificationPolicy;
use jobwatch_core::status::StatusMapper;
use jobwatch_daemon::config::{Args, Config};
use jobwatch_daemon::dispatcher::Dispatcher;
use jobwatch_daemon::history::JsonlHistory;
use jobwatch_daemon::jenkins::JenkinsClient;
use jobwatch_daemon::scheduler::{run_once, Scheduler};
use jobwatch_daemon::sink::{FanoutSink, LogSink, NotificationSink, WebhookSink};
use jobwatch_daemon::store::SnapshotStore;
use jobwatch_daemon::teardown::Teardown;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.resolve().context("load configuration")?;

    let store = Arc::new(SnapshotStore::new());
    let client = JenkinsClient::new(
        &config.base_url,
        config.credentials(),
        config.fetch_timeout(),
        StatusMapper::new(&config.building_suffix),
    );
    let history = Arc::new(JsonlHistory::new(&config.history_path));
    let mut dispatcher = Dispatcher::new(
        Arc::new(client),
        Arc::clone(&store),
        NotificationPolicy::new(config.policy()),
        build_sink(&config),
        history,
    );

    tracing::info!(
        base_url = %config.base_url,
        interval_secs = config.poll_interval_secs,
        history = %config.history_path.display(),
        "jobwatch starting"
    );

    let mut teardown = Teardown::new();
    if let Some(path) = config.snapshot_out.clone() {
        let store = Arc::clone(&store);
        teardown.register("write last snapshot", move || {
            if store.write_current(&path)? {
                tracing::info!(path = %path.display(), "wrote last snapshot");
            }
            Ok(())
        });
    }

    if args.once {
        let report = run_once(&mut dispatcher, teardown).await?;
        tracing::info!(jobs = report.jobs, "single cycle complete");
        return Ok(());
    }

    let mut events = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(batch) => tracing::debug!(
                    transitions = batch.transitions.len(),
                    observed_at_ms = batch.observed_at_ms,
                    "transition batch"
                ),
                Err(RecvError::Lagged(n)) => tracing::warn!(missed = n, "transition observer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let scheduler = Scheduler::new(dispatcher, config.backoff());
    let cancel = scheduler.cancel_handle();
    let status = scheduler.status();

    teardown.register("report scheduler status", move || {
        let s = status.borrow().clone();
        tracing::info!(
            cycles = s.cycles,
            consecutive_failures = s.consecutive_failures,
            skipped_ticks = s.skipped_ticks,
            "final scheduler status"
        );
        Ok(())
    });

    let poll_loop = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await.context("listen for ctrl-c")?;
    tracing::info!("shutdown requested; letting the in-flight cycle finish");
    cancel.cancel();
    poll_loop.await.context("poll loop panicked")?;

    teardown.run();
    Ok(())
}

fn build_sink(config: &Config) -> Arc<dyn NotificationSink> {
    match &config.webhook_url {
        Some(url) => {
            let sinks: Vec<Arc<dyn NotificationSink>> = vec![
                Arc::new(LogSink),
                Arc::new(WebhookSink::new(url.clone(), config.fetch_timeout())),
            ];
            Arc::new(FanoutSink::new(sinks))
        }
        None => Arc::new(LogSink),
    }
}
