use crate::logging;
use anyhow::Context;
use beanstalk_core::{
    config::Config,
    gateway::GatewayClient,
    jitter::{Sleeper, TokioSleeper},
    notify::Notifier,
    AccountOrchestrator, ScheduleDriver,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, debug: bool, once: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let _log_guard = logging::init(debug || config.debug, &config.log_dir)?;

    for w in config.validate() {
        tracing::warn!("{}", w.message);
    }

    let periodic = config.cron.enabled && !once;
    let config = Arc::new(config);
    let client = GatewayClient::new(&config.gateway).context("failed to build gateway client")?;
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let orchestrator = AccountOrchestrator::new(config.clone(), Arc::new(client), sleeper.clone());
    let notifier = Arc::new(Notifier::from_config(&config.push));
    if notifier.is_empty() {
        tracing::info!("no push service configured; results are printed only");
    }
    let driver = ScheduleDriver::new(orchestrator, notifier, sleeper, config.cron.clone());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let finished = run_once(&driver).await;
        if finished && periodic {
            run_periodic(driver).await?;
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Returns false when interrupted before the run finished.
async fn run_once(driver: &ScheduleDriver) -> bool {
    tokio::select! {
        session = driver.run_once() => {
            println!("{}", session.message());
            true
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted; run abandoned");
            false
        }
    }
}

/// Runs until interrupted. An interrupt during a run takes effect once that
/// run has finished and its message has been sent.
async fn run_periodic(driver: ScheduleDriver) -> anyhow::Result<()> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; stopping");
            let _ = tx.send(true);
        }
    });

    let runs = driver
        .run_periodic(rx)
        .await
        .context("scheduler failed")?;
    tracing::info!(runs, "periodic mode finished");
    Ok(())
}
