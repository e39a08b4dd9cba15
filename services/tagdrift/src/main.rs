//! tagdrift service entry point.
//!
//! # Purpose
//! Loads configuration, wires the tag catalog and webhook notifier into the
//! drift pipeline, then serves CloudEvents and Prometheus metrics until SIGINT
//! or SIGTERM.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tagdrift::app::{AppState, build_router};
use tagdrift::catalog::build_catalog;
use tagdrift::config::TagdriftConfig;
use tagdrift::notify::WebhookNotifier;
use tagdrift::{BUILD_COMMIT, observability};
use tagdrift_core::{DriftPipeline, PipelineConfig};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TagdriftConfig::from_env_or_yaml().context("tagdrift config")?;
    run_with_shutdown(config, shutdown_signal()).await
}

async fn run_with_shutdown<F>(config: TagdriftConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("tagdrift", config.debug);
    tracing::info!(
        commit = BUILD_COMMIT,
        port = config.bind_addr.port(),
        debug = config.debug,
        "starting tagdrift"
    );

    let state = build_state(&config)?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
        wait_for_stop(stop_rx),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        category = %config.category,
        catalog = state.pipeline.catalog_backend(),
        "tagdrift listening"
    );

    let app = build_router(state);
    let result = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        })
        .await;

    match metrics_task.await {
        Ok(Err(err)) => tracing::warn!(error = %err, "metrics listener failed"),
        Err(err) => tracing::warn!(error = %err, "metrics task aborted"),
        Ok(Ok(())) => {}
    }
    result.context("serve tagdrift")?;
    tracing::info!("tagdrift stopped");
    Ok(())
}

fn build_state(config: &TagdriftConfig) -> anyhow::Result<AppState> {
    let catalog = build_catalog(config)?;
    let notifier = Arc::new(WebhookNotifier::new(&config.webhook_url)?);
    let pipeline = DriftPipeline::new(
        PipelineConfig {
            category: config.category.clone(),
        },
        catalog,
        notifier,
    );
    Ok(AppState {
        pipeline: Arc::new(pipeline),
    })
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "could not listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
