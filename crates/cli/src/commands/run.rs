//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(interval_ms) = args.interval_ms {
        info!(interval_ms, "Overriding flush interval from CLI");
        config.flush.interval_ms = interval_ms;
        config_loader::ConfigLoader::validate(&config)
            .context("Flush interval override is invalid")?;
    }

    info!(
        service = %config.service_name,
        interval_ms = config.flush.interval_ms,
        timeout_ms = config.flush.timeout().as_millis() as u64,
        metric_sinks = config.metric_sinks.len(),
        span_sinks = config.span_sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        config,
        max_cycles: (args.cycles != 0).then_some(args.cycles),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
        producers: args.producers,
        span_delay: Duration::from_millis(args.span_delay_ms),
        metrics_per_cycle: args.metrics_per_cycle,
    });

    let shutdown = CancellationToken::new();
    let signal = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    warn!("Received shutdown signal, running final flush...");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        }
    });

    info!("Starting flush cycles...");
    let result = pipeline.run(shutdown.clone()).await;
    shutdown.cancel();
    let _ = signal.await;

    let stats = result.context("Pipeline execution failed")?;
    info!(
        cycles = stats.flush.total_cycles,
        spans = stats.spans_ingested,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::FanoutConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Service: {}", config.service_name);
    println!(
        "Flush: every {} ms, timeout {} ms",
        config.flush.interval_ms,
        config.flush.timeout().as_millis()
    );

    for (title, sinks) in [
        ("Metric sinks", &config.metric_sinks),
        ("Span sinks", &config.span_sinks),
    ] {
        println!("\n{} ({}):", title, sinks.len());
        for sink in sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
