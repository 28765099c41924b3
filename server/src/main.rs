// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CodeSync Registry Server
//!
//! Entry point for the `codesync-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the record registry, and serves
//! the HTTP API.
//!
//! - `run`       — serve the API and the metrics endpoint
//! - `challenge` — print a fresh challenge for a wallet to sign
//! - `version`   — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use codesync_core::challenge::ChallengeBuilder;
use codesync_core::{
    AccessController, Address, ChallengePolicy, ContentRecordRegistry, InMemoryRegistry,
    SledRegistry,
};

use cli::{CodesyncCli, Commands};
use logging::LogFormat;
use metrics::{MeteredRecoverer, ServerMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CodesyncCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Challenge(args) => print_challenge(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Opens the registry and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        logging::DEFAULT_DIRECTIVES,
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        data_dir = ?args.data_dir,
        "starting codesync-server"
    );

    // --- Registry ---
    let registry: Arc<dyn ContentRecordRegistry> = match &args.data_dir {
        Some(dir) => {
            let db_path = dir.join("registry");
            std::fs::create_dir_all(&db_path).with_context(|| {
                format!("failed to create registry directory: {}", db_path.display())
            })?;
            let registry = SledRegistry::open(&db_path)
                .with_context(|| format!("failed to open registry at {}", db_path.display()))?;
            tracing::info!(path = %db_path.display(), "registry opened");
            Arc::new(registry)
        }
        None => {
            tracing::warn!("no --data-dir given, records are kept in memory only");
            Arc::new(InMemoryRegistry::new())
        }
    };

    // --- Metrics ---
    let record_count = registry.len().context("failed to count stored records")?;
    tracing::info!(records = record_count, backend = registry.backend(), "registry ready");
    let server_metrics = Arc::new(ServerMetrics::new());
    server_metrics.records.set(record_count as i64);

    // --- Access control ---
    let policy = match args.challenge_max_age_secs {
        Some(secs) => {
            tracing::info!(max_age_secs = secs, "challenge freshness enforced");
            ChallengePolicy::enforced(Duration::from_secs(secs))
        }
        None => ChallengePolicy::disabled(),
    };
    let controller = AccessController::new(Arc::clone(&registry))
        .with_recoverer(Arc::new(MeteredRecoverer::new(Arc::clone(&server_metrics))))
        .with_policy(policy);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            codesync_core::config::PROTOCOL_VERSION,
        ),
        controller: Arc::new(controller),
        metrics: Arc::clone(&server_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&server_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    registry.flush().context("failed to flush registry")?;
    tracing::info!(
        records = server_metrics.records.get(),
        "codesync-server stopped"
    );
    Ok(())
}

/// Prints a challenge for `args.address` on stdout.
fn print_challenge(args: cli::ChallengeArgs) -> Result<()> {
    let address = Address::parse(&args.address)
        .with_context(|| format!("not a wallet address: {}", args.address))?;
    println!("{}", ChallengeBuilder::default().build(&address));
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("codesync-server {}", env!("CARGO_PKG_VERSION"));
    println!("protocol        {}", codesync_core::config::PROTOCOL_VERSION);
    println!("app name        {}", codesync_core::config::APP_NAME);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
