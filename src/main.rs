use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use grazer::clients::{NeosClient, NextRevalidator};
use grazer::config::Cli;
use grazer::controller::Controller;
use grazer::schedule::spawn_triggers;
use grazer::server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_filter().into()))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .init();

    let fetcher = NeosClient::new(cli.neos_config()).context("invalid Neos client configuration")?;
    let revalidator =
        NextRevalidator::new(cli.next_config()).context("invalid Next.js client configuration")?;

    let controller = Controller::new(fetcher, revalidator, cli.controller_config());
    let app_state = AppState::new(controller.clone(), cli.revalidate_token.clone());

    let listener = TcpListener::bind(cli.address)
        .await
        .with_context(|| format!("failed to bind {}", cli.address))?;
    info!(address = %cli.address, "Listening");

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let triggers = spawn_triggers(&controller, cli.trigger_config(), shutdown.child_token());

    let served = axum::serve(listener, build_router(app_state.clone()))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;
    shutdown.cancel();

    info!("Server stopped, waiting for triggers");
    triggers.wait().await;

    info!("Waiting for revalidations");
    app_state.shutdown_and_wait().await;
    info!("Shutdown complete");

    served.context("HTTP server failed")
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}
