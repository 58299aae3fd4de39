use std::process::ExitCode;

use clap::Parser;
use ferrite_server::{Config, Server};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_tracing(&config);

    if let Err(e) = config.validate() {
        error!("invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        host = %config.host,
        port = config.port,
        max_clients = config.max_clients,
        max_memory = %config.max_memory,
        "starting ferrite server"
    );
    if config.enable_persist {
        info!(data_dir = %config.data_dir.display(), "persistence requested (not yet implemented)");
    }

    let server = match Server::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind {}: {e}", config.listen_addr());
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    match server.run(shutdown_rx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ferrite={}", config.log_level).into());

    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Completes on SIGINT or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        let mut term = match unix_signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
