//! `adsb-relay run` — start the relay.
//!
//! Loads the INI config (creating or repairing it when needed), starts
//! the optional status endpoint, and runs the relay main loop until
//! SIGINT or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::{self, ConfigStore, IniFileSource};
use crate::error::RelayError;
use crate::logging;
use crate::relay::Relay;
use crate::server;

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    let _log_guard = logging::init(&args.log_level, log_format, args.log_file.as_deref())?;

    let path = args.config.clone().unwrap_or_else(config::default_config_path);
    let source = IniFileSource::new(&path);
    let loaded = config::load_startup(&source).await?;
    for warning in &loaded.warnings {
        tracing::warn!(
            section = %warning.section,
            key = %warning.key,
            value = %warning.value,
            "{}", warning.message
        );
    }
    tracing::info!(
        path = %path.display(),
        version = %loaded.version.short(),
        endpoints = loaded.settings.endpoints.len(),
        "config loaded"
    );

    let relay = Arc::new(Relay::new(ConfigStore::new(Box::new(source), loaded)));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let status_handle = match args.status_port {
        Some(port) => {
            let addr: SocketAddr = format!("{}:{port}", args.status_host).parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(addr = %addr, "status endpoint listening");

            let router = server::build_router(Arc::clone(&relay));
            let mut stop = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                    let _ = stop.changed().await;
                });
                if let Err(e) = serve.await {
                    tracing::error!(error = %e, "status endpoint failed");
                }
            }))
        }
        None => None,
    };

    let run_relay = Arc::clone(&relay);
    let mut main_loop = tokio::spawn(async move { run_relay.run(shutdown_rx).await });

    let finished = tokio::select! {
        () = server::shutdown_signal() => None,
        joined = &mut main_loop => Some(joined),
    };
    let _ = shutdown_tx.send(true);
    let joined = match finished {
        Some(joined) => joined,
        None => main_loop.await,
    };
    if let Err(e) = joined {
        tracing::error!(error = %e, "relay task failed");
    }

    if let Some(handle) = status_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "status endpoint task failed");
        }
    }

    tracing::info!("adsb-relay stopped");
    Ok(())
}
