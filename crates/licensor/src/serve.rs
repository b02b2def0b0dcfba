// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `licensor serve` command implementation.
//!
//! Opens the database, seeds admin credentials, and runs the activation and
//! admin listeners until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use licensor_config::LicensorConfig;
use licensor_core::LicensorError;
use licensor_engine::LicenseService;
use licensor_gateway::{
    AppState, SWEEP_INTERVAL, admin_router, bind, public_router, serve, spawn_sweeper,
};
use licensor_notify::SmtpNotifier;
use licensor_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::admin::seed_admin;

/// Runs the `licensor serve` command.
pub async fn run_serve(config: LicensorConfig) -> Result<(), LicensorError> {
    init_tracing(&config.logging.level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.storage.database_path,
        "starting licensor serve"
    );

    let db = Database::from_config(&config.storage).await?;
    if let Some(password) = seed_admin(&db, &config.admin).await? {
        warn!(username = %config.admin.username, "no admin password configured, generated one");
        println!(
            "generated admin password for '{}': {password}\n\
             store it now, it will not be shown again",
            config.admin.username
        );
    }

    let mailer = SmtpNotifier::new(db.clone(), Duration::from_secs(config.notify.send_timeout_secs));
    let service = LicenseService::new(db.clone(), Arc::new(mailer.clone()), &config);
    let (state, stores) = AppState::in_memory(service, mailer, &config);

    let cancel = install_signal_handler();
    let sweeper = spawn_sweeper(stores, SWEEP_INTERVAL, cancel.clone());

    let public_listener = bind(&config.server.host, config.server.activation_port).await?;
    let admin_listener = bind(&config.server.host, config.server.admin_port).await?;

    let result = tokio::try_join!(
        serve("activation", public_listener, public_router(state.clone()), cancel.clone()),
        serve("admin", admin_listener, admin_router(state), cancel.clone()),
    );
    if let Err(e) = &result {
        error!(error = %e, "listener failed, shutting down");
    }
    cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "store sweeper did not stop cleanly");
    }

    db.close().await?;
    info!("licensor stopped");
    result.map(|_| ())
}

/// Installs handlers for SIGTERM and SIGINT.
///
/// The returned token is cancelled when either signal arrives.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C will stop the server");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("licensor={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
