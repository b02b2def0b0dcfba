// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router construction and listener lifecycle for both HTTP surfaces.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use licensor_config::LicensorConfig;
use licensor_config::model::AdminConfig;
use licensor_core::{ExpiringStore, LicensorError, RequestLimits};
use licensor_engine::LicenseService;
use licensor_notify::SmtpNotifier;
use licensor_storage::Database;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admin;
use crate::auth::{self, LoginAttempts, Session, require_session};
use crate::handlers;
use crate::store::{MemoryStore, Sweep};

/// Shared state for every handler on both surfaces.
#[derive(Clone)]
pub struct AppState {
    pub service: LicenseService,
    pub db: Database,
    /// Used by the SMTP test endpoint.
    pub mailer: SmtpNotifier,
    pub sessions: Arc<dyn ExpiringStore<Session>>,
    /// Captcha id to expected answer.
    pub captchas: Arc<dyn ExpiringStore<i64>>,
    /// Keyed by client address.
    pub login_attempts: Arc<dyn ExpiringStore<LoginAttempts>>,
    pub admin: AdminConfig,
    /// Daily limits used until an administrator stores their own.
    pub limit_defaults: RequestLimits,
    pub batch_create_max: u32,
    pub trust_proxy_headers: bool,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("admin", &self.admin)
            .field("batch_create_max", &self.batch_create_max)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State backed by in-process [`MemoryStore`]s. The returned handles
    /// are meant for [`crate::store::spawn_sweeper`].
    pub fn in_memory(
        service: LicenseService,
        mailer: SmtpNotifier,
        config: &LicensorConfig,
    ) -> (Self, Vec<Arc<dyn Sweep>>) {
        let sessions = Arc::new(MemoryStore::<Session>::new());
        let captchas = Arc::new(MemoryStore::<i64>::new());
        let login_attempts = Arc::new(MemoryStore::<LoginAttempts>::new());
        let sweepers: Vec<Arc<dyn Sweep>> =
            vec![sessions.clone(), captchas.clone(), login_attempts.clone()];
        let state = Self {
            db: service.database().clone(),
            service,
            mailer,
            sessions,
            captchas,
            login_attempts,
            admin: config.admin.clone(),
            limit_defaults: RequestLimits {
                daily_request_limit: config.limits.daily_request_limit,
                daily_email_limit: config.limits.daily_email_limit,
            },
            batch_create_max: config.limits.batch_create_max,
            trust_proxy_headers: config.server.trust_proxy_headers,
            request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        };
        (state, sweepers)
    }
}

/// Public activation surface: `/activate`, `/request-sn`, `/health`.
pub fn public_router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .route("/activate", post(handlers::post_activate))
        .route("/request-sn", post(handlers::post_request_sn))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Admin surface: login endpoints plus the session-protected `/api/*` routes.
pub fn admin_router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    let login_routes = Router::new()
        .route("/api/captcha", get(auth::get_captcha))
        .route("/api/login", post(auth::post_login))
        .route("/api/logout", post(auth::post_logout));

    let protected = admin::routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_session,
    ));

    Router::new()
        .merge(login_routes)
        .merge(protected)
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, LicensorError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| LicensorError::Config(format!("failed to bind {addr}: {e}")))
}

/// Serve `app` on `listener` until `cancel` fires, then drain in-flight requests.
pub async fn serve(
    name: &'static str,
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> Result<(), LicensorError> {
    let addr = listener
        .local_addr()
        .map_err(|e| LicensorError::Internal(format!("{name} listener has no address: {e}")))?;
    info!(surface = name, %addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
    .map_err(|e| LicensorError::Internal(format!("{name} server error: {e}")))?;

    info!(surface = name, "listener stopped");
    Ok(())
}
