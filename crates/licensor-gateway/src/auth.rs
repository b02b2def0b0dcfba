// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin authentication: arithmetic captcha, password login with per-IP
//! lockout, and the session-cookie middleware guarding the admin API.
//!
//! Login checks run in a fixed order: lockout, then captcha, then
//! credentials. A captcha is consumed by the first attempt that names it,
//! whether or not the answer is right.

use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use licensor_config::model::AdminConfig;
use licensor_core::LicensorError;
use licensor_crypto::{generate_short_id, generate_token, verify_password};
use licensor_storage::queries::settings;
use rand::Rng;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client_ip::ClientIp;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "session";

/// An authenticated admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A captcha challenge and its expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captcha {
    pub question: String,
    pub answer: i64,
}

/// One-digit and two-digit operands, so answers stay easy to type.
pub fn generate_captcha<R: Rng + ?Sized>(rng: &mut R) -> Captcha {
    match rng.gen_range(0..3) {
        0 => {
            let (mut a, mut b) = (rng.gen_range(1..=9), rng.gen_range(10..=99));
            if rng.gen_bool(0.5) {
                std::mem::swap(&mut a, &mut b);
            }
            Captcha {
                question: format!("{a}+{b}=?"),
                answer: a + b,
            }
        }
        1 => {
            let (a, b) = (rng.gen_range(10..=99), rng.gen_range(1..=9));
            Captcha {
                question: format!("{a}-{b}=?"),
                answer: a - b,
            }
        }
        _ => {
            let (a, b) = (rng.gen_range(2..=9), rng.gen_range(2..=9));
            Captcha {
                question: format!("{a}*{b}=?"),
                answer: a * b,
            }
        }
    }
}

/// Failed-login bookkeeping for one client address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginAttempts {
    /// Failures since the last temporary lockout expired.
    pub failures: u32,
    /// Failures since the process started.
    pub total_failures: u32,
    pub last_failure: Option<Instant>,
    /// Locked until restart.
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    Temporary { minutes_left: u64 },
    Permanent,
}

impl LockState {
    pub fn message(self) -> Option<String> {
        match self {
            LockState::Open => None,
            LockState::Temporary { minutes_left } => Some(format!(
                "too many failed logins, try again in {minutes_left} minutes"
            )),
            LockState::Permanent => Some(
                "login is locked for this address, reset the password on the server to unlock"
                    .to_string(),
            ),
        }
    }
}

impl LoginAttempts {
    /// Current lock state. An expired temporary lockout resets the
    /// short-term counter while the total keeps accumulating.
    pub fn check(&mut self, admin: &AdminConfig, now: Instant) -> LockState {
        if self.locked {
            return LockState::Permanent;
        }
        if self.failures >= admin.max_login_failures {
            let lockout = Duration::from_secs(admin.lockout_secs);
            let elapsed = self
                .last_failure
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or(lockout);
            if elapsed < lockout {
                let remaining = lockout - elapsed;
                return LockState::Temporary {
                    minutes_left: remaining.as_secs() / 60 + 1,
                };
            }
            self.failures = 0;
        }
        LockState::Open
    }

    pub fn record_failure(&mut self, admin: &AdminConfig, now: Instant) {
        self.failures += 1;
        self.total_failures += 1;
        self.last_failure = Some(now);
        if self.total_failures >= admin.permanent_lockout_after {
            self.locked = true;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaptchaResponse {
    pub captcha_id: String,
    pub question: String,
}

/// GET /api/captcha
pub async fn get_captcha(State(state): State<AppState>) -> ApiResult<Json<CaptchaResponse>> {
    let captcha = generate_captcha(&mut rand::thread_rng());
    let captcha_id = generate_short_id()?;
    state.captchas.insert(
        captcha_id.clone(),
        captcha.answer,
        Duration::from_secs(state.admin.captcha_ttl_secs),
    );
    Ok(Json(CaptchaResponse {
        captcha_id,
        question: captcha.question,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub captcha_id: String,
    pub captcha_answer: String,
}

fn captcha_matches(expected: Option<i64>, answer: &str) -> bool {
    expected.is_some_and(|expected| answer.trim().parse::<i64>() == Ok(expected))
}

/// Compare submitted credentials with the stored username and Argon2 hash.
async fn credentials_match(
    state: &AppState,
    username: &str,
    password: String,
) -> Result<bool, LicensorError> {
    let stored_username = settings::get(&state.db, settings::ADMIN_USERNAME)
        .await?
        .unwrap_or_else(|| state.admin.username.clone());
    let Some(stored_hash) = settings::get(&state.db, settings::ADMIN_PASSWORD).await? else {
        warn!("no admin password is stored, rejecting login");
        return Ok(false);
    };
    if username != stored_username {
        return Ok(false);
    }
    let password = SecretString::from(password);
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| LicensorError::Internal(format!("password check task failed: {e}")))?
}

/// POST /api/login
pub async fn post_login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let Json(req) = body?;
    let now = Instant::now();
    let mut attempts = state.login_attempts.get(&ip).unwrap_or_default();
    if let Some(message) = attempts.check(&state.admin, now).message() {
        return Err(ApiError::TooManyAttempts(message));
    }

    let expected = state.captchas.take(&req.captcha_id);
    if !captcha_matches(expected, &req.captcha_answer) {
        return Err(ApiError::bad_request("wrong or expired captcha"));
    }

    if !credentials_match(&state, req.username.trim(), req.password).await? {
        attempts.record_failure(&state.admin, now);
        let lock = attempts.check(&state.admin, now);
        match lock {
            LockState::Permanent => {
                warn!(ip = %ip, total = attempts.total_failures, "admin login permanently locked")
            }
            LockState::Temporary { .. } => {
                warn!(ip = %ip, failures = attempts.failures, "admin login temporarily locked")
            }
            LockState::Open => {}
        }
        state.login_attempts.insert(ip, attempts, Duration::MAX);
        return Err(ApiError::Unauthorized(
            lock.message()
                .unwrap_or_else(|| "wrong username or password".to_string()),
        ));
    }

    state.login_attempts.remove(&ip);
    let token = generate_token()?;
    let username = req.username.trim().to_string();
    state.sessions.insert(
        token.clone(),
        Session {
            username: username.clone(),
            created_at: Utc::now(),
        },
        Duration::from_secs(state.admin.session_ttl_secs),
    );
    info!(ip = %ip, username = %username, "admin logged in");

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.admin.secure_cookie);
    Ok((jar.add(cookie), Json(json!({ "success": true }))))
}

/// POST /api/logout
pub async fn post_logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

/// Rejects requests without a live session with 401 JSON. The session is
/// made available to handlers as a request extension.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.get(cookie.value()));
    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        None => Err(ApiError::Unauthorized("not logged in".to_string())),
    }
}
