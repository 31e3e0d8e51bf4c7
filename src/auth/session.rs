use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::Principal;
use crate::config::AppConfig;
use crate::db::StoreError;
use crate::errors::AppError;
use crate::models::session::Session;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "staffdesk_session";
pub const TOKEN_LENGTH: usize = 40;
pub const REMEMBER_DAYS: i64 = 30;

pub fn token_from_request(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Looks up a live session and its user. Expired sessions are removed.
pub async fn resolve(state: &AppState, token: &str) -> Result<Option<Principal>, AppError> {
    let session = state
        .store
        .find_session(token)
        .await
        .map_err(state.internal("An error occurred while checking the session"))?;
    let Some(session) = session else {
        return Ok(None);
    };

    if session.is_expired(Utc::now()) {
        state
            .store
            .delete_session(&session.token)
            .await
            .map_err(state.internal("An error occurred while checking the session"))?;
        return Ok(None);
    }

    let user = state
        .store
        .find_user(session.user_id)
        .await
        .map_err(state.internal("An error occurred while checking the session"))?;
    Ok(user.map(|user| Principal {
        user,
        session_token: session.token,
    }))
}

/// Starts a fresh session for `user_id`, destroying `previous` first so a
/// token planted before login never becomes authenticated.
pub async fn start(
    state: &AppState,
    user_id: i64,
    previous: Option<&str>,
    remember: bool,
) -> Result<Cookie<'static>, StoreError> {
    if let Some(previous) = previous {
        state.store.delete_session(previous).await?;
    }

    let now = Utc::now();
    let swept = state.store.delete_expired_sessions(now).await?;
    if swept > 0 {
        log::debug!("removed {} expired session(s)", swept);
    }
    let lifetime = if remember {
        Duration::days(REMEMBER_DAYS)
    } else {
        Duration::minutes(state.config.session_lifetime_minutes)
    };
    let session = Session {
        token: generate_token(),
        user_id,
        created_at: now,
        expires_at: now + lifetime,
    };
    state.store.insert_session(&session).await?;

    Ok(session_cookie(&state.config, session.token, remember))
}

pub fn session_cookie(config: &AppConfig, token: String, remember: bool) -> Cookie<'static> {
    let mut builder = Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax);
    if remember {
        builder = builder.max_age(time::Duration::days(REMEMBER_DAYS));
    }
    builder.finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}
