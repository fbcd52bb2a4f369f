// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes that do not need a valid token.
//!
//! Sign-in and sign-up are handled entirely by the identity provider; the
//! server only has to forget the session cookie on sign-out.

use axum::{extract::State, http::StatusCode, routing::post, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::db::ProgressStore;
use crate::middleware::auth::SESSION_COOKIE;
use crate::AppState;

pub fn routes<S: ProgressStore>() -> Router<Arc<AppState<S>>> {
    Router::new().route("/auth/logout", post(logout::<S>))
}

/// Removal cookie for the session token.
///
/// Attributes match what the frontend sets, or browsers keep the original.
fn session_removal_cookie(frontend_url: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(frontend_url.starts_with("https://"))
        .build()
}

/// Logout - expire the session cookie.
///
/// Bearer-token clients simply drop their token; this is idempotent.
async fn logout<S: ProgressStore>(
    State(state): State<Arc<AppState<S>>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode) {
    let had_session = jar.get(SESSION_COOKIE).is_some();
    tracing::debug!(had_session, "Logout");

    let removal = session_removal_cookie(&state.config.frontend_url);
    (jar.remove(removal), StatusCode::NO_CONTENT)
}
