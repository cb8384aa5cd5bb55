// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider OAuth connect routes.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Provider;
use crate::AppState;

/// Connect requires a session; the auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/{provider}/connect", get(connect))
}

/// The callback is reached by the provider's redirect, without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/{provider}/callback", get(callback))
}

/// Start OAuth flow - redirect to the provider's authorization page.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let provider: Provider = provider.parse()?;
    let auth_url = state
        .oauth_service
        .authorize_url(&user.user_id, provider)?;

    tracing::info!(
        user_id = %user.user_id,
        provider = provider.as_str(),
        "Starting OAuth flow"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens and store them.
///
/// Always redirects to the frontend; failures are reported in `?error=`.
async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let base = format!(
        "{}/integrations",
        state.config.frontend_url.trim_end_matches('/')
    );
    let fail = |reason: &str| {
        Redirect::temporary(&format!("{}?error={}", base, urlencoding::encode(reason)))
    };

    let Ok(provider) = provider.parse::<Provider>() else {
        return fail("unknown_provider");
    };

    if let Some(error) = params.error {
        tracing::warn!(provider = provider.as_str(), error = %error, "OAuth error from provider");
        return fail(&error);
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        return fail("missing_code");
    };

    match state
        .oauth_service
        .complete(provider, &code, &oauth_state)
        .await
    {
        Ok(_) => Redirect::temporary(&format!("{}?connected={}", base, provider.as_str())),
        Err(e) => {
            tracing::warn!(provider = provider.as_str(), error = %e, "OAuth callback failed");
            let (_, code) = e.status_and_code();
            fail(code)
        }
    }
}
