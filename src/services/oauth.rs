// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider OAuth connect flow.
//!
//! The `state` parameter carries the user id, provider and issue time,
//! signed with HMAC-SHA256 so the callback (which has no session) knows
//! whose token it is storing.

use crate::config::{OAuthClientConfig, ProviderSettings};
use crate::db::SharedStore;
use crate::error::{AppError, Result};
use crate::models::{IntegrationToken, Provider};
use crate::time_utils::format_utc_rfc3339;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed state stays valid.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

/// Decoded, verified OAuth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub user_id: String,
    pub provider: Provider,
    pub issued_at: DateTime<Utc>,
}

fn state_mac(payload: &str, key: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Sign `user_id|provider|ts_hex` and base64 the result for use in a URL.
pub fn sign_state(
    user_id: &str,
    provider: Provider,
    issued_at: DateTime<Utc>,
    key: &[u8],
) -> Result<String> {
    let payload = format!(
        "{}|{}|{:x}",
        user_id,
        provider.as_str(),
        issued_at.timestamp_millis()
    );
    let signature = state_mac(&payload, key)?.finalize().into_bytes();
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify signature and age of a state produced by [`sign_state`].
pub fn verify_state(state: &str, key: &[u8], now: DateTime<Utc>) -> Result<OAuthState> {
    let invalid = || AppError::BadRequest("Invalid OAuth state".to_string());

    let bytes = URL_SAFE_NO_PAD.decode(state).map_err(|_| invalid())?;
    let decoded = String::from_utf8(bytes).map_err(|_| invalid())?;

    // User ids may contain '|', so split from the right.
    let mut parts = decoded.rsplitn(4, '|');
    let (Some(signature_hex), Some(timestamp_hex), Some(provider), Some(user_id)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let payload = format!("{}|{}|{}", user_id, provider, timestamp_hex);
    let expected = hex::encode(state_mac(&payload, key)?.finalize().into_bytes());
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch");
        return Err(invalid());
    }

    let millis = i64::from_str_radix(timestamp_hex, 16).map_err(|_| invalid())?;
    let issued_at = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;
    if now - issued_at > Duration::seconds(STATE_MAX_AGE_SECS) || issued_at > now {
        return Err(AppError::BadRequest("OAuth state expired".to_string()));
    }

    Ok(OAuthState {
        user_id: user_id.to_string(),
        provider: provider.parse()?,
        issued_at,
    })
}

/// Token endpoint response (RFC 6749 section 5.1).
#[derive(Debug, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Builds authorize redirects and completes callbacks.
#[derive(Clone)]
pub struct OAuthService {
    settings: ProviderSettings,
    state_key: Vec<u8>,
    api_url: String,
    http: reqwest::Client,
    store: SharedStore,
}

impl OAuthService {
    pub fn new(
        settings: ProviderSettings,
        state_key: Vec<u8>,
        api_url: &str,
        store: SharedStore,
    ) -> Self {
        Self {
            settings,
            state_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            store,
        }
    }

    fn client(&self, provider: Provider) -> Result<&OAuthClientConfig> {
        self.settings.oauth_client(provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "OAuth client for {} is not configured",
                provider.display_name()
            ))
        })
    }

    /// Redirect URI registered with the provider.
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}/callback", self.api_url, provider.as_str())
    }

    /// Provider authorize URL for `user_id`, with a freshly signed state.
    pub fn authorize_url(&self, user_id: &str, provider: Provider) -> Result<String> {
        let client = self.client(provider)?;
        let state = sign_state(user_id, provider, Utc::now(), &self.state_key)?;

        let mut url = reqwest::Url::parse(&client.authorize_url).map_err(|e| {
            AppError::Configuration(format!(
                "Invalid authorize URL for {}: {}",
                provider.display_name(),
                e
            ))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &client.client_id)
                .append_pair("redirect_uri", &self.callback_url(provider));
            if !client.scope.is_empty() {
                query.append_pair("scope", &client.scope);
            }
            query.append_pair("state", &state);
        }

        Ok(url.into())
    }

    /// Verify `state`, exchange `code` and store the resulting token.
    ///
    /// `provider` is the one named by the callback path and must match the
    /// one the state was signed for.
    pub async fn complete(
        &self,
        provider: Provider,
        code: &str,
        state: &str,
    ) -> Result<IntegrationToken> {
        let verified = verify_state(state, &self.state_key, Utc::now())?;
        if verified.provider != provider {
            return Err(AppError::BadRequest(
                "OAuth state was issued for a different provider".to_string(),
            ));
        }

        let exchanged = self.exchange_code(provider, code).await?;
        let token = self.store_token(&verified.user_id, provider, exchanged).await?;

        tracing::info!(
            user_id = %verified.user_id,
            provider = provider.as_str(),
            "Provider connected"
        );

        Ok(token)
    }

    async fn exchange_code(&self, provider: Provider, code: &str) -> Result<TokenExchangeResponse> {
        let client = self.client(provider)?;
        let redirect_uri = self.callback_url(provider);

        let response = self
            .http
            .post(&client.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderApi(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = provider.as_str(),
                status = status.as_u16(),
                "Token exchange rejected"
            );
            return Err(AppError::ProviderApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderApi(format!("JSON parse error: {}", e)))
    }

    /// Overwrite the stored token, keeping only the original `created_at`.
    async fn store_token(
        &self,
        user_id: &str,
        provider: Provider,
        exchanged: TokenExchangeResponse,
    ) -> Result<IntegrationToken> {
        let now = Utc::now();
        let now_str = format_utc_rfc3339(now);
        let created_at = self
            .store
            .get_token(user_id, provider)
            .await?
            .map(|existing| existing.created_at)
            .unwrap_or_else(|| now_str.clone());

        let token = IntegrationToken {
            user_id: user_id.to_string(),
            provider,
            access_token: exchanged.access_token,
            refresh_token: exchanged.refresh_token,
            expires_at: exchanged
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .map(format_utc_rfc3339),
            scope: exchanged.scope,
            metadata: BTreeMap::new(),
            created_at,
            updated_at: now_str,
        };

        self.store.upsert_token(&token).await?;
        Ok(token)
    }
}
