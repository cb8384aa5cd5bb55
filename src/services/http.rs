// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-authenticated JSON GETs against provider APIs.

use crate::error::AppError;
use crate::models::Provider;
use crate::services::sync::SyncMode;
use serde_json::Value;

/// HTTP client shared by all provider adapters.
///
/// No timeout or retry is configured; each request is awaited before the
/// caller issues the next one.
#[derive(Clone)]
pub struct ProviderHttp {
    http: reqwest::Client,
    mode: SyncMode,
}

impl ProviderHttp {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            http: reqwest::Client::new(),
            mode,
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// GET `url` with bearer auth and parse the body as JSON.
    ///
    /// In lenient mode a non-2xx status is logged and the body is parsed
    /// anyway, so an error document simply yields no records downstream.
    /// Strict mode turns it into `ProviderApi`. A body that is not JSON is
    /// an error in both modes.
    pub async fn get_json(
        &self,
        provider: Provider,
        url: &str,
        query: &[(&str, String)],
        access_token: &str,
        accept: Option<&str>,
    ) -> Result<Value, AppError> {
        let mut request = self.http.get(url).bearer_auth(access_token).query(query);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ProviderApi(format!("{} request failed: {}", provider, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::ProviderApi(format!("{} read failed: {}", provider, e)))?;

        if !status.is_success() {
            if self.mode == SyncMode::Strict {
                if status.as_u16() == 401 {
                    return Err(AppError::ProviderApi(
                        AppError::PROVIDER_TOKEN_ERROR.to_string(),
                    ));
                }
                return Err(AppError::ProviderApi(format!(
                    "{} HTTP {}: {}",
                    provider, status, body
                )));
            }
            tracing::warn!(
                provider = provider.as_str(),
                url,
                status = status.as_u16(),
                "Provider returned non-success status, parsing body anyway"
            );
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::ProviderApi(format!("{} JSON parse error: {}", provider, e)))
    }
}
