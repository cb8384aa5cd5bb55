// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider endpoints are carried explicitly in [`ProviderSettings`] and
//! handed to each sync adapter, so a missing endpoint surfaces as a
//! configuration error when that provider is synced rather than as an
//! ad hoc environment lookup.

use crate::models::Provider;
use crate::services::sync::SyncMode;
use std::env;

/// Default Oura API base URL.
pub const DEFAULT_OURA_BASE_URL: &str = "https://api.ouraring.com";
const DEFAULT_OURA_AUTHORIZE_URL: &str = "https://cloud.ouraring.com/oauth/authorize";
const DEFAULT_OURA_TOKEN_URL: &str = "https://api.ouraring.com/oauth/token";
const DEFAULT_OURA_SCOPE: &str = "daily heartrate personal";

/// Which storage backend the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    Memory,
}

/// Garmin endpoint paths. All four are required to sync Garmin.
#[derive(Debug, Clone, Default)]
pub struct GarminSettings {
    pub base_url: Option<String>,
    pub sleep_endpoint: Option<String>,
    pub steps_endpoint: Option<String>,
    pub hr_endpoint: Option<String>,
}

/// OAuth client registration for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
}

/// Remote endpoints for every supported provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub oura_base_url: String,
    pub garmin: GarminSettings,
    pub fhir_base_url: Option<String>,
    pub oura_oauth: Option<OAuthClientConfig>,
    pub garmin_oauth: Option<OAuthClientConfig>,
    pub fhir_oauth: Option<OAuthClientConfig>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            oura_base_url: DEFAULT_OURA_BASE_URL.to_string(),
            garmin: GarminSettings::default(),
            fhir_base_url: None,
            oura_oauth: None,
            garmin_oauth: None,
            fhir_oauth: None,
        }
    }
}

impl ProviderSettings {
    /// OAuth client registration for a provider, if configured.
    pub fn oauth_client(&self, provider: Provider) -> Option<&OAuthClientConfig> {
        match provider {
            Provider::Oura => self.oura_oauth.as_ref(),
            Provider::Garmin => self.garmin_oauth.as_ref(),
            Provider::Fhir => self.fhir_oauth.as_ref(),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Public URL of this API (used to build OAuth callback URLs)
    pub api_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub storage: StorageBackend,
    /// How malformed provider records and error responses are handled
    pub sync_mode: SyncMode,
    pub providers: ProviderSettings,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for signing OAuth state parameters
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            sync_mode: SyncMode::Lenient,
            providers: ProviderSettings::default(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let storage = match optional("STORAGE_BACKEND").as_deref() {
            None | Some("firestore") => StorageBackend::Firestore,
            Some("memory") => StorageBackend::Memory,
            Some(_) => return Err(ConfigError::Invalid("STORAGE_BACKEND")),
        };

        let sync_mode = match optional("SYNC_MODE") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("SYNC_MODE"))?,
            None => SyncMode::Lenient,
        };

        let providers = ProviderSettings {
            oura_base_url: optional("OURA_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OURA_BASE_URL.to_string()),
            garmin: GarminSettings {
                base_url: optional("GARMIN_API_BASE_URL"),
                sleep_endpoint: optional("GARMIN_SLEEP_ENDPOINT"),
                steps_endpoint: optional("GARMIN_STEPS_ENDPOINT"),
                hr_endpoint: optional("GARMIN_HR_ENDPOINT"),
            },
            fhir_base_url: optional("FHIR_BASE_URL"),
            oura_oauth: oauth_client_from_env(
                "OURA",
                Some((
                    DEFAULT_OURA_AUTHORIZE_URL,
                    DEFAULT_OURA_TOKEN_URL,
                    DEFAULT_OURA_SCOPE,
                )),
            )?,
            garmin_oauth: oauth_client_from_env("GARMIN", None)?,
            fhir_oauth: oauth_client_from_env("FHIR", None)?,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            storage,
            sync_mode,
            providers,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .trim()
                .as_bytes()
                .to_vec(),
        })
    }
}

/// Read a trimmed, non-empty environment variable.
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load `{PREFIX}_CLIENT_ID` and friends.
///
/// Returns `None` when no client id is set. Once a client id is present the
/// secret is required, and so are the URLs unless `defaults` supplies them.
fn oauth_client_from_env(
    prefix: &'static str,
    defaults: Option<(&str, &str, &str)>,
) -> Result<Option<OAuthClientConfig>, ConfigError> {
    let Some(client_id) = optional(&format!("{prefix}_CLIENT_ID")) else {
        return Ok(None);
    };

    let var = |suffix: &str, default: Option<&str>| -> Result<String, ConfigError> {
        optional(&format!("{prefix}_{suffix}"))
            .or_else(|| default.map(str::to_string))
            .ok_or(ConfigError::MissingOAuth {
                provider: prefix,
                field: suffix.to_string(),
            })
    };

    Ok(Some(OAuthClientConfig {
        client_id,
        client_secret: var("CLIENT_SECRET", None)?,
        authorize_url: var("AUTHORIZE_URL", defaults.map(|d| d.0))?,
        token_url: var("TOKEN_URL", defaults.map(|d| d.1))?,
        scope: var("SCOPE", Some(defaults.map(|d| d.2).unwrap_or("")))?,
    }))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("OAuth client for {provider} is missing {provider}_{field}")]
    MissingOAuth {
        provider: &'static str,
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Single test touches the process env to avoid races between tests.
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("OAUTH_STATE_KEY", "state_key");
        env::set_var("SYNC_MODE", "strict");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("GARMIN_API_BASE_URL", "https://garmin.example.com");
        env::set_var("GARMIN_SLEEP_ENDPOINT", "/sleep");
        env::set_var("OURA_CLIENT_ID", "oura_id");
        env::set_var("OURA_CLIENT_SECRET", "oura_secret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_mode, SyncMode::Strict);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.providers.oura_base_url, DEFAULT_OURA_BASE_URL);
        assert_eq!(
            config.providers.garmin.base_url.as_deref(),
            Some("https://garmin.example.com")
        );
        assert!(config.providers.garmin.steps_endpoint.is_none());

        let oura = config.providers.oauth_client(Provider::Oura).unwrap();
        assert_eq!(oura.client_id, "oura_id");
        assert_eq!(oura.token_url, DEFAULT_OURA_TOKEN_URL);
        assert!(config.providers.oauth_client(Provider::Garmin).is_none());

        env::set_var("GARMIN_CLIENT_ID", "garmin_id");
        env::set_var("GARMIN_CLIENT_SECRET", "garmin_secret");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingOAuth { provider: "GARMIN", .. }));
        env::remove_var("GARMIN_CLIENT_ID");
    }
}
