// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use health_sync::config::{Config, GarminSettings, ProviderSettings};
use health_sync::db::{FirestoreDb, HealthStore, MemoryDb};
use health_sync::middleware::auth::Claims;
use health_sync::models::{IntegrationToken, Provider};
use health_sync::routes::create_router;
use health_sync::services::{SyncMode, SyncService};
use health_sync::AppState;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
pub const ACCESS_TOKEN: &str = "provider-access-token";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique user id for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_user_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("user-{}", nanos)
}

/// Provider settings pointing every adapter at a mock server.
#[allow(dead_code)]
pub fn mock_providers(base_url: &str) -> ProviderSettings {
    ProviderSettings {
        oura_base_url: base_url.to_string(),
        garmin: GarminSettings {
            base_url: Some(base_url.to_string()),
            sleep_endpoint: Some("/wellness/sleep".to_string()),
            steps_endpoint: Some("/wellness/steps".to_string()),
            hr_endpoint: Some("/wellness/heart-rate".to_string()),
        },
        fhir_base_url: Some(format!("{}/fhir", base_url)),
        ..ProviderSettings::default()
    }
}

/// Sync service over a fresh in-memory store.
#[allow(dead_code)]
pub fn sync_service(providers: ProviderSettings, mode: SyncMode) -> (SyncService, MemoryDb) {
    let db = MemoryDb::new();
    let service = SyncService::new(providers, mode, Arc::new(db.clone()));
    (service, db)
}

/// Store a token for `(user_id, provider)`.
#[allow(dead_code)]
pub async fn seed_token(
    db: &dyn HealthStore,
    user_id: &str,
    provider: Provider,
    metadata: &[(&str, &str)],
) -> IntegrationToken {
    let token = IntegrationToken {
        user_id: user_id.to_string(),
        provider,
        access_token: ACCESS_TOKEN.to_string(),
        refresh_token: None,
        expires_at: None,
        scope: None,
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    };
    db.upsert_token(&token).await.unwrap();
    token
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let db = MemoryDb::new();
    let state = Arc::new(AppState::new(config, Arc::new(db.clone())));
    (create_router(state.clone()), state, db)
}

/// Sign `claims` the way the login frontend does (HS256).
#[allow(dead_code)]
pub fn sign_claims(claims: &Claims, signing_key: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Session JWT for `user_id`, valid for a day.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };
    sign_claims(&claims, signing_key)
}
