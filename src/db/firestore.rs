// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Integration tokens (one document per user/provider pair)
//! - Health metrics (one document per user/source/type/timestamp)
//! - FHIR patient and observation mirrors
//!
//! Every write is an `update` of a deterministic document id, which gives
//! insert-or-overwrite semantics.

use crate::db::{collections, HealthStore, MetricQuery};
use crate::error::AppError;
use crate::models::{FhirObservation, FhirPatient, HealthMetric, IntegrationToken, Provider};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator: use an unauthenticated connection to avoid local credential lookups.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Write `object` to `collection/doc_id`, replacing any existing document.
    async fn put<T>(&self, collection: &str, doc_id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + Sync + Send,
        for<'de> T: serde::Deserialize<'de>,
    {
        let _: T = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HealthStore for FirestoreDb {
    // ─── Token Operations ────────────────────────────────────────

    async fn get_token(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<IntegrationToken>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::INTEGRATION_TOKENS)
            .obj()
            .one(&IntegrationToken::document_id(user_id, provider))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_token(&self, token: &IntegrationToken) -> Result<(), AppError> {
        let doc_id = IntegrationToken::document_id(&token.user_id, token.provider);
        self.put(collections::INTEGRATION_TOKENS, &doc_id, token)
            .await
    }

    async fn list_tokens(&self, user_id: &str) -> Result<Vec<IntegrationToken>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::INTEGRATION_TOKENS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Metric Operations ───────────────────────────────────────

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError> {
        self.put(collections::HEALTH_METRICS, &metric.document_id(), metric)
            .await
    }

    async fn list_metrics(&self, query: &MetricQuery) -> Result<Vec<HealthMetric>, AppError> {
        let user_id = query.user_id.clone();
        let from = query.from.clone();
        let to = query.to.clone();
        let kind = query.kind;

        self.get_client()?
            .fluent()
            .select()
            .from(collections::HEALTH_METRICS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("measured_at").greater_than_or_equal(from.clone()),
                    q.field("measured_at").less_than_or_equal(to.clone()),
                    kind.and_then(|k| q.field("type").eq(k.as_str())),
                ])
            })
            .order_by([("measured_at", firestore::FirestoreQueryDirection::Ascending)])
            .limit(query.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── FHIR Mirror Operations ──────────────────────────────────

    async fn upsert_fhir_patient(&self, patient: &FhirPatient) -> Result<(), AppError> {
        self.put(collections::FHIR_PATIENTS, &patient.document_id(), patient)
            .await
    }

    async fn upsert_fhir_observation(
        &self,
        observation: &FhirObservation,
    ) -> Result<(), AppError> {
        self.put(
            collections::FHIR_OBSERVATIONS,
            &observation.document_id(),
            observation,
        )
        .await
    }
}
