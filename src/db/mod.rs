// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-memory store for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{
    FhirObservation, FhirPatient, HealthMetric, IntegrationToken, MetricKind, Provider,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const INTEGRATION_TOKENS: &str = "integration_tokens";
    pub const HEALTH_METRICS: &str = "health_metrics";
    pub const FHIR_PATIENTS: &str = "fhir_patients";
    pub const FHIR_OBSERVATIONS: &str = "fhir_observations";
}

/// Filter for listing a user's metrics.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub user_id: String,
    pub kind: Option<MetricKind>,
    /// Inclusive lower bound on `measured_at` (RFC3339)
    pub from: String,
    /// Inclusive upper bound on `measured_at` (RFC3339)
    pub to: String,
    pub limit: u32,
}

/// Storage operations used by the sync routines and API.
///
/// Every write is an upsert keyed by the model's `document_id`, so writing
/// the same identity twice leaves a single row holding the last value.
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn get_token(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<IntegrationToken>, AppError>;

    async fn upsert_token(&self, token: &IntegrationToken) -> Result<(), AppError>;

    async fn list_tokens(&self, user_id: &str) -> Result<Vec<IntegrationToken>, AppError>;

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError>;

    /// Metrics matching `query`, ordered by `measured_at` ascending.
    async fn list_metrics(&self, query: &MetricQuery) -> Result<Vec<HealthMetric>, AppError>;

    async fn upsert_fhir_patient(&self, patient: &FhirPatient) -> Result<(), AppError>;

    async fn upsert_fhir_observation(&self, observation: &FhirObservation)
        -> Result<(), AppError>;
}

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn HealthStore>;
