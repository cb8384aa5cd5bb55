// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store with the same keying as Firestore.

use crate::db::{HealthStore, MetricQuery};
use crate::error::AppError;
use crate::models::{FhirObservation, FhirPatient, HealthMetric, IntegrationToken, Provider};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory database. Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tokens: Arc<DashMap<String, IntegrationToken>>,
    metrics: Arc<DashMap<String, HealthMetric>>,
    patients: Arc<DashMap<String, FhirPatient>>,
    observations: Arc<DashMap<String, FhirObservation>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored metrics, sorted by document id.
    pub fn metrics(&self) -> Vec<HealthMetric> {
        let mut entries: Vec<(String, HealthMetric)> = self
            .metrics
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, m)| m).collect()
    }

    pub fn patients(&self) -> Vec<FhirPatient> {
        self.patients.iter().map(|e| e.value().clone()).collect()
    }

    pub fn observations(&self) -> Vec<FhirObservation> {
        self.observations.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl HealthStore for MemoryDb {
    async fn get_token(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<IntegrationToken>, AppError> {
        let id = IntegrationToken::document_id(user_id, provider);
        Ok(self.tokens.get(&id).map(|t| t.value().clone()))
    }

    async fn upsert_token(&self, token: &IntegrationToken) -> Result<(), AppError> {
        let id = IntegrationToken::document_id(&token.user_id, token.provider);
        self.tokens.insert(id, token.clone());
        Ok(())
    }

    async fn list_tokens(&self, user_id: &str) -> Result<Vec<IntegrationToken>, AppError> {
        let mut tokens: Vec<IntegrationToken> = self
            .tokens
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect();
        tokens.sort_by_key(|t| t.provider);
        Ok(tokens)
    }

    async fn upsert_metric(&self, metric: &HealthMetric) -> Result<(), AppError> {
        self.metrics.insert(metric.document_id(), metric.clone());
        Ok(())
    }

    async fn list_metrics(&self, query: &MetricQuery) -> Result<Vec<HealthMetric>, AppError> {
        let mut metrics: Vec<HealthMetric> = self
            .metrics
            .iter()
            .map(|e| e.value().clone())
            .filter(|m| m.user_id == query.user_id)
            .filter(|m| query.kind.map_or(true, |k| m.kind == k))
            .filter(|m| m.measured_at >= query.from && m.measured_at <= query.to)
            .collect();
        metrics.sort_by(|a, b| a.measured_at.cmp(&b.measured_at));
        metrics.truncate(query.limit as usize);
        Ok(metrics)
    }

    async fn upsert_fhir_patient(&self, patient: &FhirPatient) -> Result<(), AppError> {
        self.patients.insert(patient.document_id(), patient.clone());
        Ok(())
    }

    async fn upsert_fhir_observation(
        &self,
        observation: &FhirObservation,
    ) -> Result<(), AppError> {
        self.observations
            .insert(observation.document_id(), observation.clone());
        Ok(())
    }
}
