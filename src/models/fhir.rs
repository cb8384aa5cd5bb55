// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local mirrors of FHIR `Patient` and `Observation` resources.

use crate::models::MetricKind;
use serde::{Deserialize, Serialize};

/// Patient snapshot, keyed by (user_id, patient_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FhirPatient {
    pub user_id: String,
    pub patient_id: String,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    /// Verbatim resource (JSON text)
    pub resource: String,
    pub updated_at: String,
}

impl FhirPatient {
    pub fn document_id(&self) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(&self.user_id),
            urlencoding::encode(&self.patient_id)
        )
    }
}

/// Observation mirror, keyed by (user_id, observation_id).
///
/// Stored for every observation returned, whether or not it was classified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FhirObservation {
    pub user_id: String,
    pub observation_id: String,
    pub patient_id: String,
    /// First coding code (e.g. LOINC "8867-4")
    pub code: Option<String>,
    pub display: Option<String>,
    pub effective_at: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub metric_kind: Option<MetricKind>,
    /// Verbatim resource (JSON text)
    pub resource: String,
    pub updated_at: String,
}

impl FhirObservation {
    pub fn document_id(&self) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(&self.user_id),
            urlencoding::encode(&self.observation_id)
        )
    }
}
