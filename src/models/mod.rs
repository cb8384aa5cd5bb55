// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod fhir;
pub mod integration;
pub mod metric;

pub use fhir::{FhirObservation, FhirPatient};
pub use integration::{IntegrationToken, Provider, FHIR_PATIENT_ID_KEY};
pub use metric::{HealthMetric, MetricKind};
