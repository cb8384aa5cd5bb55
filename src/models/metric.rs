// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized health metric model for storage and API.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Closed set of normalized measurements extracted from providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MetricKind {
    Sleep,
    Steps,
    HeartRate,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Sleep => "SLEEP",
            MetricKind::Steps => "STEPS",
            MetricKind::HeartRate => "HEART_RATE",
        }
    }

    /// Unit used when a provider record does not carry one.
    pub fn default_unit(&self) -> &'static str {
        match self {
            MetricKind::Sleep => "hours",
            MetricKind::Steps => "steps",
            MetricKind::HeartRate => "bpm",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SLEEP" => Ok(MetricKind::Sleep),
            "STEPS" => Ok(MetricKind::Steps),
            "HEART_RATE" => Ok(MetricKind::HeartRate),
            _ => Err(AppError::BadRequest(format!("Unknown metric type: {}", s))),
        }
    }
}

/// Stored metric row.
///
/// Identity is (user_id, source, kind, measured_at); upserts overwrite the
/// remaining fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthMetric {
    pub user_id: String,
    /// Provider name ("oura", "garmin", "fhir")
    pub source: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    /// Measurement time (RFC3339, UTC, `Z` suffix)
    pub measured_at: String,
    pub value: f64,
    pub unit: String,
    /// Verbatim provider record (JSON text)
    pub raw: String,
    pub updated_at: String,
}

impl HealthMetric {
    /// Firestore document id derived from the identity key.
    pub fn document_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            urlencoding::encode(&self.user_id),
            self.source,
            self.kind.as_str(),
            urlencoding::encode(&self.measured_at)
        )
    }
}
