// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FHIR server adapter.
//!
//! Handles:
//! - Patient discovery (cached in the token metadata after the first sync)
//! - Patient snapshot mirroring
//! - Observation mirroring and classification into metric kinds

use crate::db::HealthStore;
use crate::error::{AppError, Result};
use crate::models::{
    FhirObservation, FhirPatient, IntegrationToken, MetricKind, Provider, FHIR_PATIENT_ID_KEY,
};
use crate::services::http::ProviderHttp;
use crate::services::sync::{DateRange, NormalizedRecord, PullAdapter, PullBatch, RecordFilter};
use crate::time_utils::{format_utc_rfc3339, parse_timestamp};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

const FHIR_JSON: &str = "application/fhir+json";
const OBSERVATION_PAGE_SIZE: &str = "50";

/// Substring rules, checked in order against an observation's codes and text.
const CLASSIFICATION_RULES: [(&[&str], MetricKind); 3] = [
    (&["8867-4", "heart"], MetricKind::HeartRate),
    (&["41950-7", "step"], MetricKind::Steps),
    (&["sleep", "93832-4"], MetricKind::Sleep),
];

/// Classify an Observation resource into a metric kind.
///
/// Looks at `code.coding[].code`, `code.coding[].display` and `code.text`.
/// Returns `None` for anything that matches no rule.
pub fn classify_observation(resource: &Value) -> Option<MetricKind> {
    let code = &resource["code"];
    let mut haystack = String::new();

    if let Some(codings) = code["coding"].as_array() {
        for coding in codings {
            for field in ["code", "display"] {
                if let Some(s) = coding[field].as_str() {
                    haystack.push_str(s);
                    haystack.push(' ');
                }
            }
        }
    }
    if let Some(text) = code["text"].as_str() {
        haystack.push_str(text);
    }

    let haystack = haystack.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| haystack.contains(n)))
        .map(|(_, kind)| *kind)
}

/// Pulls the patient and their observations from a FHIR server.
pub struct FhirAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl FhirAdapter {
    /// Build from the configured base URL, which is required.
    pub fn from_settings(http: ProviderHttp, base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .ok_or_else(|| AppError::Configuration("FHIR_BASE_URL is not set".to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)], token: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        self.http
            .get_json(Provider::Fhir, &url, query, token, Some(FHIR_JSON))
            .await
    }

    /// Patient id for this token, searching once and caching the result.
    ///
    /// The cached id is never re-validated.
    async fn resolve_patient_id(
        &self,
        token: &IntegrationToken,
        store: &dyn HealthStore,
    ) -> Result<String> {
        if let Some(id) = token.fhir_patient_id() {
            return Ok(id.to_string());
        }

        let bundle = self
            .get("Patient", &[("_count", "1".to_string())], &token.access_token)
            .await?;

        let patient_id = bundle["entry"]
            .as_array()
            .and_then(|entries| entries.first())
            .and_then(|entry| entry["resource"]["id"].as_str())
            .filter(|id| !id.is_empty())
            .ok_or(AppError::PatientNotFound)?
            .to_string();

        let mut updated = token.clone();
        updated
            .metadata
            .insert(FHIR_PATIENT_ID_KEY.to_string(), patient_id.clone());
        updated.updated_at = format_utc_rfc3339(Utc::now());
        store.upsert_token(&updated).await?;

        tracing::info!(
            user_id = %token.user_id,
            patient_id = %patient_id,
            "Resolved and cached FHIR patient id"
        );

        Ok(patient_id)
    }
}

#[async_trait]
impl PullAdapter for FhirAdapter {
    fn provider(&self) -> Provider {
        Provider::Fhir
    }

    async fn pull(
        &self,
        token: &IntegrationToken,
        _range: &DateRange,
        store: &dyn HealthStore,
    ) -> Result<PullBatch> {
        let patient_id = self.resolve_patient_id(token, store).await?;
        let now = format_utc_rfc3339(Utc::now());

        let patient = self
            .get(
                &format!("Patient/{}", urlencoding::encode(&patient_id)),
                &[],
                &token.access_token,
            )
            .await?;
        store
            .upsert_fhir_patient(&patient_snapshot(&token.user_id, &patient_id, &patient, &now))
            .await?;

        let bundle = self
            .get(
                "Observation",
                &[
                    ("patient", patient_id.clone()),
                    ("_count", OBSERVATION_PAGE_SIZE.to_string()),
                ],
                &token.access_token,
            )
            .await?;

        let mut filter = RecordFilter::new(Provider::Fhir, self.http.mode());
        let mut records = Vec::new();
        let entries = bundle["entry"].as_array().map(Vec::as_slice).unwrap_or(&[]);

        for entry in entries {
            let resource = &entry["resource"];
            let Some(observation_id) = resource["id"].as_str() else {
                filter.reject("observation without id", resource)?;
                continue;
            };

            let observation =
                observation_mirror(&token.user_id, &patient_id, observation_id, resource, &now);
            store.upsert_fhir_observation(&observation).await?;

            let Some(kind) = observation.metric_kind else {
                continue;
            };
            let measured_at = observation.effective_at.as_deref().and_then(parse_timestamp);
            let (Some(value), Some(measured_at)) = (observation.value, measured_at) else {
                filter.reject("classified observation without value or time", resource)?;
                continue;
            };

            records.push(NormalizedRecord {
                kind,
                measured_at,
                value,
                unit: observation
                    .unit
                    .clone()
                    .unwrap_or_else(|| kind.default_unit().to_string()),
                raw: resource.clone(),
            });
        }

        Ok(PullBatch {
            records,
            skipped: filter.skipped(),
            patient_id: Some(patient_id),
        })
    }
}

fn patient_snapshot(user_id: &str, patient_id: &str, resource: &Value, now: &str) -> FhirPatient {
    let name = resource["name"]
        .as_array()
        .and_then(|names| names.first())
        .and_then(|name| {
            name["text"].as_str().map(str::to_string).or_else(|| {
                let given = name["given"]
                    .as_array()
                    .map(|g| g.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                    .unwrap_or_default();
                let parts: Vec<&str> = given
                    .into_iter()
                    .chain(name["family"].as_str())
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" "))
            })
        });

    FhirPatient {
        user_id: user_id.to_string(),
        patient_id: patient_id.to_string(),
        name,
        gender: resource["gender"].as_str().map(str::to_string),
        birth_date: resource["birthDate"].as_str().map(str::to_string),
        resource: resource.to_string(),
        updated_at: now.to_string(),
    }
}

fn observation_mirror(
    user_id: &str,
    patient_id: &str,
    observation_id: &str,
    resource: &Value,
    now: &str,
) -> FhirObservation {
    let first_coding = &resource["code"]["coding"][0];
    let quantity = &resource["valueQuantity"];

    let effective_at = resource["effectiveDateTime"]
        .as_str()
        .or_else(|| resource["effectivePeriod"]["start"].as_str())
        .or_else(|| resource["issued"].as_str())
        .map(str::to_string);

    FhirObservation {
        user_id: user_id.to_string(),
        observation_id: observation_id.to_string(),
        patient_id: patient_id.to_string(),
        code: first_coding["code"].as_str().map(str::to_string),
        display: first_coding["display"]
            .as_str()
            .or_else(|| resource["code"]["text"].as_str())
            .map(str::to_string),
        effective_at,
        value: quantity["value"].as_f64(),
        unit: quantity["unit"].as_str().map(str::to_string),
        metric_kind: classify_observation(resource),
        resource: resource.to_string(),
        updated_at: now.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn coded(code: &str, display: &str) -> Value {
        json!({
            "resourceType": "Observation",
            "code": {"coding": [{"system": "http://loinc.org", "code": code, "display": display}]}
        })
    }

    #[test]
    fn test_classify_by_loinc_code() {
        assert_eq!(classify_observation(&coded("8867-4", "")), Some(MetricKind::HeartRate));
        assert_eq!(classify_observation(&coded("41950-7", "")), Some(MetricKind::Steps));
        assert_eq!(classify_observation(&coded("93832-4", "")), Some(MetricKind::Sleep));
    }

    #[test]
    fn test_classify_by_text() {
        let obs = json!({"code": {"text": "Resting Heart Rate"}});
        assert_eq!(classify_observation(&obs), Some(MetricKind::HeartRate));

        let obs = coded("x-1", "Number of STEPS in 24 hours");
        assert_eq!(classify_observation(&obs), Some(MetricKind::Steps));

        let obs = json!({"code": {"text": "Sleep duration"}});
        assert_eq!(classify_observation(&obs), Some(MetricKind::Sleep));
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify_observation(&coded("2339-0", "Glucose")), None);
        assert_eq!(classify_observation(&json!({})), None);
    }

    #[test]
    fn test_heart_rule_wins_over_later_rules() {
        let obs = json!({"code": {"text": "heart rate during sleep"}});
        assert_eq!(classify_observation(&obs), Some(MetricKind::HeartRate));
    }

    #[test]
    fn test_observation_mirror_extracts_fields() {
        let resource = json!({
            "resourceType": "Observation",
            "id": "obs-1",
            "code": {"coding": [{"code": "8867-4", "display": "Heart rate"}]},
            "effectivePeriod": {"start": "2024-01-01T07:00:00Z"},
            "valueQuantity": {"value": 61.0, "unit": "beats/minute", "code": "/min"}
        });
        let obs = observation_mirror("u1", "p1", "obs-1", &resource, "now");
        assert_eq!(obs.code.as_deref(), Some("8867-4"));
        assert_eq!(obs.display.as_deref(), Some("Heart rate"));
        assert_eq!(obs.effective_at.as_deref(), Some("2024-01-01T07:00:00Z"));
        assert_eq!(obs.value, Some(61.0));
        assert_eq!(obs.unit.as_deref(), Some("beats/minute"));
        assert_eq!(obs.metric_kind, Some(MetricKind::HeartRate));
    }

    #[test]
    fn test_patient_snapshot_name() {
        let resource = json!({
            "id": "p1",
            "name": [{"given": ["Ada", "M"], "family": "Lovelace"}],
            "gender": "female",
            "birthDate": "1815-12-10"
        });
        let patient = patient_snapshot("u1", "p1", &resource, "now");
        assert_eq!(patient.name.as_deref(), Some("Ada M Lovelace"));
        assert_eq!(patient.gender.as_deref(), Some("female"));
        assert_eq!(patient.birth_date.as_deref(), Some("1815-12-10"));
    }
}
