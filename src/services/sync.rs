// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider sync pipeline.
//!
//! Handles the core workflow:
//! 1. Resolve the provider adapter from configuration
//! 2. Load the stored integration token for (user, provider)
//! 3. Let the adapter fetch and normalize remote records
//! 4. Upsert one `HealthMetric` per record, sequentially
//!
//! There is no transaction around step 4: if an upsert fails midway, the
//! rows already written stay written.

use crate::config::ProviderSettings;
use crate::db::{HealthStore, SharedStore};
use crate::error::{AppError, Result};
use crate::models::{HealthMetric, IntegrationToken, MetricKind, Provider};
use crate::services::fhir::FhirAdapter;
use crate::services::garmin::GarminAdapter;
use crate::services::http::ProviderHttp;
use crate::services::oura::OuraAdapter;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// How malformed provider data is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Skip and count malformed records; parse error responses as data.
    #[default]
    Lenient,
    /// Fail the sync on the first malformed record or non-2xx response.
    Strict,
}

impl FromStr for SyncMode {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(SyncMode::Lenient),
            "strict" => Ok(SyncMode::Strict),
            other => Err(AppError::BadRequest(format!("Unknown sync mode: {}", other))),
        }
    }
}

// ─── Date Range ──────────────────────────────────────────────

/// Inclusive range of days to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub const DEFAULT_WINDOW_DAYS: u64 = 7;

    /// The default window: seven days back through `today`.
    ///
    /// Clamps at the earliest representable date.
    pub fn trailing(today: NaiveDate) -> Self {
        Self {
            start: window_start(today).unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }

    /// Build a range from optional request values.
    ///
    /// `end` defaults to `today`, `start` to seven days before `end`.
    /// Values may be `YYYY-MM-DD` or RFC3339 timestamps (date part used).
    pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self> {
        let end = match non_empty(end) {
            Some(raw) => parse_date(raw, "endDate")?,
            None => today,
        };
        let start = match non_empty(start) {
            Some(raw) => parse_date(raw, "startDate")?,
            None => window_start(end).ok_or_else(|| {
                AppError::BadRequest("endDate is out of range".to_string())
            })?,
        };

        if start > end {
            return Err(AppError::BadRequest(
                "startDate must not be after endDate".to_string(),
            ));
        }

        Ok(Self { start, end })
    }

    /// Query parameters understood by the Oura and Garmin daily endpoints.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

fn window_start(end: NaiveDate) -> Option<NaiveDate> {
    end.checked_sub_days(Days::new(DateRange::DEFAULT_WINDOW_DAYS))
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid '{}' parameter: expected YYYY-MM-DD",
                field
            ))
        })
}

// ─── Adapter Contract ────────────────────────────────────────

/// One provider record mapped onto the internal metric shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub kind: MetricKind,
    pub measured_at: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    /// The remote record as received
    pub raw: Value,
}

/// Output of one adapter pull.
#[derive(Debug, Default)]
pub struct PullBatch {
    pub records: Vec<NormalizedRecord>,
    /// Records dropped because a required field was missing
    pub skipped: usize,
    /// Resolved FHIR patient id
    pub patient_id: Option<String>,
}

/// Fetch + normalize step of a provider sync.
///
/// Adapters never write metrics themselves; [`SyncService`] does the upsert
/// loop. The FHIR adapter uses `store` for its patient/observation mirrors.
#[async_trait]
pub trait PullAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn pull(
        &self,
        token: &IntegrationToken,
        range: &DateRange,
        store: &dyn HealthStore,
    ) -> Result<PullBatch>;
}

/// Tracks records dropped during normalization.
pub struct RecordFilter {
    provider: Provider,
    mode: SyncMode,
    skipped: usize,
}

impl RecordFilter {
    pub fn new(provider: Provider, mode: SyncMode) -> Self {
        Self {
            provider,
            mode,
            skipped: 0,
        }
    }

    /// Drop a malformed record. Errors instead in strict mode.
    pub fn reject(&mut self, reason: &str, record: &Value) -> Result<()> {
        match self.mode {
            SyncMode::Lenient => {
                self.skipped += 1;
                tracing::debug!(
                    provider = self.provider.as_str(),
                    reason,
                    record = %record,
                    "Skipping provider record"
                );
                Ok(())
            }
            SyncMode::Strict => Err(AppError::InvalidRecord(format!(
                "{}: {}",
                self.provider, reason
            ))),
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

// ─── Sync Service ────────────────────────────────────────────

/// Result of one sync invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub provider: Provider,
    pub range: DateRange,
    pub written: usize,
    pub skipped: usize,
    pub patient_id: Option<String>,
}

/// Runs provider syncs against the configured store.
#[derive(Clone)]
pub struct SyncService {
    settings: ProviderSettings,
    http: ProviderHttp,
    store: SharedStore,
}

impl SyncService {
    pub fn new(settings: ProviderSettings, mode: SyncMode, store: SharedStore) -> Self {
        Self {
            settings,
            http: ProviderHttp::new(mode),
            store,
        }
    }

    /// Build the adapter for `provider`.
    ///
    /// Fails with `Configuration` when a required endpoint is missing, before
    /// any network or database call.
    pub fn adapter(&self, provider: Provider) -> Result<Box<dyn PullAdapter>> {
        Ok(match provider {
            Provider::Oura => Box::new(OuraAdapter::new(
                self.http.clone(),
                &self.settings.oura_base_url,
            )),
            Provider::Garmin => Box::new(GarminAdapter::from_settings(
                self.http.clone(),
                &self.settings.garmin,
            )?),
            Provider::Fhir => Box::new(FhirAdapter::from_settings(
                self.http.clone(),
                self.settings.fhir_base_url.as_deref(),
            )?),
        })
    }

    /// Sync one provider for one user.
    pub async fn sync(
        &self,
        user_id: &str,
        provider: Provider,
        range: DateRange,
    ) -> Result<SyncReport> {
        let adapter = self.adapter(provider)?;
        self.sync_with(adapter.as_ref(), user_id, range).await
    }

    /// Sync using an explicit adapter.
    pub async fn sync_with(
        &self,
        adapter: &dyn PullAdapter,
        user_id: &str,
        range: DateRange,
    ) -> Result<SyncReport> {
        let provider = adapter.provider();

        let token = self
            .store
            .get_token(user_id, provider)
            .await?
            .ok_or(AppError::NotConnected(provider))?;

        tracing::info!(
            user_id,
            provider = provider.as_str(),
            start = %range.start,
            end = %range.end,
            "Starting provider sync"
        );

        let batch = adapter.pull(&token, &range, self.store.as_ref()).await?;

        let now = format_utc_rfc3339(Utc::now());
        let mut written = 0;
        for record in batch.records {
            let metric = HealthMetric {
                user_id: user_id.to_string(),
                source: provider.as_str().to_string(),
                kind: record.kind,
                measured_at: format_utc_rfc3339(record.measured_at),
                value: record.value,
                unit: record.unit,
                raw: record.raw.to_string(),
                updated_at: now.clone(),
            };
            self.store.upsert_metric(&metric).await?;
            written += 1;
        }

        tracing::info!(
            user_id,
            provider = provider.as_str(),
            written,
            skipped = batch.skipped,
            "Provider sync complete"
        );

        Ok(SyncReport {
            provider,
            range,
            written,
            skipped: batch.skipped,
            patient_id: batch.patient_id,
        })
    }
}
