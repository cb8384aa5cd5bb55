// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin adapter.
//!
//! Endpoint paths are deployment-specific, so all of them come from
//! configuration.

use crate::config::GarminSettings;
use crate::db::HealthStore;
use crate::error::{AppError, Result};
use crate::models::{IntegrationToken, MetricKind, Provider};
use crate::services::daily::{normalize_daily, DailyCategory};
use crate::services::http::ProviderHttp;
use crate::services::sync::{DateRange, PullAdapter, PullBatch, RecordFilter};
use async_trait::async_trait;

const SLEEP: DailyCategory = DailyCategory {
    kind: MetricKind::Sleep,
    value_field: "sleep_hours",
    unit: "hours",
    scale: 1.0,
};

const STEPS: DailyCategory = DailyCategory {
    kind: MetricKind::Steps,
    value_field: "steps",
    unit: "steps",
    scale: 1.0,
};

const HEART_RATE: DailyCategory = DailyCategory {
    kind: MetricKind::HeartRate,
    value_field: "resting_hr",
    unit: "bpm",
    scale: 1.0,
};

/// Pulls daily sleep, steps and resting heart rate from Garmin.
pub struct GarminAdapter {
    http: ProviderHttp,
    base_url: String,
    /// (endpoint path, category), in request order
    endpoints: Vec<(String, DailyCategory)>,
}

impl GarminAdapter {
    /// Build from settings; every endpoint is required.
    pub fn from_settings(http: ProviderHttp, settings: &GarminSettings) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::Configuration(format!("{} is not set", name)))
        };

        let base_url = required(&settings.base_url, "GARMIN_API_BASE_URL")?;
        let endpoints = vec![
            (required(&settings.sleep_endpoint, "GARMIN_SLEEP_ENDPOINT")?, SLEEP),
            (required(&settings.steps_endpoint, "GARMIN_STEPS_ENDPOINT")?, STEPS),
            (required(&settings.hr_endpoint, "GARMIN_HR_ENDPOINT")?, HEART_RATE),
        ];

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
        })
    }
}

#[async_trait]
impl PullAdapter for GarminAdapter {
    fn provider(&self) -> Provider {
        Provider::Garmin
    }

    async fn pull(
        &self,
        token: &IntegrationToken,
        range: &DateRange,
        _store: &dyn HealthStore,
    ) -> Result<PullBatch> {
        let query = range.query_params();
        let mut filter = RecordFilter::new(Provider::Garmin, self.http.mode());
        let mut records = Vec::new();

        for (endpoint, category) in &self.endpoints {
            let url = format!("{}{}", self.base_url, endpoint);
            let body = self
                .http
                .get_json(Provider::Garmin, &url, &query, &token.access_token, None)
                .await?;
            normalize_daily(&body, category, &mut filter, &mut records)?;
        }

        Ok(PullBatch {
            records,
            skipped: filter.skipped(),
            patient_id: None,
        })
    }
}
