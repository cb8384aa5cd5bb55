// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Oura ring adapter (v2 user collection API).

use crate::db::HealthStore;
use crate::error::Result;
use crate::models::{IntegrationToken, MetricKind, Provider};
use crate::services::daily::{normalize_daily, DailyCategory};
use crate::services::http::ProviderHttp;
use crate::services::sync::{DateRange, PullAdapter, PullBatch, RecordFilter};
use async_trait::async_trait;

/// Collections pulled, in request order.
const COLLECTIONS: [(&str, DailyCategory); 3] = [
    (
        "daily_sleep",
        DailyCategory {
            kind: MetricKind::Sleep,
            value_field: "total_sleep_duration",
            unit: "hours",
            scale: 1.0 / 3600.0,
        },
    ),
    (
        "daily_activity",
        DailyCategory {
            kind: MetricKind::Steps,
            value_field: "steps",
            unit: "steps",
            scale: 1.0,
        },
    ),
    (
        "daily_readiness",
        DailyCategory {
            kind: MetricKind::HeartRate,
            value_field: "resting_heart_rate",
            unit: "bpm",
            scale: 1.0,
        },
    ),
];

/// Pulls daily sleep, activity and readiness summaries from Oura.
pub struct OuraAdapter {
    http: ProviderHttp,
    base_url: String,
}

impl OuraAdapter {
    pub fn new(http: ProviderHttp, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PullAdapter for OuraAdapter {
    fn provider(&self) -> Provider {
        Provider::Oura
    }

    async fn pull(
        &self,
        token: &IntegrationToken,
        range: &DateRange,
        _store: &dyn HealthStore,
    ) -> Result<PullBatch> {
        let query = range.query_params();
        let mut filter = RecordFilter::new(Provider::Oura, self.http.mode());
        let mut records = Vec::new();

        for (collection, category) in &COLLECTIONS {
            let url = format!("{}/v2/usercollection/{}", self.base_url, collection);
            let body = self
                .http
                .get_json(Provider::Oura, &url, &query, &token.access_token, None)
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
