// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::db::MetricQuery;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{MetricKind, Provider};
use crate::services::DateRange;
use crate::time_utils::{format_utc_rfc3339, start_of_day};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync/{provider}", post(sync_provider))
        .route("/api/metrics", get(get_metrics))
        .route("/api/integrations", get(get_integrations))
}

// ─── Sync ────────────────────────────────────────────────────

/// Optional sync request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub ok: bool,
    pub provider: String,
    pub start_date: String,
    pub end_date: String,
    pub written: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

/// Pull the caller's recent data from one provider.
///
/// The body is optional; a request without a JSON content type syncs the
/// default window.
async fn sync_provider(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(provider): Path<String>,
    payload: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResponse>> {
    let provider: Provider = provider.parse()?;
    let request = payload.map(|Json(r)| r).unwrap_or_default();

    let range = DateRange::resolve(
        request.start_date.as_deref(),
        request.end_date.as_deref(),
        Utc::now().date_naive(),
    )?;

    let report = state
        .sync_service
        .sync(&user.user_id, provider, range)
        .await
        .inspect_err(|e| {
            if e.is_provider_token_error() {
                tracing::warn!(
                    user_id = %user.user_id,
                    provider = provider.as_str(),
                    "Provider rejected stored token; user must reconnect"
                );
            }
        })?;

    Ok(Json(SyncResponse {
        ok: true,
        provider: report.provider.as_str().to_string(),
        start_date: report.range.start.format("%Y-%m-%d").to_string(),
        end_date: report.range.end.format("%Y-%m-%d").to_string(),
        written: report.written,
        skipped: report.skipped,
        patient_id: report.patient_id,
    }))
}

// ─── Metrics ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct MetricsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    start: Option<String>,
    end: Option<String>,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 500))]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MetricResponse {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub measured_at: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MetricsResponse {
    pub metrics: Vec<MetricResponse>,
}

/// List the caller's metrics, oldest first.
async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<MetricsResponse>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(str::parse::<MetricKind>)
        .transpose()?;

    let range = DateRange::resolve(
        params.start.as_deref(),
        params.end.as_deref(),
        Utc::now().date_naive(),
    )?;

    // Inclusive of the whole end day.
    let to = range
        .end
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::BadRequest("end is out of range".to_string()))?;

    let query = MetricQuery {
        user_id: user.user_id.clone(),
        kind,
        from: format_utc_rfc3339(start_of_day(range.start)),
        to: format_utc_rfc3339(to),
        limit: params.limit,
    };

    let metrics = state
        .db
        .list_metrics(&query)
        .await?
        .into_iter()
        .map(|m| MetricResponse {
            source: m.source,
            kind: m.kind,
            measured_at: m.measured_at,
            value: m.value,
            unit: m.unit,
        })
        .collect();

    Ok(Json(MetricsResponse { metrics }))
}

// ─── Integrations ────────────────────────────────────────────

/// One connected provider. Never includes token material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IntegrationSummary {
    pub provider: String,
    pub display_name: String,
    pub connected_at: String,
    pub updated_at: String,
    pub expires_at: Option<String>,
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IntegrationsResponse {
    pub integrations: Vec<IntegrationSummary>,
}

async fn get_integrations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<IntegrationsResponse>> {
    let mut tokens = state.db.list_tokens(&user.user_id).await?;
    tokens.sort_by_key(|t| t.provider.as_str());

    let integrations = tokens
        .into_iter()
        .map(|t| IntegrationSummary {
            provider: t.provider.as_str().to_string(),
            display_name: t.provider.display_name().to_string(),
            patient_id: t.fhir_patient_id().map(str::to_string),
            connected_at: t.created_at,
            updated_at: t.updated_at,
            expires_at: t.expires_at,
            scope: t.scope,
        })
        .collect();

    Ok(Json(IntegrationsResponse { integrations }))
}
