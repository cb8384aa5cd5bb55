// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization of `{ data: [{ day, <field> }] }` daily summary responses.
//!
//! Oura and Garmin both return one record per day in this shape; only the
//! value field name, unit and scale differ per category.

use crate::error::Result;
use crate::models::MetricKind;
use crate::services::sync::{NormalizedRecord, RecordFilter};
use crate::time_utils::start_of_day;
use chrono::NaiveDate;
use serde_json::Value;

/// One daily data category of a provider API.
#[derive(Debug, Clone, Copy)]
pub struct DailyCategory {
    pub kind: MetricKind,
    /// Name of the numeric field in each record
    pub value_field: &'static str,
    pub unit: &'static str,
    /// Multiplier applied to the raw value (e.g. seconds to hours)
    pub scale: f64,
}

/// Append the records of one daily response body to `out`.
///
/// Records whose `day` or value field is missing, null or unparseable go
/// through `filter`. A body without a `data` array counts as one rejected
/// record so strict mode surfaces error documents.
pub fn normalize_daily(
    body: &Value,
    category: &DailyCategory,
    filter: &mut RecordFilter,
    out: &mut Vec<NormalizedRecord>,
) -> Result<()> {
    let Some(records) = body.get("data").and_then(Value::as_array) else {
        return filter.reject("response has no data array", body);
    };

    for record in records {
        let day = record
            .get("day")
            .and_then(Value::as_str)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let Some(day) = day else {
            filter.reject("missing day", record)?;
            continue;
        };

        let Some(value) = record.get(category.value_field).and_then(Value::as_f64) else {
            filter.reject(category.value_field, record)?;
            continue;
        };

        out.push(NormalizedRecord {
            kind: category.kind,
            measured_at: start_of_day(day),
            value: value * category.scale,
            unit: category.unit.to_string(),
            raw: record.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::Provider;
    use crate::services::sync::SyncMode;
    use serde_json::json;

    const SLEEP: DailyCategory = DailyCategory {
        kind: MetricKind::Sleep,
        value_field: "total_sleep_duration",
        unit: "hours",
        scale: 1.0 / 3600.0,
    };

    #[test]
    fn test_sleep_seconds_become_hours() {
        let body = json!({"data": [{"day": "2024-01-01", "total_sleep_duration": 25200}]});
        let mut filter = RecordFilter::new(Provider::Oura, SyncMode::Lenient);
        let mut out = Vec::new();

        normalize_daily(&body, &SLEEP, &mut filter, &mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, MetricKind::Sleep);
        assert_eq!(out[0].value, 7.0);
        assert_eq!(out[0].unit, "hours");
        assert_eq!(out[0].measured_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_null_fields_are_skipped() {
        let body = json!({"data": [
            {"day": "2024-01-01", "total_sleep_duration": null},
            {"day": null, "total_sleep_duration": 3600},
            {"total_sleep_duration": 3600},
            {"day": "not-a-day", "total_sleep_duration": 3600},
            {"day": "2024-01-02", "total_sleep_duration": 3600}
        ]});
        let mut filter = RecordFilter::new(Provider::Oura, SyncMode::Lenient);
        let mut out = Vec::new();

        normalize_daily(&body, &SLEEP, &mut filter, &mut out).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 1.0);
        assert_eq!(filter.skipped(), 4);
    }

    #[test]
    fn test_error_body_yields_nothing_when_lenient() {
        let body = json!({"detail": "Unauthorized"});
        let mut filter = RecordFilter::new(Provider::Oura, SyncMode::Lenient);
        let mut out = Vec::new();

        normalize_daily(&body, &SLEEP, &mut filter, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_strict_mode_fails_on_missing_value() {
        let body = json!({"data": [{"day": "2024-01-01"}]});
        let mut filter = RecordFilter::new(Provider::Oura, SyncMode::Strict);
        let mut out = Vec::new();

        let err = normalize_daily(&body, &SLEEP, &mut filter, &mut out).unwrap_err();
        assert!(matches!(err, AppError::InvalidRecord(_)));
    }
}
