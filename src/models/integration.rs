// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connected provider accounts and their OAuth tokens.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metadata key under which the FHIR routine caches the resolved patient id.
pub const FHIR_PATIENT_ID_KEY: &str = "patientId";

/// External wearable / EHR data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Oura,
    Garmin,
    Fhir,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Oura, Provider::Garmin, Provider::Fhir];

    /// Lowercase name, used as the metric `source` and in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Oura => "oura",
            Provider::Garmin => "garmin",
            Provider::Fhir => "fhir",
        }
    }

    /// Human-readable name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Oura => "Oura",
            Provider::Garmin => "Garmin",
            Provider::Fhir => "FHIR",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown provider: {}", s)))
    }
}

/// OAuth token for one (user, provider) pair.
///
/// Written by the OAuth callback. Sync routines only read it, except that the
/// FHIR routine caches the resolved patient id in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationToken {
    pub user_id: String,
    pub provider: Provider,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token expires (RFC3339), if the provider said
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Granted OAuth scope string
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

impl IntegrationToken {
    /// Firestore document id for a (user, provider) pair.
    pub fn document_id(user_id: &str, provider: Provider) -> String {
        format!("{}_{}", urlencoding::encode(user_id), provider.as_str())
    }

    /// Cached FHIR patient id, if a previous sync resolved one.
    pub fn fhir_patient_id(&self) -> Option<&str> {
        self.metadata
            .get(FHIR_PATIENT_ID_KEY)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}
