// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod daily;
pub mod fhir;
pub mod garmin;
pub mod http;
pub mod oauth;
pub mod oura;
pub mod sync;

pub use fhir::{classify_observation, FhirAdapter};
pub use garmin::GarminAdapter;
pub use http::ProviderHttp;
pub use oauth::{OAuthService, OAuthState};
pub use oura::OuraAdapter;
pub use sync::{
    DateRange, NormalizedRecord, PullAdapter, PullBatch, RecordFilter, SyncMode, SyncReport,
    SyncService,
};
