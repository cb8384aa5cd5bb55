// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Health-Sync: pull wearable and EHR data into one metric store
//!
//! This crate provides the backend API that connects a user's Oura, Garmin
//! and FHIR accounts and normalizes their daily sleep, steps and heart rate
//! records into `HealthMetric` rows.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SharedStore;
use services::{OAuthService, SyncService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SharedStore,
    pub sync_service: SyncService,
    pub oauth_service: OAuthService,
}

impl AppState {
    /// Wire the services for `config` on top of `db`.
    pub fn new(config: Config, db: SharedStore) -> Self {
        let sync_service =
            SyncService::new(config.providers.clone(), config.sync_mode, db.clone());
        let oauth_service = OAuthService::new(
            config.providers.clone(),
            config.oauth_state_key.clone(),
            &config.api_url,
            db.clone(),
        );
        Self {
            config,
            db,
            sync_service,
            oauth_service,
        }
    }
}
