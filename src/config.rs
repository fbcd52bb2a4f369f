// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use chrono::{FixedOffset, Offset, Utc};
use std::env;

/// Which progress store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Firestore,
    /// In-process store; data is lost on restart
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Path to the curriculum JSON file
    pub curriculum_path: String,
    /// Offset used to decide which calendar day "today" is for streaks
    pub streak_utc_offset_minutes: i32,
    pub store: StoreKind,

    // --- Secrets ---
    /// JWT signing key shared with the identity provider (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            curriculum_path: "data/curriculum.json".to_string(),
            streak_utc_offset_minutes: 0,
            store: StoreKind::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let streak_utc_offset_minutes = match env::var("STREAK_UTC_OFFSET_MINUTES") {
            Ok(raw) => parse_offset_minutes(&raw)?,
            Err(_) => 0,
        };

        let store = match env::var("STORE").as_deref() {
            Ok("memory") => StoreKind::Memory,
            Ok("firestore") | Err(_) => StoreKind::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE")),
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            curriculum_path: env::var("CURRICULUM_PATH")
                .unwrap_or_else(|_| "data/curriculum.json".to_string()),
            streak_utc_offset_minutes,
            store,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Timezone used for calendar-day arithmetic.
    pub fn learner_timezone(&self) -> FixedOffset {
        // Validated at load time; falls back to UTC for hand-built configs.
        self.streak_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn parse_offset_minutes(raw: &str) -> Result<i32, ConfigError> {
    let minutes: i32 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid("STREAK_UTC_OFFSET_MINUTES"))?;
    if minutes.checked_mul(60).and_then(FixedOffset::east_opt).is_none() {
        return Err(ConfigError::Invalid("STREAK_UTC_OFFSET_MINUTES"));
    }
    Ok(minutes)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
