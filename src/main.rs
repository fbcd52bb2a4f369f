// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lingo-Progress API Server
//!
//! Tracks learner progress through a listening course and awards streaks,
//! diamond tiers and badges.

use lingo_progress::{
    config::{Config, StoreKind},
    db::{FirestoreDb, MemoryStore, ProgressStore},
    routes::create_router,
    services::CurriculumService,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        store = ?config.store,
        utc_offset_minutes = config.streak_utc_offset_minutes,
        "Starting Lingo-Progress API"
    );

    // Load the curriculum
    tracing::info!(path = %config.curriculum_path, "Loading curriculum");
    let curriculum = CurriculumService::load_from_file(&config.curriculum_path)?;

    match config.store {
        StoreKind::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            serve(config, db, curriculum).await
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; progress is lost on restart");
            serve(config, MemoryStore::new(), curriculum).await
        }
    }
}

async fn serve<S: ProgressStore>(
    config: Config,
    store: S,
    curriculum: CurriculumService,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    // Build shared state and router
    let state = Arc::new(AppState::new(config, store, curriculum));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lingo_progress=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
