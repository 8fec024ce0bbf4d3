//! # REST API for Diagnostics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use log::{error, info};
use shared::{DbInfoResponse, ErrorResponse, HealthResponse};

use crate::backend::AppState;

/// Active driver, database file details, row count and background failures
pub async fn db_info(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /debug/db-info");

    let row_count = match state.transaction_service.count().await {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to count transactions: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_detail("failed to read database info", format!("{:#}", e))),
            )
                .into_response();
        }
    };

    let db_file = state.engine.file_path().map(|p| p.to_path_buf());
    let metadata = match &db_file {
        Some(path) => tokio::fs::metadata(path).await.ok(),
        None => None,
    };

    let response = DbInfoResponse {
        driver: state.engine.kind().driver_name().to_string(),
        db_file: db_file.map(|p| p.display().to_string()),
        row_count,
        file_size_bytes: metadata.as_ref().map(|m| m.len()),
        mtime: metadata
            .and_then(|m| m.modified().ok())
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339()),
        background_failures: state.background.failure_count(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let driver = state.engine.kind().driver_name().to_string();
    match state.engine.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                driver,
            }),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    driver,
                }),
            )
        }
    }
}
