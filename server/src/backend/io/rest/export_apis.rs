//! # REST API for Data Export
//!
//! Endpoint for downloading every transaction as CSV.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use log::{error, info};
use shared::ErrorResponse;

use crate::backend::AppState;

/// Export transactions as CSV, oldest first
pub async fn export_transactions_csv(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /transactions.csv");

    match state.export_service.export_csv().await {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"transactions.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to export transactions: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("failed to export transactions")),
            )
                .into_response()
        }
    }
}
