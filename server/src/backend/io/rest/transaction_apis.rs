//! # REST API for Transactions
//!
//! Endpoints for listing transactions and bulk-replacing the stored set.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use log::{error, info, warn};
use shared::{ErrorResponse, SaveTransactionsRequest, StatusResponse, TransactionListResponse};

use crate::backend::domain::diagnostics::write_failed_save_dump;
use crate::backend::domain::SaveError;
use crate::backend::io::rest::auth::require_elevated;
use crate::backend::io::rest::mappers::transaction_mapper::TransactionMapper;
use crate::backend::AppState;

/// List all transactions, most recent first
pub async fn list_transactions(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /transactions");

    match state.transaction_service.list().await {
        Ok(records) => {
            let response = TransactionListResponse {
                transactions: TransactionMapper::to_dto_list(records),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to list transactions: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_detail("failed to load transactions", format!("{:#}", e))),
            )
                .into_response()
        }
    }
}

/// Replace every stored transaction with the submitted list
pub async fn save_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SaveTransactionsRequest>, JsonRejection>,
) -> impl IntoResponse {
    info!("POST /transactions");

    if let Err(rejection) = require_elevated(&state, &headers) {
        return rejection;
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Malformed save request: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_detail("malformed JSON body", rejection.body_text())),
            )
                .into_response();
        }
    };

    match state.transaction_service.replace_all(&request.transactions).await {
        Ok(receipt) => {
            info!("Saved transactions: {:?}", receipt.summary);
            (StatusCode::OK, Json(StatusResponse::ok())).into_response()
        }
        Err(e @ (SaveError::NotAList | SaveError::EmptySaveRefused { .. })) => {
            warn!("Save rejected: {}", e);
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        Err(SaveError::Storage(e)) => {
            let detail = format!("{:#}", e);
            error!("Save failed: {}", detail);
            match write_failed_save_dump(&state.failed_saves_dir, &detail, &request.transactions) {
                Ok(path) => info!("Failed save payload written to {}", path.display()),
                Err(dump_err) => warn!("Could not write failed-save dump: {:#}", dump_err),
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_detail("failed to save transactions", detail)),
            )
                .into_response()
        }
    }
}
