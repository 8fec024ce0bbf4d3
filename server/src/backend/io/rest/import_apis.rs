//! # REST API for CSV Import

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use log::{error, info, warn};
use serde::Deserialize;
use shared::{ErrorResponse, ImportResponse, ImportSkippedResponse};

use crate::backend::domain::{ImportError, ImportOutcome};
use crate::backend::io::rest::auth::require_elevated;
use crate::backend::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub force: bool,
}

/// Seed the store from the configured CSV file, once
pub async fn import_csv_once(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ImportQuery>,
) -> impl IntoResponse {
    info!("POST /import-csv-once - force: {}", query.force);

    if let Err(rejection) = require_elevated(&state, &headers) {
        return rejection;
    }

    match state.import_service.import_once(query.force).await {
        Ok(ImportOutcome::Imported { imported }) => {
            (StatusCode::OK, Json(ImportResponse { imported })).into_response()
        }
        Ok(ImportOutcome::Skipped { reason }) => (
            StatusCode::CONFLICT,
            Json(ImportSkippedResponse {
                skipped: true,
                reason,
            }),
        )
            .into_response(),
        Err(e @ ImportError::MissingFile(_)) => {
            warn!("{}", e);
            (StatusCode::NOT_FOUND, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        Err(e @ ImportError::Csv(_)) => {
            warn!("{}", e);
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        Err(e @ ImportError::Storage(_)) => {
            error!("{}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_detail("import failed", e.to_string())),
            )
                .into_response()
        }
    }
}
