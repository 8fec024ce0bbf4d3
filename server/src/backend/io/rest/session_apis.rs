//! # REST API for Sessions
//!
//! A shared admin secret elevates a session. The session id travels in the
//! `sid` cookie.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use log::{info, warn};
use shared::{ErrorResponse, LoginRequest, SessionResponse, StatusResponse};

use crate::backend::io::rest::auth::{
    current_session as lookup_session, expired_session_cookie, session_cookie, session_id,
};
use crate::backend::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    info!("POST /login");

    let elevated = match &state.admin_secret {
        Some(secret) => request.secret == *secret,
        None => true,
    };
    if !elevated {
        warn!("Login with a wrong secret; issuing a read-only session");
    }

    state.sessions.purge_expired();
    let session = state.sessions.create(elevated);
    let Some(cookie) = session_cookie(&session.id) else {
        state.sessions.remove(&session.id);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("could not issue session cookie")),
        )
            .into_response();
    };

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            authenticated: true,
            elevated,
        }),
    )
        .into_response()
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    info!("POST /logout");

    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id);
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(StatusResponse::ok()),
    )
}

pub async fn current_session(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let response = match lookup_session(&state, &headers) {
        Some(session) => SessionResponse {
            authenticated: true,
            elevated: session.elevated,
        },
        None => SessionResponse {
            authenticated: false,
            elevated: state.admin_secret.is_none(),
        },
    };
    (StatusCode::OK, Json(response))
}
