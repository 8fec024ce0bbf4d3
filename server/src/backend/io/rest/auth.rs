//! Session cookie parsing and the elevated-session gate.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use log::warn;
use shared::ErrorResponse;

use crate::backend::domain::Session;
use crate::backend::AppState;

pub const SESSION_COOKIE: &str = "sid";

/// Value of the `sid` cookie, if the request carries one
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    session_id(headers).and_then(|id| state.sessions.get(&id))
}

/// Allow the request through only for an elevated session.
///
/// Without a configured admin secret every request passes.
pub fn require_elevated(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if state.admin_secret.is_none() {
        return Ok(());
    }

    match current_session(state, headers) {
        Some(session) if session.elevated => Ok(()),
        Some(_) => {
            warn!("Rejected write from a non-elevated session");
            Err((
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("elevated session required")),
            )
                .into_response())
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("login required")),
        )
            .into_response()),
    }
}

pub fn session_cookie(id: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; HttpOnly; SameSite=Lax; Path=/"
    ))
    .ok()
}

pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("sid=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sid=abc123; lang=en"));
        assert_eq!(session_id(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_or_empty_sid() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sid=; other=1"));
        assert_eq!(session_id(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sidx=zzz"));
        assert_eq!(session_id(&headers), None);
    }
}
