//! # REST API Interface Layer
//!
//! Axum handlers for the finance tracker. Every handler follows the same shape:
//! extract, call one domain service, map the result to `(StatusCode, Json(..))`.
//! Errors always use the shared `ErrorResponse` body.

pub mod auth;
pub mod debug_apis;
pub mod export_apis;
pub mod import_apis;
pub mod mappers;
pub mod session_apis;
pub mod transaction_apis;

pub use debug_apis::*;
pub use export_apis::*;
pub use import_apis::*;
pub use session_apis::*;
pub use transaction_apis::*;
