//! # IO Module
//!
//! The interface layer between HTTP clients and the domain services. Handlers
//! translate requests into service calls and domain results into status codes
//! and JSON bodies; they hold no business rules of their own.
//!
//! ## Supported Operations
//!
//! - **GET /transactions**: newest-first list
//! - **POST /transactions**: bulk replace (elevated session)
//! - **GET /transactions.csv**: chronological CSV export
//! - **POST /import-csv-once**: one-time CSV seed
//! - **GET /debug/db-info**, **GET /health**: diagnostics
//! - **POST /login**, **POST /logout**, **GET /session**: session handling

pub mod rest;

pub use rest::*;
