//! REST API client module for the portfolio content backend.
//!
//! This module provides the `ApiClient` for fetching project and skill
//! content. Endpoints are public and unauthenticated; every response uses
//! a `{ success, data, error? }` envelope.
//!
//! Failures surface as `ApiError` so callers can classify them, but the
//! retry/fallback machinery treats all of them as transient.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
