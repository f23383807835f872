//! HTTP/REST API layer for bothost.
//!
//! Axum-based REST API at `/api/v1/`. Authentication happens upstream: the
//! front end forwards the authenticated user in the `X-User-Id` header.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
