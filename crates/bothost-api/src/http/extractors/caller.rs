//! Caller extractor.
//!
//! Reads the user id forwarded by the front end in `X-User-Id` and resolves
//! it against the configured administrator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use bothost_types::identity::{Caller, UserId};

use crate::http::error::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The resolved caller of a request.
pub struct CurrentCaller(pub Caller);

impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header encoding".to_string()))?;

        let user: UserId = raw
            .parse()
            .map_err(|_| AppError::Unauthorized(format!("Invalid user id '{raw}'")))?;

        Ok(CurrentCaller(state.caller(user)))
    }
}
