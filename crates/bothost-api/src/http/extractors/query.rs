//! Query parameter types.

use serde::Deserialize;

/// Query parameters for `GET /api/v1/activity`.
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Restrict to one user. Omitted means the caller, or everyone for the admin.
    pub user: Option<i64>,

    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}
