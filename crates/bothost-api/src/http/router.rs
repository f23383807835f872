//! Axum router configuration with middleware.
//!
//! API routes live under `/api/v1/`; `/health` sits at the root.
//! Middleware: CORS, tracing, upload body limit.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Headroom above `max_file_size` so oversized uploads reach the service and
/// get its error instead of a bare 413.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.config().max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    let api_routes = Router::new()
        .route("/status", get(handlers::status::my_status))
        .route("/processes", get(handlers::status::processes))
        .route("/activity", get(handlers::status::activity))
        // Bots
        .route("/users/{owner}/bots", get(handlers::bot::list_bots))
        .route(
            "/users/{owner}/bots/{name}",
            put(handlers::bot::upload_bot).delete(handlers::bot::delete_bot),
        )
        .route(
            "/users/{owner}/bots/{name}/start",
            post(handlers::bot::start_bot),
        )
        .route(
            "/users/{owner}/bots/{name}/stop",
            post(handlers::bot::stop_bot),
        )
        .route(
            "/users/{owner}/bots/{name}/restart",
            post(handlers::bot::restart_bot),
        )
        .route(
            "/users/{owner}/bots/{name}/source",
            get(handlers::bot::download_source).put(handlers::bot::edit_source),
        )
        // Admin
        .route("/admin/stats", get(handlers::admin::stats))
        .route("/admin/stop-all", post(handlers::admin::stop_all))
        .route("/admin/restart-all", post(handlers::admin::restart_all))
        .route("/admin/quotas", get(handlers::admin::list_quotas))
        .route("/admin/quotas/{user}", put(handlers::admin::set_quota));

    Router::new()
        .route("/health", get(handlers::status::health))
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
