pub mod auth;
pub mod clubs;
pub mod favorites;
pub mod middleware;
pub mod rest;

use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::error;

use campus_db::Database;

pub use auth::{AppState, AppStateInner};

/// Public reads and auth, plus the token-guarded favorite and membership routes.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/rest/{table}", get(rest::list_rows))
        .route("/rest/{table}/{id}", get(rest::get_row));

    let protected_routes = Router::new()
        .route(
            "/favorites",
            get(favorites::list_favorites).post(favorites::add_favorite),
        )
        .route(
            "/favorites/{item_type}/{item_id}",
            get(favorites::favorite_status).delete(favorites::remove_favorite),
        )
        .route("/memberships", get(clubs::list_memberships))
        .route(
            "/clubs/{club_id}/membership",
            get(clubs::membership_status)
                .post(clubs::join_club)
                .delete(clubs::leave_club),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Runs blocking DB work off the async runtime.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("DB error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Store timestamps are RFC 3339; older rows may carry SQLite's
/// `YYYY-MM-DD HH:MM:SS` form.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}
