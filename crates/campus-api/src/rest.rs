use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, warn};

use campus_types::postgrest;
use campus_types::query::Table;

use crate::auth::AppState;
use crate::run_blocking;

/// Upper bound on rows per request, whatever `limit` asks for.
const MAX_LIMIT: u64 = 100;

fn parse_table(raw: &str) -> Result<Table, StatusCode> {
    raw.parse().map_err(|_| StatusCode::NOT_FOUND)
}

/// GET /rest/{table}: PostgREST-style filters, ordering and window.
/// Rows come back as a JSON array with the total in `Content-Range`.
pub async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, StatusCode> {
    let table = parse_table(&table)?;
    let mut query = postgrest::from_params(table, &params).map_err(|e| {
        warn!("Rejected query on {}: {}", table, e);
        StatusCode::BAD_REQUEST
    })?;
    query.limit = Some(query.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT));

    let offset = query.offset;
    let page = run_blocking(&state, move |db| db.list(&query)).await?;
    debug!("{}: {} rows of {}", table, page.rows.len(), page.total);

    let range = postgrest::content_range(offset, page.rows.len(), page.total);
    Ok(([(header::CONTENT_RANGE, range)], Json(page.rows)))
}

/// GET /rest/{table}/{id}
pub async fn get_row(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let table = parse_table(&table)?;
    let row = run_blocking(&state, move |db| db.get_by_id(table, &id))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(row))
}
