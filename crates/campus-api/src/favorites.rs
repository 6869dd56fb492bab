use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use campus_db::models::FavoriteRow;
use campus_types::api::{AddFavoriteRequest, Claims, FavoriteStatus};
use campus_types::models::{Favorite, ItemType};

use crate::auth::AppState;
use crate::{parse_timestamp, run_blocking};

fn to_favorite(row: FavoriteRow) -> Option<Favorite> {
    let parsed = (|| {
        Some(Favorite {
            id: row.id.parse().ok()?,
            user_id: row.user_id.parse().ok()?,
            item_type: row.item_type.parse().ok()?,
            item_id: row.item_id.parse().ok()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    })();
    if parsed.is_none() {
        warn!("Skipping corrupt favorite row '{}'", row.id);
    }
    parsed
}

/// GET /favorites: the caller's favorites, newest first.
pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| db.list_favorites(&uid)).await?;
    let favorites: Vec<Favorite> = rows.into_iter().filter_map(to_favorite).collect();
    Ok(Json(favorites))
}

/// POST /favorites: 201 on insert, 409 when the row already exists.
pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddFavoriteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let id = Uuid::new_v4().to_string();
    let uid = claims.sub.to_string();
    let item_type = req.item_type;
    let item_id = req.item_id.to_string();

    let inserted = run_blocking(&state, move |db| {
        db.insert_favorite(&id, &uid, item_type.as_str(), &item_id)
    })
    .await?;

    if !inserted {
        return Err(StatusCode::CONFLICT);
    }
    info!("User {} favorited {} {}", claims.sub, req.item_type, req.item_id);
    Ok((StatusCode::CREATED, Json(FavoriteStatus { favorite: true })))
}

/// GET /favorites/{item_type}/{item_id}
pub async fn favorite_status(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(ItemType, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();
    let favorite = run_blocking(&state, move |db| {
        db.favorite_exists(&uid, item_type.as_str(), &item_id.to_string())
    })
    .await?;
    Ok(Json(FavoriteStatus { favorite }))
}

/// DELETE /favorites/{item_type}/{item_id}: idempotent.
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path((item_type, item_id)): Path<(ItemType, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let uid = claims.sub.to_string();
    let removed = run_blocking(&state, move |db| {
        db.delete_favorite(&uid, item_type.as_str(), &item_id.to_string())
    })
    .await?;
    if removed {
        info!("User {} unfavorited {} {}", claims.sub, item_type, item_id);
    }
    Ok(StatusCode::NO_CONTENT)
}
