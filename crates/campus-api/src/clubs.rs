use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use campus_db::models::{MembershipChange, MembershipRow};
use campus_types::api::{Claims, MembershipStatus};
use campus_types::models::ClubMembership;
use campus_types::query::Table;

use crate::auth::AppState;
use crate::{parse_timestamp, run_blocking};

fn to_membership(row: MembershipRow) -> Option<ClubMembership> {
    let parsed = (|| {
        Some(ClubMembership {
            id: row.id.parse().ok()?,
            club_id: row.club_id.parse().ok()?,
            user_id: row.user_id.parse().ok()?,
            joined_at: parse_timestamp(&row.joined_at)?,
            is_active: row.is_active,
        })
    })();
    if parsed.is_none() {
        warn!("Skipping corrupt membership row '{}'", row.id);
    }
    parsed
}

/// GET /memberships: the caller's active memberships.
pub async fn list_memberships(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| db.list_memberships(&uid)).await?;
    let memberships: Vec<ClubMembership> = rows.into_iter().filter_map(to_membership).collect();
    Ok(Json(memberships))
}

/// GET /clubs/{club_id}/membership
pub async fn membership_status(
    State(state): State<AppState>,
    Path(club_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();
    let member =
        run_blocking(&state, move |db| db.is_member(&club_id.to_string(), &uid)).await?;
    Ok(Json(MembershipStatus { member }))
}

/// POST /clubs/{club_id}/membership: joins, reactivating a previous
/// membership when one exists.
pub async fn join_club(
    State(state): State<AppState>,
    Path(club_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let cid = club_id.to_string();
    let uid = claims.sub.to_string();

    let change = run_blocking(&state, move |db| {
        let club = db.get_by_id(Table::StudentClubs, &cid)?;
        let active = club
            .as_ref()
            .and_then(|c| c.get("is_active"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !active {
            return Ok(None);
        }
        db.join_club(&Uuid::new_v4().to_string(), &cid, &uid).map(Some)
    })
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;

    match change {
        MembershipChange::Inserted => info!("User {} joined club {}", claims.sub, club_id),
        MembershipChange::Reactivated => info!("User {} rejoined club {}", claims.sub, club_id),
        MembershipChange::AlreadyActive => {}
    }
    Ok(Json(MembershipStatus { member: true }))
}

/// DELETE /clubs/{club_id}/membership: soft leave, idempotent.
pub async fn leave_club(
    State(state): State<AppState>,
    Path(club_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let uid = claims.sub.to_string();
    let left = run_blocking(&state, move |db| db.leave_club(&club_id.to_string(), &uid)).await?;
    if left {
        info!("User {} left club {}", claims.sub, club_id);
    }
    Ok(StatusCode::NO_CONTENT)
}
