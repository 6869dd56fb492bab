use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ItemType;

// -- JWT Claims --

/// Claims carried by the bearer token. The store trusts `sub` as the caller's
/// user id for every row-level check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Favorites --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddFavoriteRequest {
    pub item_type: ItemType,
    pub item_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub favorite: bool,
}

// -- Memberships --

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipStatus {
    pub member: bool,
}
