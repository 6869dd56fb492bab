/// Database row types: these map directly to SQLite rows.
/// Listing reads go through `listing` and come back as JSON objects instead.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct FavoriteRow {
    pub id: String,
    pub user_id: String,
    pub item_type: String,
    pub item_id: String,
    pub created_at: String,
}

pub struct MembershipRow {
    pub id: String,
    pub club_id: String,
    pub user_id: String,
    pub joined_at: String,
    pub is_active: bool,
}

/// What `join_club` did to the `(club, user)` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Inserted,
    Reactivated,
    AlreadyActive,
}

// -- Reference data writes (seeding and fixtures) --

#[derive(Debug, Clone, Default)]
pub struct NewSector {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewOffer {
    pub title: String,
    /// `stage`, `job` or `logement`.
    pub kind: String,
    pub location: String,
    pub description: String,
    pub company_name: Option<String>,
    pub contract_type: Option<String>,
    pub duration: Option<String>,
    pub salary_range: Option<String>,
    pub rent_price: Option<i64>,
    pub housing_type: Option<String>,
    pub surface_area: Option<i64>,
    pub furnished: Option<bool>,
    pub deadline: Option<String>,
    pub sector_id: Option<String>,
    pub is_active: bool,
    /// RFC 3339 with milliseconds; defaults to now.
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: String,
    /// `salon`, `jpo`, `conference` or `atelier`.
    pub kind: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub date_start: String,
    pub date_end: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewClub {
    pub name: String,
    pub description: Option<String>,
    pub campus: String,
    pub kind: String,
    pub president: Option<String>,
    pub email_contact: Option<String>,
}
