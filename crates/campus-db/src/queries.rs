use crate::Database;
use crate::models::{
    FavoriteRow, MembershipChange, MembershipRow, NewClub, NewEvent, NewOffer, NewSector, UserRow,
};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

/// Same shape as the column defaults; timestamps are compared as text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Normalises an RFC 3339 (or zone-less, read as UTC) timestamp to the
/// stored form, so `…T23:59:59Z` and `…T23:59:59.000Z` compare alike.
fn stored_timestamp(value: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
        .with_context(|| format!("invalid timestamp {value:?}"))?;
    Ok(parsed.format(TIMESTAMP_FORMAT).to_string())
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Favorites --

    /// Inserts the favorite unless the `(user, item_type, item_id)` row already
    /// exists. Returns `false` for the duplicate case.
    pub fn insert_favorite(
        &self,
        id: &str,
        user_id: &str,
        item_type: &str,
        item_id: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO favorites (id, user_id, item_type, item_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, user_id, item_type, item_id],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Returns `false` when there was nothing to delete.
    pub fn delete_favorite(&self, user_id: &str, item_type: &str, item_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND item_type = ?2 AND item_id = ?3",
                rusqlite::params![user_id, item_type, item_id],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn favorite_exists(&self, user_id: &str, item_type: &str, item_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM favorites WHERE user_id = ?1 AND item_type = ?2 AND item_id = ?3",
                    rusqlite::params![user_id, item_type, item_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// The user's favorites, newest first.
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, item_type, item_id, created_at FROM favorites
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FavoriteRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        item_type: row.get(2)?,
                        item_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Club memberships --

    /// Activates the `(club, user)` membership: reactivates a row left behind
    /// by an earlier leave, otherwise inserts a fresh one.
    pub fn join_club(&self, id: &str, club_id: &str, user_id: &str) -> Result<MembershipChange> {
        self.with_conn_mut(|conn| {
            let existing: Option<(String, bool)> = conn
                .query_row(
                    "SELECT id, is_active FROM club_memberships WHERE club_id = ?1 AND user_id = ?2",
                    [club_id, user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                Some((_, true)) => Ok(MembershipChange::AlreadyActive),
                Some((existing_id, false)) => {
                    conn.execute(
                        "UPDATE club_memberships
                         SET is_active = 1, joined_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        [&existing_id],
                    )?;
                    Ok(MembershipChange::Reactivated)
                }
                None => {
                    conn.execute(
                        "INSERT INTO club_memberships (id, club_id, user_id) VALUES (?1, ?2, ?3)",
                        [id, club_id, user_id],
                    )?;
                    Ok(MembershipChange::Inserted)
                }
            }
        })
    }

    /// Soft-revokes the membership. Returns `false` when no active row existed.
    pub fn leave_club(&self, club_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE club_memberships SET is_active = 0
                 WHERE club_id = ?1 AND user_id = ?2 AND is_active = 1",
                [club_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn is_member(&self, club_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM club_memberships
                 WHERE club_id = ?1 AND user_id = ?2 AND is_active = 1",
                [club_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Active memberships of the user, most recent first.
    pub fn list_memberships(&self, user_id: &str) -> Result<Vec<MembershipRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, club_id, user_id, joined_at, is_active FROM club_memberships
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY joined_at DESC, id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(MembershipRow {
                        id: row.get(0)?,
                        club_id: row.get(1)?,
                        user_id: row.get(2)?,
                        joined_at: row.get(3)?,
                        is_active: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reference data --

    pub fn insert_sector(&self, sector: &NewSector) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sectors (id, name, description, color, icon)
                 VALUES (?1, ?2, ?3, COALESCE(?4, '#3B82F6'), ?5)",
                rusqlite::params![id, sector.name, sector.description, sector.color, sector.icon],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn insert_offer(&self, offer: &NewOffer) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let created_at = offer.created_at.as_deref().map(stored_timestamp).transpose()?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO offers (id, title, type, location, description, company_name,
                    contract_type, duration, salary_range, rent_price, housing_type,
                    surface_area, furnished, deadline, sector_id, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    COALESCE(?17, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))",
                rusqlite::params![
                    id,
                    offer.title,
                    offer.kind,
                    offer.location,
                    offer.description,
                    offer.company_name,
                    offer.contract_type,
                    offer.duration,
                    offer.salary_range,
                    offer.rent_price,
                    offer.housing_type,
                    offer.surface_area,
                    offer.furnished,
                    offer.deadline,
                    offer.sector_id,
                    offer.is_active,
                    created_at,
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn insert_event(&self, event: &NewEvent) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let date_start = stored_timestamp(&event.date_start)?;
        let date_end = event.date_end.as_deref().map(stored_timestamp).transpose()?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events (id, title, type, location, description, organizer,
                    date_start, date_end, website_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    event.title,
                    event.kind,
                    event.location,
                    event.description,
                    event.organizer,
                    date_start,
                    date_end,
                    event.website_url,
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }

    pub fn insert_club(&self, club: &NewClub) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO student_clubs (id, name, description, campus, type, president, email_contact)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    club.name,
                    club.description,
                    club.campus,
                    club.kind,
                    club.president,
                    club.email_contact,
                ],
            )?;
            Ok(())
        })?;
        Ok(id)
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is one of two literals from this module
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
