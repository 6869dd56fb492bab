use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use campus_db::Database;
use campus_db::models::FavoriteRow;
use campus_types::models::{Favorite, FavoriteKey};
use campus_types::query::{ListQuery, Page, Table};

use super::{Gateway, Row};
use crate::error::GatewayError;
use crate::session::Identity;

/// Gateway over an in-process database. The identity is trusted as given;
/// there is no token check on this path.
#[derive(Clone)]
pub struct LocalGateway {
    db: Arc<Database>,
}

impl LocalGateway {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                GatewayError::Store(e.to_string())
            })?
            .map_err(GatewayError::from)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}

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

#[async_trait]
impl Gateway for LocalGateway {
    async fn select(&self, query: &ListQuery) -> Result<Page<Row>, GatewayError> {
        query.validate()?;
        let query = query.clone();
        self.run(move |db| db.list(&query)).await
    }

    async fn select_one(&self, table: Table, id: Uuid) -> Result<Option<Row>, GatewayError> {
        self.run(move |db| db.get_by_id(table, &id.to_string())).await
    }

    async fn insert_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        let uid = identity.user_id.to_string();
        let inserted = self
            .run(move |db| {
                db.insert_favorite(
                    &Uuid::new_v4().to_string(),
                    &uid,
                    key.item_type.as_str(),
                    &key.item_id.to_string(),
                )
            })
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(GatewayError::Duplicate)
        }
    }

    async fn delete_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        let uid = identity.user_id.to_string();
        let removed = self
            .run(move |db| db.delete_favorite(&uid, key.item_type.as_str(), &key.item_id.to_string()))
            .await?;
        if !removed {
            debug!("Favorite {} {} was already gone", key.item_type, key.item_id);
        }
        Ok(())
    }

    async fn favorite_exists(&self, identity: &Identity, key: FavoriteKey) -> Result<bool, GatewayError> {
        let uid = identity.user_id.to_string();
        self.run(move |db| db.favorite_exists(&uid, key.item_type.as_str(), &key.item_id.to_string()))
            .await
    }

    async fn list_favorites(&self, identity: &Identity) -> Result<Vec<Favorite>, GatewayError> {
        let uid = identity.user_id.to_string();
        let rows = self.run(move |db| db.list_favorites(&uid)).await?;
        Ok(rows.into_iter().filter_map(to_favorite).collect())
    }

    async fn join_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        let uid = identity.user_id.to_string();
        let joined = self
            .run(move |db| {
                let cid = club_id.to_string();
                let active = db
                    .get_by_id(Table::StudentClubs, &cid)?
                    .and_then(|club| club.get("is_active").and_then(|v| v.as_bool()))
                    .unwrap_or(false);
                if !active {
                    return Ok(None);
                }
                db.join_club(&Uuid::new_v4().to_string(), &cid, &uid).map(Some)
            })
            .await?;
        match joined {
            Some(change) => {
                debug!("Membership of {} in {}: {:?}", identity.user_id, club_id, change);
                Ok(())
            }
            None => Err(GatewayError::NotFound),
        }
    }

    async fn leave_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        let uid = identity.user_id.to_string();
        self.run(move |db| db.leave_club(&club_id.to_string(), &uid))
            .await
            .map(|_| ())
    }

    async fn is_member(&self, identity: &Identity, club_id: Uuid) -> Result<bool, GatewayError> {
        let uid = identity.user_id.to_string();
        self.run(move |db| db.is_member(&club_id.to_string(), &uid)).await
    }
}
