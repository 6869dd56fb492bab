//! The boundary to the hosted store. Components only ever talk to a
//! `dyn Gateway`; adapters decide whether that means HTTP or an in-process
//! database.

mod http;
mod local;
mod timeout;

pub use http::HttpGateway;
pub use local::LocalGateway;
pub use timeout::TimeoutGateway;

use async_trait::async_trait;
use uuid::Uuid;

use campus_types::models::{Favorite, FavoriteKey, Record};
use campus_types::query::{ListQuery, Page, Table};

use crate::error::GatewayError;
use crate::session::Identity;

/// One row as the store returns it: a JSON object keyed by column.
pub type Row = serde_json::Value;

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Counted, windowed read.
    async fn select(&self, query: &ListQuery) -> Result<Page<Row>, GatewayError>;

    async fn select_one(&self, table: Table, id: Uuid) -> Result<Option<Row>, GatewayError>;

    /// Fails with [`GatewayError::Duplicate`] when the favorite already exists.
    async fn insert_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError>;

    /// Succeeds whether or not the favorite existed.
    async fn delete_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError>;

    async fn favorite_exists(&self, identity: &Identity, key: FavoriteKey) -> Result<bool, GatewayError>;

    async fn list_favorites(&self, identity: &Identity) -> Result<Vec<Favorite>, GatewayError>;

    /// Reactivates a previous membership when one exists.
    async fn join_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError>;

    async fn leave_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError>;

    async fn is_member(&self, identity: &Identity, club_id: Uuid) -> Result<bool, GatewayError>;
}

pub fn decode_row<R: Record>(row: Row) -> Result<R, GatewayError> {
    Ok(serde_json::from_value(row)?)
}

/// Decodes a whole page or fails; never yields a partial page.
pub fn decode_page<R: Record>(page: Page<Row>) -> Result<Page<R>, GatewayError> {
    page.try_map(decode_row)
}

/// Typed read of one page.
pub async fn select_records<R: Record>(
    gateway: &dyn Gateway,
    query: &ListQuery,
) -> Result<Page<R>, GatewayError> {
    decode_page(gateway.select(query).await?)
}
