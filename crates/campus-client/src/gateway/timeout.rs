use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use campus_types::models::{Favorite, FavoriteKey};
use campus_types::query::{ListQuery, Page, Table};

use super::{Gateway, Row};
use crate::error::GatewayError;
use crate::session::Identity;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounds every call of the wrapped gateway. On expiry the in-flight
/// future is dropped and the caller gets [`GatewayError::Timeout`].
pub struct TimeoutGateway<G> {
    inner: G,
    limit: Duration,
}

impl<G: Gateway> TimeoutGateway<G> {
    pub fn new(inner: G, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn with_default(inner: G) -> Self {
        Self::new(inner, DEFAULT_TIMEOUT)
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, GatewayError>> + Send,
    ) -> Result<T, GatewayError> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Gateway {} timed out after {:?}", op, self.limit);
                Err(GatewayError::Timeout(self.limit))
            }
        }
    }
}

#[async_trait]
impl<G: Gateway> Gateway for TimeoutGateway<G> {
    async fn select(&self, query: &ListQuery) -> Result<Page<Row>, GatewayError> {
        self.bounded("select", self.inner.select(query)).await
    }

    async fn select_one(&self, table: Table, id: Uuid) -> Result<Option<Row>, GatewayError> {
        self.bounded("select_one", self.inner.select_one(table, id)).await
    }

    async fn insert_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        self.bounded("insert_favorite", self.inner.insert_favorite(identity, key))
            .await
    }

    async fn delete_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        self.bounded("delete_favorite", self.inner.delete_favorite(identity, key))
            .await
    }

    async fn favorite_exists(&self, identity: &Identity, key: FavoriteKey) -> Result<bool, GatewayError> {
        self.bounded("favorite_exists", self.inner.favorite_exists(identity, key))
            .await
    }

    async fn list_favorites(&self, identity: &Identity) -> Result<Vec<Favorite>, GatewayError> {
        self.bounded("list_favorites", self.inner.list_favorites(identity))
            .await
    }

    async fn join_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        self.bounded("join_club", self.inner.join_club(identity, club_id))
            .await
    }

    async fn leave_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        self.bounded("leave_club", self.inner.leave_club(identity, club_id))
            .await
    }

    async fn is_member(&self, identity: &Identity, club_id: Uuid) -> Result<bool, GatewayError> {
        self.bounded("is_member", self.inner.is_member(identity, club_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::LocalGateway;
    use std::sync::Arc;

    /// Never answers reads.
    struct Hung;

    #[async_trait]
    impl Gateway for Hung {
        async fn select(&self, _: &ListQuery) -> Result<Page<Row>, GatewayError> {
            std::future::pending().await
        }
        async fn select_one(&self, _: Table, _: Uuid) -> Result<Option<Row>, GatewayError> {
            std::future::pending().await
        }
        async fn insert_favorite(&self, _: &Identity, _: FavoriteKey) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn delete_favorite(&self, _: &Identity, _: FavoriteKey) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn favorite_exists(&self, _: &Identity, _: FavoriteKey) -> Result<bool, GatewayError> {
            Ok(false)
        }
        async fn list_favorites(&self, _: &Identity) -> Result<Vec<Favorite>, GatewayError> {
            Ok(Vec::new())
        }
        async fn join_club(&self, _: &Identity, _: Uuid) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn leave_club(&self, _: &Identity, _: Uuid) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn is_member(&self, _: &Identity, _: Uuid) -> Result<bool, GatewayError> {
            Ok(false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_read_becomes_timeout() {
        let gateway = TimeoutGateway::new(Hung, Duration::from_secs(10));
        let err = gateway
            .select(&ListQuery::new(Table::Offers))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Timeout(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let db = Arc::new(campus_db::Database::open_in_memory().unwrap());
        let gateway = TimeoutGateway::with_default(LocalGateway::new(db));
        let page = gateway.select(&ListQuery::new(Table::Sectors)).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
