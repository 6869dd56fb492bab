//! Single-record detail views. Opening a record supersedes any load still in
//! flight, and closing invalidates it, so a late answer never reopens a view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use campus_types::models::Record;

use crate::error::GatewayError;
use crate::fetcher::FetchOutcome;
use crate::gateway::{Gateway, decode_row};

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState<R> {
    Closed,
    Loading(Uuid),
    Loaded(R),
    NotFound(Uuid),
    Failed { id: Uuid, error: GatewayError },
}

/// Loads one full record for the detail modal while it is open.
pub struct DetailLoader<R: Record + Clone> {
    gateway: Arc<dyn Gateway>,
    generation: AtomicU64,
    state: watch::Sender<DetailState<R>>,
    open_id: Mutex<Option<Uuid>>,
}

impl<R: Record + Clone> DetailLoader<R> {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(DetailState::Closed);
        Self {
            gateway,
            generation: AtomicU64::new(0),
            state,
            open_id: Mutex::new(None),
        }
    }

    pub fn state(&self) -> DetailState<R> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState<R>> {
        self.state.subscribe()
    }

    /// Opens on `id`, replacing whatever was shown.
    pub async fn open(&self, id: Uuid) -> FetchOutcome {
        *self.open_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = DetailState::Loading(id);
        });

        let next = match self.gateway.select_one(R::TABLE, id).await {
            Ok(Some(row)) => match decode_row::<R>(row) {
                Ok(record) => DetailState::Loaded(record),
                Err(error) => DetailState::Failed { id, error },
            },
            Ok(None) => DetailState::NotFound(id),
            Err(error) => DetailState::Failed { id, error },
        };
        if let DetailState::Failed { error, .. } = &next {
            warn!("Loading {} {} failed: {}", R::TABLE, id, error);
        }

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        });
        if applied {
            FetchOutcome::Applied
        } else {
            debug!("Discarded stale {} detail {}", R::TABLE, id);
            FetchOutcome::Superseded
        }
    }

    /// Clears the record; a load still in flight is ignored when it lands.
    pub fn close(&self) {
        *self.open_id.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = DetailState::Closed;
        });
    }

    /// Reloads the open record after a failure.
    pub async fn retry(&self) -> Option<FetchOutcome> {
        let id = (*self.open_id.lock().unwrap_or_else(PoisonError::into_inner))?;
        if !matches!(self.state(), DetailState::Failed { .. }) {
            return None;
        }
        Some(self.open(id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGateway, offer_row, wait_for_calls};
    use campus_types::models::Offer;

    #[tokio::test]
    async fn loads_offer_with_sector_name() {
        let gateway = Arc::new(FakeGateway::default());
        let id = Uuid::new_v4();
        gateway.put_row(id, offer_row(id, "Développeur Rust"));
        let loader = DetailLoader::<Offer>::new(gateway.clone());

        assert_eq!(loader.open(id).await, FetchOutcome::Applied);
        match loader.state() {
            DetailState::Loaded(offer) => {
                assert_eq!(offer.title, "Développeur Rust");
                assert_eq!(offer.sector_name.as_deref(), Some("Informatique"));
            }
            other => panic!("expected a loaded offer, got {other:?}"),
        }

        loader.close();
        assert_eq!(loader.state(), DetailState::Closed);
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let gateway = Arc::new(FakeGateway::default());
        let loader = DetailLoader::<Offer>::new(gateway);
        let id = Uuid::new_v4();
        loader.open(id).await;
        assert_eq!(loader.state(), DetailState::NotFound(id));
        assert_eq!(loader.retry().await, None);
    }

    #[tokio::test]
    async fn close_discards_in_flight_load() {
        let gateway = Arc::new(FakeGateway::default());
        let reply = gateway.script_detail();
        let loader = Arc::new(DetailLoader::<Offer>::new(gateway.clone()));
        let id = Uuid::new_v4();

        let l = loader.clone();
        let pending = tokio::spawn(async move { l.open(id).await });
        wait_for_calls(&gateway, 1).await;
        loader.close();

        reply.send(Ok(Some(offer_row(id, "Trop tard")))).unwrap();
        assert_eq!(pending.await.unwrap(), FetchOutcome::Superseded);
        assert_eq!(loader.state(), DetailState::Closed);
    }

    #[tokio::test]
    async fn explicit_retry_after_failure() {
        let gateway = Arc::new(FakeGateway::default());
        let id = Uuid::new_v4();
        gateway.put_row(id, offer_row(id, "Stage data"));
        gateway.fail_reads.store(true, Ordering::SeqCst);
        let loader = DetailLoader::<Offer>::new(gateway.clone());

        loader.open(id).await;
        assert!(matches!(loader.state(), DetailState::Failed { .. }));

        gateway.fail_reads.store(false, Ordering::SeqCst);
        assert_eq!(loader.retry().await, Some(FetchOutcome::Applied));
        assert!(matches!(loader.state(), DetailState::Loaded(_)));
    }
}
