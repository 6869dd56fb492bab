//! Scripted in-memory gateway for component tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::oneshot;
use uuid::Uuid;

use campus_types::models::{Favorite, FavoriteKey};
use campus_types::query::{ListQuery, Page, Table};

use crate::error::GatewayError;
use crate::gateway::{Gateway, Row};
use crate::session::Identity;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(ListQuery),
    SelectOne(Table, Uuid),
    InsertFavorite(FavoriteKey),
    DeleteFavorite(FavoriteKey),
    FavoriteExists(FavoriteKey),
    ListFavorites,
    JoinClub(Uuid),
    LeaveClub(Uuid),
    IsMember(Uuid),
}

type Reply<T> = oneshot::Receiver<Result<T, GatewayError>>;

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    selects: Mutex<VecDeque<Reply<Page<Row>>>>,
    details: Mutex<VecDeque<Reply<Option<Row>>>>,
    write_gate: Mutex<Option<oneshot::Receiver<()>>>,
    read_gate: Mutex<Option<oneshot::Receiver<()>>>,
    favorites: Mutex<HashSet<(Uuid, FavoriteKey)>>,
    members: Mutex<HashSet<(Uuid, Uuid)>>,
    rows: Mutex<HashMap<Uuid, Row>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    /// The next `select` waits for the returned sender.
    pub fn script_select(&self) -> oneshot::Sender<Result<Page<Row>, GatewayError>> {
        let (tx, rx) = oneshot::channel();
        self.selects.lock().unwrap().push_back(rx);
        tx
    }

    /// The next `select_one` waits for the returned sender.
    pub fn script_detail(&self) -> oneshot::Sender<Result<Option<Row>, GatewayError>> {
        let (tx, rx) = oneshot::channel();
        self.details.lock().unwrap().push_back(rx);
        tx
    }

    /// The next write waits until the returned sender fires or drops.
    pub fn hold_next_write(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.write_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// The next status read answers from the state at call time, then waits
    /// for the returned sender before delivering it.
    pub fn hold_next_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.read_gate.lock().unwrap() = Some(rx);
        tx
    }

    async fn delay_read(&self) {
        let gate = self.read_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }

    pub fn put_row(&self, id: Uuid, row: Row) {
        self.rows.lock().unwrap().insert(id, row);
    }

    pub fn has_favorite(&self, user: Uuid, key: FavoriteKey) -> bool {
        self.favorites.lock().unwrap().contains(&(user, key))
    }

    async fn write(&self) -> Result<(), GatewayError> {
        let gate = self.write_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("offline".into()));
        }
        Ok(())
    }
}

async fn answer<T>(reply: Option<Reply<T>>) -> Option<Result<T, GatewayError>> {
    let rx = reply?;
    Some(rx.await.unwrap_or_else(|_| Err(GatewayError::Network("dropped".into()))))
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn select(&self, query: &ListQuery) -> Result<Page<Row>, GatewayError> {
        self.record(Call::Select(query.clone()));
        let scripted = self.selects.lock().unwrap().pop_front();
        if let Some(result) = answer(scripted).await {
            return result;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("offline".into()));
        }
        Ok(Page::empty())
    }

    async fn select_one(&self, table: Table, id: Uuid) -> Result<Option<Row>, GatewayError> {
        self.record(Call::SelectOne(table, id));
        let scripted = self.details.lock().unwrap().pop_front();
        if let Some(result) = answer(scripted).await {
            return result;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("offline".into()));
        }
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn insert_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        self.record(Call::InsertFavorite(key));
        self.write().await?;
        if self.favorites.lock().unwrap().insert((identity.user_id, key)) {
            Ok(())
        } else {
            Err(GatewayError::Duplicate)
        }
    }

    async fn delete_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        self.record(Call::DeleteFavorite(key));
        self.write().await?;
        self.favorites.lock().unwrap().remove(&(identity.user_id, key));
        Ok(())
    }

    async fn favorite_exists(&self, identity: &Identity, key: FavoriteKey) -> Result<bool, GatewayError> {
        self.record(Call::FavoriteExists(key));
        let answer = if self.fail_reads.load(Ordering::SeqCst) {
            Err(GatewayError::Network("offline".into()))
        } else {
            Ok(self.has_favorite(identity.user_id, key))
        };
        self.delay_read().await;
        answer
    }

    async fn list_favorites(&self, _identity: &Identity) -> Result<Vec<Favorite>, GatewayError> {
        self.record(Call::ListFavorites);
        Ok(Vec::new())
    }

    async fn join_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        self.record(Call::JoinClub(club_id));
        self.write().await?;
        self.members.lock().unwrap().insert((identity.user_id, club_id));
        Ok(())
    }

    async fn leave_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        self.record(Call::LeaveClub(club_id));
        self.write().await?;
        self.members.lock().unwrap().remove(&(identity.user_id, club_id));
        Ok(())
    }

    async fn is_member(&self, identity: &Identity, club_id: Uuid) -> Result<bool, GatewayError> {
        self.record(Call::IsMember(club_id));
        let answer = self.members.lock().unwrap().contains(&(identity.user_id, club_id));
        self.delay_read().await;
        Ok(answer)
    }
}

pub fn identity() -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        email: "amira@example.tn".into(),
        token: "token".into(),
    }
}

/// A job offer row as the store returns it.
pub fn offer_row(id: Uuid, title: &str) -> Row {
    json!({
        "id": id,
        "title": title,
        "type": "job",
        "location": "Tunis",
        "description": "",
        "company_name": null,
        "contract_type": "cdi",
        "duration": null,
        "salary_range": null,
        "rent_price": null,
        "housing_type": null,
        "surface_area": null,
        "furnished": null,
        "requirements": null,
        "contact_email": null,
        "contact_phone": null,
        "deadline": null,
        "sector_id": null,
        "sector_name": "Informatique",
        "is_active": true,
        "created_at": "2024-03-01T10:00:00.000Z",
    })
}

pub fn offer_page(titles: &[&str], total: u64) -> Page<Row> {
    Page {
        rows: titles.iter().map(|t| offer_row(Uuid::new_v4(), t)).collect(),
        total,
    }
}

/// Lets spawned tasks run until `gateway` has seen `n` calls.
pub async fn wait_for_calls(gateway: &FakeGateway, n: usize) {
    while gateway.call_count() < n {
        tokio::task::yield_now().await;
    }
}
