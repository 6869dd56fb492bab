//! Per-item on/off state backed by a join table: favorites and club
//! memberships. Writes are optimistic and roll back to the last confirmed
//! value on failure.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use campus_types::models::{FavoriteKey, ItemType};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::notice::{Notice, Notices};
use crate::session::{Identity, Session};

/// What a toggle switches on and off.
#[async_trait]
pub trait ToggleTarget: Send + Sync + 'static {
    async fn probe(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<bool, GatewayError>;

    async fn set(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError>;

    async fn unset(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError>;

    fn sign_in_notice(&self) -> Notice;

    fn set_notice(&self) -> Notice;

    fn unset_notice(&self) -> Notice;

    fn failure_notice(&self) -> Notice;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FavoriteTarget {
    pub key: FavoriteKey,
}

impl FavoriteTarget {
    pub fn new(item_type: ItemType, item_id: Uuid) -> Self {
        Self {
            key: FavoriteKey::new(item_type, item_id),
        }
    }
}

#[async_trait]
impl ToggleTarget for FavoriteTarget {
    async fn probe(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<bool, GatewayError> {
        gateway.favorite_exists(identity, self.key).await
    }

    async fn set(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError> {
        match gateway.insert_favorite(identity, self.key).await {
            // The row is there, which is what we wanted.
            Err(GatewayError::Duplicate) => {
                debug!("Favorite {} {} already present", self.key.item_type, self.key.item_id);
                Ok(())
            }
            other => other,
        }
    }

    async fn unset(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError> {
        gateway.delete_favorite(identity, self.key).await
    }

    fn sign_in_notice(&self) -> Notice {
        Notice::favorite_sign_in()
    }

    fn set_notice(&self) -> Notice {
        Notice::favorite_added()
    }

    fn unset_notice(&self) -> Notice {
        Notice::favorite_removed()
    }

    fn failure_notice(&self) -> Notice {
        Notice::favorite_failed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MembershipTarget {
    pub club_id: Uuid,
}

#[async_trait]
impl ToggleTarget for MembershipTarget {
    async fn probe(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<bool, GatewayError> {
        gateway.is_member(identity, self.club_id).await
    }

    async fn set(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError> {
        gateway.join_club(identity, self.club_id).await
    }

    async fn unset(&self, gateway: &dyn Gateway, identity: &Identity) -> Result<(), GatewayError> {
        gateway.leave_club(identity, self.club_id).await
    }

    fn sign_in_notice(&self) -> Notice {
        Notice::club_sign_in()
    }

    fn set_notice(&self) -> Notice {
        Notice::club_joined()
    }

    fn unset_notice(&self) -> Notice {
        Notice::club_left()
    }

    fn failure_notice(&self) -> Notice {
        Notice::membership_failed()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    /// A write is in flight and `active` is not confirmed yet.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Now on, confirmed by the store.
    Set,
    /// Now off, confirmed by the store.
    Unset,
    /// Nobody is signed in; nothing was written.
    AuthRequired,
    /// Another write for this item is still in flight.
    Busy,
    /// The write failed and the state was rolled back.
    Failed(GatewayError),
}

pub struct Toggle<T: ToggleTarget> {
    target: T,
    gateway: Arc<dyn Gateway>,
    session: Session,
    notices: Notices,
    state: watch::Sender<ToggleState>,
    /// User the stored state was confirmed for.
    owner: Mutex<Option<Uuid>>,
    /// Bumped by every probe and toggle; a probe answer is only applied
    /// while its epoch is still the latest.
    epoch: AtomicU64,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag, and restores the confirmed value if the write
/// never settled (the toggle future was dropped).
struct Flight<'a> {
    state: &'a watch::Sender<ToggleState>,
    in_flight: &'a AtomicBool,
    confirmed: bool,
    settled: bool,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_replace(ToggleState {
                active: self.confirmed,
                pending: false,
            });
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl<T: ToggleTarget> Toggle<T> {
    pub fn new(target: T, gateway: Arc<dyn Gateway>, session: Session, notices: Notices) -> Self {
        let (state, _) = watch::channel(ToggleState::default());
        Self {
            target,
            gateway,
            session,
            notices,
            state,
            owner: Mutex::new(None),
            epoch: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    fn set_owner(&self, user: Option<Uuid>) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn owned_by(&self, user: Uuid) -> bool {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(user)
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Off whenever nobody is signed in, or the stored value belongs to a
    /// previous user.
    pub fn state(&self) -> ToggleState {
        match self.session.current_user() {
            Some(who) if self.owned_by(who.user_id) => *self.state.borrow(),
            _ => ToggleState::default(),
        }
    }

    /// Raw state updates. Sign-out is not pushed here; receivers should
    /// also watch `Session::subscribe` or read through `state()`.
    pub fn subscribe(&self) -> watch::Receiver<ToggleState> {
        self.state.subscribe()
    }

    /// Loads the current value. Signed out means off, without asking the
    /// store. A failed probe is logged and reads as off.
    pub async fn probe(&self) -> bool {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(identity) = self.session.current_user() else {
            self.set_owner(None);
            self.state.send_replace(ToggleState::default());
            return false;
        };

        let active = match self.target.probe(self.gateway.as_ref(), &identity).await {
            Ok(active) => active,
            Err(e) => {
                warn!("Status probe failed: {}", e);
                false
            }
        };

        // Any probe or toggle issued meanwhile owns the state.
        let mut current = false;
        self.state.send_if_modified(|state| {
            current = self.epoch.load(Ordering::SeqCst) == epoch
                && !self.in_flight.load(Ordering::SeqCst)
                && self.session.current_user().is_some_and(|who| who.user_id == identity.user_id);
            if !current {
                return false;
            }
            self.set_owner(Some(identity.user_id));
            let next = ToggleState { active, pending: false };
            let changed = *state != next;
            *state = next;
            changed
        });
        if !current {
            debug!("Discarded stale status probe for user {}", identity.user_id);
        }
        active
    }

    pub async fn toggle(&self) -> ToggleOutcome {
        let Some(identity) = self.session.current_user() else {
            self.notices.emit(self.target.sign_in_notice());
            return ToggleOutcome::AuthRequired;
        };

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return ToggleOutcome::Busy;
        }

        self.epoch.fetch_add(1, Ordering::SeqCst);
        let confirmed = self.state().active;
        self.set_owner(Some(identity.user_id));
        let mut flight = Flight {
            state: &self.state,
            in_flight: &self.in_flight,
            confirmed,
            settled: false,
        };

        self.state.send_replace(ToggleState {
            active: !confirmed,
            pending: true,
        });

        let gateway = self.gateway.as_ref();
        let result = if confirmed {
            self.target.unset(gateway, &identity).await
        } else {
            self.target.set(gateway, &identity).await
        };

        let outcome = match result {
            Ok(()) => {
                self.state.send_replace(ToggleState {
                    active: !confirmed,
                    pending: false,
                });
                if confirmed {
                    self.notices.emit(self.target.unset_notice());
                    ToggleOutcome::Unset
                } else {
                    self.notices.emit(self.target.set_notice());
                    ToggleOutcome::Set
                }
            }
            Err(e) => {
                warn!("Toggle write failed, rolling back: {}", e);
                self.state.send_replace(ToggleState {
                    active: confirmed,
                    pending: false,
                });
                self.notices.emit(self.target.failure_notice());
                ToggleOutcome::Failed(e)
            }
        };
        flight.settled = true;
        outcome
    }
}
