//! Process-wide sign-in state, shared by reference with every component
//! that gates writes on a signed-in user.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use campus_types::api::AuthResponse;

/// Who is signed in, and the bearer token the store accepts for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

impl From<AuthResponse> for Identity {
    fn from(resp: AuthResponse) -> Self {
        Self {
            user_id: resp.user_id,
            email: resp.email,
            token: resp.token,
        }
    }
}

#[derive(Clone)]
pub struct Session {
    current: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { current: Arc::new(tx) }
    }

    pub fn signed_in(identity: Identity) -> Self {
        let session = Self::new();
        session.sign_in(identity);
        session
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn sign_in(&self, identity: Identity) {
        info!("Signed in as {}", identity.user_id);
        self.current.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.current.send_replace(None) {
            info!("Signed out {}", previous.user_id);
        }
    }

    /// Notified on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            email: "amira@example.tn".into(),
            token: "t".into(),
        }
    }

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        assert!(other.current_user().is_none());

        let id = identity();
        session.sign_in(id.clone());
        assert_eq!(other.current_user(), Some(id));

        other.sign_out();
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn subscribers_see_sign_out() {
        let session = Session::signed_in(identity());
        let mut rx = session.subscribe();
        session.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
