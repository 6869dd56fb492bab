use std::sync::Arc;

use tokio::sync::watch;

use crate::filters::ListFilters;

/// Holds one listing page's filters and notifies dependents on change.
#[derive(Clone)]
pub struct FilterState<F: ListFilters> {
    tx: Arc<watch::Sender<F>>,
}

impl<F: ListFilters> Default for FilterState<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: ListFilters> FilterState<F> {
    pub fn new(initial: F) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> F {
        self.tx.borrow().clone()
    }

    /// Shallow-merges `patch`. Dependents are only woken when something
    /// actually changed.
    pub fn update(&self, patch: F::Patch) -> bool {
        self.tx.send_if_modified(|current| {
            let before = current.clone();
            current.merge(patch);
            *current != before
        })
    }

    /// Replaces the whole struct, e.g. when switching offer tabs.
    pub fn replace(&self, filters: F) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == filters {
                return false;
            }
            *current = filters;
            true
        })
    }

    /// Clears every constraint in one step.
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|current| {
            let cleared = current.cleared();
            if *current == cleared {
                return false;
            }
            *current = cleared;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<F> {
        self.tx.subscribe()
    }

    pub fn has_active_filters(&self) -> bool {
        self.tx.borrow().is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{EventFilterPatch, EventFilters, OfferFilterPatch, OfferFilters};
    use campus_types::models::{EventKind, HousingType, OfferKind};

    #[tokio::test]
    async fn update_notifies_subscribers() {
        let state = FilterState::<EventFilters>::default();
        let mut rx = state.subscribe();

        assert!(state.update(EventFilterPatch {
            location: Some("Sousse".into()),
            ..Default::default()
        }));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().location, "Sousse");
        assert!(state.has_active_filters());
    }

    #[test]
    fn unchanged_update_is_silent() {
        let state = FilterState::<EventFilters>::default();
        let rx = state.subscribe();
        assert!(!state.update(EventFilterPatch {
            kind: Some(EventKind::Fair),
            ..Default::default()
        }));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn reset_restores_defaults_at_once() {
        let state = FilterState::new(OfferFilters::new(OfferKind::Housing));
        state.update(OfferFilterPatch {
            location: Some("Tunis".into()),
            housing_type: Some(Some(HousingType::Shared)),
            furnished: Some(Some(true)),
            ..Default::default()
        });
        assert!(state.has_active_filters());

        let rx = state.subscribe();
        assert!(state.reset());
        assert!(rx.has_changed().unwrap());
        assert_eq!(state.snapshot(), OfferFilters::new(OfferKind::Housing));
        assert!(!state.has_active_filters());
    }
}
