//! Paginated listings. Each fetch takes a fresh generation number and a
//! response is only applied while its generation is still the latest, so a
//! slow early request can never overwrite a newer one.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use campus_types::models::Record;
use campus_types::query::{ListQuery, Page, Pagination, Table};

use crate::error::GatewayError;
use crate::filter_state::FilterState;
use crate::filters::{ListFilters, Noun};
use crate::gateway::{Gateway, select_records};

/// The query for one page of a filtered listing.
pub fn build_query<F: ListFilters>(filters: &F, page: u32) -> ListQuery {
    filters.to_query().page(page)
}

/// A full page ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<R> {
    pub records: Vec<R>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    /// Results line, e.g. "3 stages trouvés".
    pub label: String,
}

impl<R> PageView<R> {
    pub fn new(page: Page<R>, number: u32, noun: Noun) -> Self {
        let pagination = Pagination::default();
        let number = number.max(1);
        Self {
            total: page.total,
            page: number,
            total_pages: pagination.total_pages(page.total),
            has_prev: pagination.has_prev(number),
            has_next: pagination.has_next(number, page.total),
            label: noun.count_label(page.total),
            records: page.rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListError {
    /// User-facing text.
    pub message: String,
    pub cause: GatewayError,
}

impl ListError {
    fn new(table: Table, cause: GatewayError) -> Self {
        let what = match table {
            Table::Offers => "des offres",
            Table::Events => "des événements",
            Table::Sectors => "des secteurs",
            Table::Careers => "des métiers",
            Table::Formations => "des formations",
            Table::StudentClubs => "des clubs",
        };
        Self {
            message: format!("Erreur lors du chargement {what}"),
            cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListState<R> {
    Idle,
    Loading,
    Ready(PageView<R>),
    /// Retryable; no rows are kept from the failed request.
    Failed(ListError),
}

impl<R> ListState<R> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ListState::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied to the state.
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Superseded,
    /// Nothing changed, so nothing was fetched.
    Unchanged,
}

#[derive(Debug, Clone)]
struct ListRequest {
    query: ListQuery,
    page: u32,
    noun: Noun,
}

pub struct ListFetcher<R: Record + Clone> {
    gateway: Arc<dyn Gateway>,
    generation: AtomicU64,
    state: watch::Sender<ListState<R>>,
    last: Mutex<Option<ListRequest>>,
}

impl<R: Record + Clone> ListFetcher<R> {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(ListState::Idle);
        Self {
            gateway,
            generation: AtomicU64::new(0),
            state,
            last: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ListState<R> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<R>> {
        self.state.subscribe()
    }

    /// Issues one counted, windowed read for `query` and applies it unless a
    /// newer fetch started in the meantime.
    pub async fn fetch(&self, query: ListQuery, page: u32, noun: Noun) -> FetchOutcome {
        self.run(ListRequest { query, page, noun }).await
    }

    /// Re-issues the last request. `None` when nothing was fetched yet.
    pub async fn retry(&self) -> Option<FetchOutcome> {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match last {
            Some(request) => Some(self.run(request).await),
            None => None,
        }
    }

    async fn run(&self, request: ListRequest) -> FetchOutcome {
        // Taking the generation, recording the retry target and entering
        // Loading happen under the channel's lock, same as applying a result
        // below.
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(request.clone());
            *state = ListState::Loading;
        });

        let table = request.query.table;
        let result = select_records::<R>(self.gateway.as_ref(), &request.query).await;

        let next = match result {
            Ok(page) => ListState::Ready(PageView::new(page, request.page, request.noun)),
            Err(e) => ListState::Failed(ListError::new(table, e)),
        };

        let mut failed = None;
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            if let ListState::Failed(err) = &next {
                failed = Some(err.cause.clone());
            }
            *state = next;
            true
        });

        if !applied {
            debug!("Discarded stale {} response (generation {})", table, generation);
            return FetchOutcome::Superseded;
        }
        if let Some(cause) = failed {
            warn!("Listing {} failed: {}", table, cause);
        }
        FetchOutcome::Applied
    }
}

/// A listing page: filter state, page cursor and fetcher together.
pub struct ListController<F: ListFilters>
where
    F::Record: Clone,
{
    filters: FilterState<F>,
    fetcher: ListFetcher<F::Record>,
    page: AtomicU32,
}

impl<F: ListFilters> ListController<F>
where
    F::Record: Clone,
{
    pub fn new(gateway: Arc<dyn Gateway>, filters: FilterState<F>) -> Self {
        Self {
            filters,
            fetcher: ListFetcher::new(gateway),
            page: AtomicU32::new(1),
        }
    }

    pub fn filters(&self) -> &FilterState<F> {
        &self.filters
    }

    pub fn fetcher(&self) -> &ListFetcher<F::Record> {
        &self.fetcher
    }

    pub fn page(&self) -> u32 {
        self.page.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ListState<F::Record> {
        self.fetcher.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<F::Record>> {
        self.fetcher.subscribe()
    }

    /// Fetches the current page with the current filters.
    pub async fn refresh(&self) -> FetchOutcome {
        let filters = self.filters.snapshot();
        let page = self.page();
        self.fetcher
            .fetch(build_query(&filters, page), page, filters.noun())
            .await
    }

    /// Merges `patch`; a real change goes back to page 1 and refetches.
    pub async fn update_filters(&self, patch: F::Patch) -> FetchOutcome {
        if !self.filters.update(patch) {
            return FetchOutcome::Unchanged;
        }
        self.page.store(1, Ordering::SeqCst);
        self.refresh().await
    }

    pub async fn replace_filters(&self, filters: F) -> FetchOutcome {
        if !self.filters.replace(filters) {
            return FetchOutcome::Unchanged;
        }
        self.page.store(1, Ordering::SeqCst);
        self.refresh().await
    }

    pub async fn reset_filters(&self) -> FetchOutcome {
        if !self.filters.reset() {
            return FetchOutcome::Unchanged;
        }
        self.page.store(1, Ordering::SeqCst);
        self.refresh().await
    }

    pub async fn set_page(&self, page: u32) -> FetchOutcome {
        let page = page.max(1);
        if self.page.swap(page, Ordering::SeqCst) == page {
            return FetchOutcome::Unchanged;
        }
        self.refresh().await
    }

    /// No-op unless the displayed page has a successor.
    pub async fn next_page(&self) -> FetchOutcome {
        match self.fetcher.state() {
            ListState::Ready(view) if view.has_next => self.set_page(view.page + 1).await,
            _ => FetchOutcome::Unchanged,
        }
    }

    /// No-op on page 1.
    pub async fn prev_page(&self) -> FetchOutcome {
        let page = self.page();
        if page <= 1 {
            return FetchOutcome::Unchanged;
        }
        self.set_page(page - 1).await
    }

    pub async fn retry(&self) -> Option<FetchOutcome> {
        self.fetcher.retry().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{OfferFilterPatch, OfferFilters};
    use crate::testing::{Call, FakeGateway, offer_page, wait_for_calls};
    use campus_types::models::{Offer, OfferKind};
    use campus_types::query::{Order, Predicate};

    fn noun() -> Noun {
        OfferFilters::new(OfferKind::Job).noun()
    }

    fn titles(state: &ListState<Offer>) -> Vec<String> {
        match state {
            ListState::Ready(view) => view.records.iter().map(|o| o.title.clone()).collect(),
            other => panic!("expected a ready page, got {other:?}"),
        }
    }

    #[test]
    fn tunis_job_scenario_query() {
        let mut filters = OfferFilters::new(OfferKind::Job);
        filters.merge(OfferFilterPatch {
            location: Some("Tunis".into()),
            rent_range: Some(Some((0, 2000))),
            ..Default::default()
        });

        let query = build_query(&filters, 1);
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, Some(12));
        assert_eq!(query.order, Some(Order::desc("created_at")));
        assert!(query.predicates.contains(&Predicate::Ilike {
            column: "location".into(),
            needle: "Tunis".into()
        }));
        assert!(query.predicates.iter().all(|p| p.column() != "rent_price"));
    }

    #[test]
    fn page_view_arithmetic() {
        let view = PageView::new(Page { rows: vec![(); 1], total: 25 }, 3, noun());
        assert_eq!(view.total_pages, 3);
        assert!(view.has_prev);
        assert!(!view.has_next);
        assert_eq!(view.label, "25 jobs trouvés");
    }

    #[tokio::test]
    async fn newer_fetch_wins_when_older_resolves_last() {
        let gateway = Arc::new(FakeGateway::default());
        let reply_a = gateway.script_select();
        let reply_b = gateway.script_select();
        let fetcher = Arc::new(ListFetcher::<Offer>::new(gateway.clone()));

        let f = fetcher.clone();
        let a = tokio::spawn(async move { f.fetch(ListQuery::new(Table::Offers), 1, noun()).await });
        wait_for_calls(&gateway, 1).await;
        let f = fetcher.clone();
        let b = tokio::spawn(async move { f.fetch(ListQuery::new(Table::Offers), 2, noun()).await });
        wait_for_calls(&gateway, 2).await;

        reply_b.send(Ok(offer_page(&["B"], 13))).unwrap();
        assert_eq!(b.await.unwrap(), FetchOutcome::Applied);
        reply_a.send(Ok(offer_page(&["A"], 1))).unwrap();
        assert_eq!(a.await.unwrap(), FetchOutcome::Superseded);

        assert_eq!(titles(&fetcher.state()), vec!["B"]);
    }

    #[tokio::test]
    async fn stale_response_arriving_first_is_dropped() {
        let gateway = Arc::new(FakeGateway::default());
        let reply_a = gateway.script_select();
        let reply_b = gateway.script_select();
        let fetcher = Arc::new(ListFetcher::<Offer>::new(gateway.clone()));

        let f = fetcher.clone();
        let a = tokio::spawn(async move { f.fetch(ListQuery::new(Table::Offers), 1, noun()).await });
        wait_for_calls(&gateway, 1).await;
        let f = fetcher.clone();
        let b = tokio::spawn(async move { f.fetch(ListQuery::new(Table::Offers), 1, noun()).await });
        wait_for_calls(&gateway, 2).await;

        reply_a.send(Ok(offer_page(&["A"], 1))).unwrap();
        assert_eq!(a.await.unwrap(), FetchOutcome::Superseded);
        assert!(fetcher.state().is_loading());

        reply_b.send(Ok(offer_page(&["B"], 1))).unwrap();
        assert_eq!(b.await.unwrap(), FetchOutcome::Applied);
        assert_eq!(titles(&fetcher.state()), vec!["B"]);
    }

    #[tokio::test]
    async fn failure_shows_no_rows_and_retry_recovers() {
        let gateway = Arc::new(FakeGateway::default());
        let fetcher = ListFetcher::<Offer>::new(gateway.clone());

        let reply = gateway.script_select();
        reply.send(Err(GatewayError::Network("offline".into()))).unwrap();
        fetcher.fetch(ListQuery::new(Table::Offers).page(1), 1, noun()).await;
        match fetcher.state() {
            ListState::Failed(err) => assert_eq!(err.message, "Erreur lors du chargement des offres"),
            other => panic!("expected failure, got {other:?}"),
        }

        let reply = gateway.script_select();
        reply.send(Ok(offer_page(&["Dev"], 1))).unwrap();
        assert_eq!(fetcher.retry().await, Some(FetchOutcome::Applied));
        assert_eq!(titles(&fetcher.state()), vec!["Dev"]);
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn retry_reissues_the_request_on_screen() {
        let gateway = Arc::new(FakeGateway::default());
        let reply_a = gateway.script_select();
        let reply_b = gateway.script_select();
        let fetcher = Arc::new(ListFetcher::<Offer>::new(gateway.clone()));
        let query_a = ListQuery::new(Table::Offers).eq("type", "internship").page(1);
        let query_b = ListQuery::new(Table::Offers).eq("type", "job").page(2);

        let (f, q) = (fetcher.clone(), query_a.clone());
        let a = tokio::spawn(async move { f.fetch(q, 1, noun()).await });
        wait_for_calls(&gateway, 1).await;
        let (f, q) = (fetcher.clone(), query_b.clone());
        let b = tokio::spawn(async move { f.fetch(q, 2, noun()).await });
        wait_for_calls(&gateway, 2).await;

        reply_b.send(Err(GatewayError::Network("offline".into()))).unwrap();
        assert_eq!(b.await.unwrap(), FetchOutcome::Applied);
        reply_a.send(Ok(offer_page(&["A"], 1))).unwrap();
        assert_eq!(a.await.unwrap(), FetchOutcome::Superseded);
        assert!(matches!(fetcher.state(), ListState::Failed(_)));

        assert_eq!(fetcher.retry().await, Some(FetchOutcome::Applied));
        assert_eq!(gateway.calls().last(), Some(&Call::Select(query_b)));
    }

    #[tokio::test]
    async fn undecodable_page_is_a_failure() {
        let gateway = Arc::new(FakeGateway::default());
        let fetcher = ListFetcher::<Offer>::new(gateway.clone());
        let reply = gateway.script_select();
        let mut page = offer_page(&["ok"], 2);
        page.rows.push(serde_json::json!({ "id": "not-a-uuid" }));
        reply.send(Ok(page)).unwrap();

        fetcher.fetch(ListQuery::new(Table::Offers), 1, noun()).await;
        assert!(matches!(
            fetcher.state(),
            ListState::Failed(ListError { cause: GatewayError::Decode(_), .. })
        ));
    }

    #[tokio::test]
    async fn filter_change_returns_to_first_page() {
        let gateway = Arc::new(FakeGateway::default());
        let controller = ListController::new(
            gateway.clone(),
            FilterState::new(OfferFilters::new(OfferKind::Job)),
        );

        let reply = gateway.script_select();
        reply.send(Ok(offer_page(&["a"; 12], 30))).unwrap();
        controller.refresh().await;
        assert_eq!(controller.next_page().await, FetchOutcome::Applied);
        assert_eq!(controller.page(), 2);

        let outcome = controller
            .update_filters(OfferFilterPatch {
                location: Some("Sfax".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(outcome, FetchOutcome::Applied);
        assert_eq!(controller.page(), 1);

        let Some(Call::Select(query)) = gateway.calls().last().cloned() else {
            panic!("expected a select");
        };
        assert_eq!(query.offset, 0);
        assert!(query.predicates.iter().any(|p| p.column() == "location"));
    }

    #[tokio::test]
    async fn paging_stops_at_both_ends() {
        let gateway = Arc::new(FakeGateway::default());
        let controller = ListController::new(gateway.clone(), FilterState::<OfferFilters>::default());

        assert_eq!(controller.prev_page().await, FetchOutcome::Unchanged);

        let reply = gateway.script_select();
        reply.send(Ok(offer_page(&["only"], 1))).unwrap();
        controller.refresh().await;
        assert_eq!(controller.next_page().await, FetchOutcome::Unchanged);
        assert_eq!(gateway.call_count(), 1);

        let unchanged = controller
            .update_filters(OfferFilterPatch::default())
            .await;
        assert_eq!(unchanged, FetchOutcome::Unchanged);
        assert_eq!(gateway.call_count(), 1);
    }
}
