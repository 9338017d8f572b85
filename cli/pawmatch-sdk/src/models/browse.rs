//! Paginated, filterable, sortable browsing of the catalog.
//!
//! Every change to the [SearchCriteria] issues a [FetchTicket].
//! A ticket carries a generation number taken from a counter shared with
//! the [BrowseController] that issued it.
//! Fetching a ticket runs the two phase ID-then-detail protocol
//! without borrowing the controller, so several fetches may be in flight.
//! [BrowseController::apply] commits a response only if its ticket is
//! still the latest one issued; responses for superseded criteria are
//! dropped whatever order they arrive in.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pawmatch_catalog::{
    BreedCatalog,
    Candidate,
    CandidateId,
    Gateway,
    GatewayError,
    SearchQuery,
    SortOrder,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// Everything that determines a single browse query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SearchCriteria {
    /// Restrict results to a single breed, all breeds if `None`
    pub breed: Option<String>,
    pub page_index: u32,
    pub sort: SortOrder,
}

impl SearchCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(sort: SortOrder) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    /// The ID search request for these criteria.
    pub fn query(&self) -> SearchQuery {
        SearchQuery::page(self.breed.as_deref(), self.page_index, self.sort)
    }
}

/// The detail records of the page currently displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultPage {
    candidates: Vec<Candidate>,
}

impl ResultPage {
    /// Candidates in the order returned by the details endpoint.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| &candidate.id == id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A request to load the page for a particular version of the criteria.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    criteria: SearchCriteria,
    latest: Arc<AtomicU64>,
}

/// What a completed fetch found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Fetched(Vec<Candidate>),
    /// The ID search matched nothing, no detail fetch was issued
    NoResults,
    /// The ticket was superseded before the detail fetch was issued
    Superseded,
}

/// A completed fetch together with the ticket it was issued for.
#[derive(Debug)]
pub struct FetchResponse {
    pub ticket: FetchTicket,
    pub result: Result<FetchResult, GatewayError>,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Whether no newer ticket has been issued since this one.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }

    /// Run the two phase fetch for this ticket.
    ///
    /// The detail fetch only starts once the ID search for the same
    /// ticket has returned.
    #[instrument(skip_all, fields(generation = self.generation, criteria = ?self.criteria))]
    pub async fn fetch(self, gateway: &impl Gateway) -> FetchResponse {
        let result = self.fetch_pages(gateway).await;
        FetchResponse {
            ticket: self,
            result,
        }
    }

    async fn fetch_pages(&self, gateway: &impl Gateway) -> Result<FetchResult, GatewayError> {
        let ids = gateway.search(&self.criteria.query()).await?.result_ids;

        if ids.is_empty() {
            debug!("search matched no candidates");
            return Ok(FetchResult::NoResults);
        }

        if !self.is_current() {
            debug!("criteria changed while searching, skipping detail fetch");
            return Ok(FetchResult::Superseded);
        }

        let candidates = gateway.details(&ids).await?;
        Ok(FetchResult::Fetched(candidates))
    }
}

/// The state of the displayed page after a response was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    Loaded(usize),
    /// A valid page without any candidates, e.g. past the last page
    NoResults,
}

/// Outcome of [BrowseController::apply].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated(PageStatus),
    /// The response belonged to superseded criteria and was dropped
    Discarded,
}

/// Owns the search criteria and the page displayed for them.
#[derive(Debug, Default)]
pub struct BrowseController {
    /// The criteria of the displayed page
    committed: SearchCriteria,
    /// The criteria of the most recently issued ticket
    requested: SearchCriteria,
    page: ResultPage,
    breeds: Option<BreedCatalog>,
    latest: Arc<AtomicU64>,
}

impl BrowseController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A controller whose first query uses `sort`.
    pub fn with_sort(sort: SortOrder) -> Self {
        let criteria = SearchCriteria::with_sort(sort);
        Self {
            committed: criteria.clone(),
            requested: criteria,
            ..Default::default()
        }
    }

    /// The criteria of the displayed page.
    pub fn criteria(&self) -> &SearchCriteria {
        &self.committed
    }

    /// The criteria of the most recently issued ticket.
    pub fn requested_criteria(&self) -> &SearchCriteria {
        &self.requested
    }

    pub fn current_page(&self) -> &ResultPage {
        &self.page
    }

    pub fn breeds(&self) -> Option<&BreedCatalog> {
        self.breeds.as_ref()
    }

    /// Fetch the breed catalog once and cache it for the session.
    pub async fn load_breeds(
        &mut self,
        gateway: &impl Gateway,
    ) -> Result<&BreedCatalog, GatewayError> {
        if self.breeds.is_none() {
            let breeds = gateway.breeds().await?;
            debug!(n_breeds = breeds.len(), "loaded breed catalog");
            self.breeds = Some(breeds);
        }
        Ok(self.breeds.get_or_insert_default())
    }

    /// Filter by `breed`, or show all breeds, starting at the first page.
    pub fn set_breed_filter(&mut self, breed: Option<impl Into<String>>) -> FetchTicket {
        let criteria = SearchCriteria {
            breed: breed.map(Into::into),
            page_index: 0,
            ..self.requested.clone()
        };
        self.issue(criteria)
    }

    /// Change the sort direction, starting at the first page.
    pub fn set_sort_order(&mut self, sort: SortOrder) -> FetchTicket {
        let criteria = SearchCriteria {
            sort,
            page_index: 0,
            ..self.requested.clone()
        };
        self.issue(criteria)
    }

    /// Go to page `page`.
    ///
    /// Negative or unrepresentable page indices are rejected
    /// and leave the criteria untouched.
    pub fn go_to_page(&mut self, page: i64) -> Option<FetchTicket> {
        let Ok(page_index) = u32::try_from(page) else {
            debug!(page, "rejecting page index");
            return None;
        };
        let criteria = SearchCriteria {
            page_index,
            ..self.requested.clone()
        };
        Some(self.issue(criteria))
    }

    pub fn next_page(&mut self) -> Option<FetchTicket> {
        self.go_to_page(i64::from(self.requested.page_index) + 1)
    }

    pub fn previous_page(&mut self) -> Option<FetchTicket> {
        self.go_to_page(i64::from(self.requested.page_index) - 1)
    }

    /// Re-issue the current criteria, e.g. to retry after a failure.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue(self.requested.clone())
    }

    /// Replace all criteria at once.
    pub fn set_criteria(&mut self, criteria: SearchCriteria) -> FetchTicket {
        self.issue(criteria)
    }

    fn issue(&mut self, criteria: SearchCriteria) -> FetchTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, ?criteria, "issuing fetch");
        self.requested = criteria.clone();
        FetchTicket {
            generation,
            criteria,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Commit a completed fetch if it belongs to the latest ticket.
    ///
    /// On failure of the latest fetch the displayed page and criteria are
    /// kept, and the requested criteria fall back to the displayed ones.
    pub fn apply(&mut self, response: FetchResponse) -> Result<Applied, GatewayError> {
        let FetchResponse { ticket, result } = response;

        if !ticket.is_current() || !Arc::ptr_eq(&ticket.latest, &self.latest) {
            debug!(generation = ticket.generation, "discarding stale response");
            return Ok(Applied::Discarded);
        }

        let candidates = match result {
            Ok(FetchResult::Fetched(candidates)) => candidates,
            Ok(FetchResult::NoResults) => Vec::new(),
            Ok(FetchResult::Superseded) => return Ok(Applied::Discarded),
            Err(e) => {
                debug!(generation = ticket.generation, error = %e, "fetch failed, keeping page");
                self.requested = self.committed.clone();
                return Err(e);
            },
        };

        self.committed = ticket.criteria;
        self.page = ResultPage { candidates };

        let status = if self.page.is_empty() {
            PageStatus::NoResults
        } else {
            PageStatus::Loaded(self.page.len())
        };
        debug!(generation = ticket.generation, ?status, "page updated");
        Ok(Applied::Updated(status))
    }

    /// Fetch `ticket` and apply the response.
    pub async fn run(
        &mut self,
        gateway: &impl Gateway,
        ticket: FetchTicket,
    ) -> Result<Applied, GatewayError> {
        let response = ticket.fetch(gateway).await;
        self.apply(response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use futures::stream::FuturesUnordered;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::providers::gateway::{Call, Endpoint, MockFailure, MockGateway, mock_candidate};

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    fn poodle_gateway() -> MockGateway {
        let gateway = MockGateway::new();
        gateway.add_candidates([mock_candidate("d1", "Poodle"), mock_candidate("d2", "Poodle")]);
        gateway.set_search_result(SearchQuery::page(Some("Poodle"), 0, SortOrder::Asc), [
            "d1", "d2",
        ]);
        gateway
    }

    #[tokio::test]
    async fn two_phase_fetch_fills_page() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();

        let ticket = controller.set_breed_filter(Some("Poodle"));
        let applied = controller.run(&gateway, ticket).await.unwrap();

        assert_eq!(applied, Applied::Updated(PageStatus::Loaded(2)));
        assert_eq!(ids(controller.current_page().candidates()), vec!["d1", "d2"]);
        assert_eq!(controller.criteria().breed.as_deref(), Some("Poodle"));
        assert_eq!(gateway.calls(), vec![
            Call::Search(SearchQuery::page(Some("Poodle"), 0, SortOrder::Asc)),
            Call::Details(vec!["d1".into(), "d2".into()]),
        ]);
    }

    /// The page keeps the order of the details endpoint, not of the IDs
    #[tokio::test]
    async fn page_order_follows_detail_response() {
        let gateway = poodle_gateway();
        gateway.set_reverse_details(true);
        let mut controller = BrowseController::new();

        let ticket = controller.set_breed_filter(Some("Poodle"));
        controller.run(&gateway, ticket).await.unwrap();

        assert_eq!(ids(controller.current_page().candidates()), vec!["d2", "d1"]);
    }

    #[tokio::test]
    async fn empty_search_skips_detail_fetch() {
        let gateway = MockGateway::new();
        let mut controller = BrowseController::new();

        let ticket = controller.set_breed_filter(Some("Akita"));
        let applied = controller.run(&gateway, ticket).await.unwrap();

        assert_eq!(applied, Applied::Updated(PageStatus::NoResults));
        assert!(controller.current_page().is_empty());
        assert_eq!(gateway.call_count(Endpoint::Details), 0);
    }

    /// Paging past the last page is a valid empty page
    #[tokio::test]
    async fn next_page_past_end_is_empty() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();
        let ticket = controller.set_breed_filter(Some("Poodle"));
        controller.run(&gateway, ticket).await.unwrap();

        let ticket = controller.next_page().unwrap();
        let applied = controller.run(&gateway, ticket).await.unwrap();

        assert_eq!(applied, Applied::Updated(PageStatus::NoResults));
        assert_eq!(controller.criteria().page_index, 1);
    }

    #[test]
    fn previous_from_first_page_is_rejected() {
        let mut controller = BrowseController::new();
        assert!(controller.previous_page().is_none());
        assert!(controller.go_to_page(-1).is_none());
        assert_eq!(controller.requested_criteria().page_index, 0);
        assert_eq!(controller.criteria().page_index, 0);
    }

    #[test]
    fn filter_and_sort_changes_restart_at_first_page() {
        let mut controller = BrowseController::new();
        controller.go_to_page(4).unwrap();

        let ticket = controller.set_sort_order(SortOrder::Desc);
        assert_eq!(ticket.criteria().page_index, 0);
        assert_eq!(ticket.criteria().sort, SortOrder::Desc);

        controller.go_to_page(2).unwrap();
        let ticket = controller.set_breed_filter(Some("Boxer"));
        assert_eq!(ticket.criteria(), &SearchCriteria {
            breed: Some("Boxer".to_string()),
            page_index: 0,
            sort: SortOrder::Desc,
        });
    }

    /// Failures keep the displayed page and allow the same action to be retried
    #[tokio::test]
    async fn failure_keeps_previous_page() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();
        let ticket = controller.set_breed_filter(Some("Poodle"));
        controller.run(&gateway, ticket).await.unwrap();
        let page_before = controller.current_page().clone();

        gateway.push_failure(Endpoint::Search, MockFailure::Status(503));
        let ticket = controller.next_page().unwrap();
        let result = controller.run(&gateway, ticket).await;

        assert!(matches!(result, Err(GatewayError::Status { .. })));
        assert_eq!(controller.current_page(), &page_before);
        assert_eq!(controller.criteria().page_index, 0);
        assert_eq!(controller.requested_criteria().page_index, 0);

        // retrying "next" asks for page 1 again, not page 2
        let ticket = controller.next_page().unwrap();
        assert_eq!(ticket.criteria().page_index, 1);
    }

    #[tokio::test]
    async fn detail_failure_keeps_previous_page() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();
        gateway.push_failure(Endpoint::Details, MockFailure::Status(500));

        let ticket = controller.set_breed_filter(Some("Poodle"));
        let result = controller.run(&gateway, ticket).await;

        assert!(result.is_err());
        assert!(controller.current_page().is_empty());
        assert_eq!(controller.criteria(), &SearchCriteria::new());
    }

    /// A slow response for old criteria does not replace a faster newer one
    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let gateway = poodle_gateway();
        gateway.add_candidates([mock_candidate("b1", "Boxer")]);
        let boxer_query = SearchQuery::page(Some("Boxer"), 0, SortOrder::Asc);
        gateway.set_search_result(boxer_query.clone(), ["b1"]);
        gateway.set_search_delay(boxer_query, Duration::from_millis(500));

        let mut controller = BrowseController::new();
        let slow = controller.set_breed_filter(Some("Boxer"));
        let fast = controller.set_breed_filter(Some("Poodle"));

        let mut in_flight = FuturesUnordered::new();
        in_flight.push(slow.fetch(&gateway));
        in_flight.push(fast.fetch(&gateway));

        let mut outcomes = Vec::new();
        while let Some(response) = in_flight.next().await {
            outcomes.push(controller.apply(response).unwrap());
        }

        assert_eq!(outcomes, vec![
            Applied::Updated(PageStatus::Loaded(2)),
            Applied::Discarded
        ]);
        assert_eq!(ids(controller.current_page().candidates()), vec!["d1", "d2"]);
        assert_eq!(controller.criteria().breed.as_deref(), Some("Poodle"));
        // the superseded fetch never asked for details
        assert_eq!(gateway.call_count(Endpoint::Details), 1);
    }

    /// A response that completed both phases before newer criteria
    /// were issued is still dropped when applied late
    #[tokio::test]
    async fn completed_stale_response_is_discarded() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();

        let old = controller.set_breed_filter(Some("Poodle"));
        let old = old.fetch(&gateway).await;
        assert!(matches!(old.result, Ok(FetchResult::Fetched(_))));
        assert_eq!(gateway.call_count(Endpoint::Details), 1);

        let _newer = controller.set_breed_filter(Some("Boxer"));
        let applied = controller.apply(old).unwrap();

        assert_eq!(applied, Applied::Discarded);
        assert!(controller.current_page().is_empty());
        assert_eq!(controller.criteria(), &SearchCriteria::new());
    }

    /// A stale failure does not touch the requested criteria
    #[tokio::test]
    async fn stale_failure_is_ignored() {
        let gateway = poodle_gateway();
        let mut controller = BrowseController::new();

        let first = controller.set_breed_filter(Some("Boxer"));
        let second = controller.set_breed_filter(Some("Poodle"));

        gateway.push_failure(Endpoint::Search, MockFailure::Status(500));
        let first = first.fetch(&gateway).await;
        assert_eq!(controller.apply(first).unwrap(), Applied::Discarded);
        assert_eq!(
            controller.requested_criteria().breed.as_deref(),
            Some("Poodle")
        );

        let applied = controller.run(&gateway, second).await.unwrap();
        assert_eq!(applied, Applied::Updated(PageStatus::Loaded(2)));
    }

    #[tokio::test]
    async fn breeds_are_fetched_once() {
        let gateway = MockGateway::new();
        gateway.set_breeds(["Boxer", "Poodle"]);
        let mut controller = BrowseController::new();

        controller.load_breeds(&gateway).await.unwrap();
        let breeds = controller.load_breeds(&gateway).await.unwrap();

        assert_eq!(breeds.iter().collect::<Vec<_>>(), vec!["Boxer", "Poodle"]);
        assert_eq!(gateway.call_count(Endpoint::Breeds), 1);
    }

    #[derive(Debug, Clone)]
    enum Action {
        Breed(Option<&'static str>),
        Sort(SortOrder),
        Page(i64),
        /// Run the newest outstanding fetch to completion, applying it later
        Fetch,
    }

    /// A response waiting to be applied, or a ticket still to be fetched
    enum Delivery {
        Ready(FetchResponse),
        Pending(FetchTicket),
    }

    fn criteria_id(criteria: &SearchCriteria) -> String {
        format!(
            "{}-{}-{}",
            criteria.breed.as_deref().unwrap_or("all"),
            criteria.page_index,
            criteria.sort
        )
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            prop::sample::select(vec![None, Some("Boxer"), Some("Poodle")]).prop_map(Action::Breed),
            prop::sample::select(vec![SortOrder::Asc, SortOrder::Desc]).prop_map(Action::Sort),
            (-2_i64..4).prop_map(Action::Page),
            Just(Action::Fetch),
        ]
    }

    proptest! {
        /// Whatever order responses arrive in, and whether or not a stale
        /// fetch got as far as its detail request,
        /// the page reflects the last issued criteria
        #[test]
        fn last_issued_criteria_win(
            actions in proptest::collection::vec(action(), 1..10),
            arrival in any::<prop::sample::Index>(),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let gateway = MockGateway::new();
            let mut controller = BrowseController::new();
            let mut deliveries = Vec::new();
            let mut expected = None;

            for action in actions {
                let ticket = match action {
                    Action::Breed(breed) => Some(controller.set_breed_filter(breed)),
                    Action::Sort(sort) => Some(controller.set_sort_order(sort)),
                    Action::Page(page) => controller.go_to_page(page),
                    Action::Fetch => {
                        let newest = deliveries
                            .iter()
                            .rposition(|delivery| matches!(delivery, Delivery::Pending(_)));
                        if let Some(idx) = newest
                            && let Delivery::Pending(ticket) = deliveries.remove(idx)
                        {
                            let response = runtime.block_on(ticket.fetch(&gateway));
                            deliveries.push(Delivery::Ready(response));
                        }
                        None
                    },
                };
                if let Some(ticket) = ticket {
                    let id = criteria_id(ticket.criteria());
                    gateway.add_candidates([mock_candidate(&id, "Any")]);
                    gateway.set_search_result(ticket.criteria().query(), [id]);
                    expected = Some(ticket.criteria().clone());
                    deliveries.push(Delivery::Pending(ticket));
                }
            }
            prop_assume!(expected.is_some());
            let expected = expected.unwrap();

            // deliver responses in a rotated order
            let split = arrival.index(deliveries.len());
            deliveries.rotate_left(split);

            runtime.block_on(async {
                for delivery in deliveries {
                    let response = match delivery {
                        Delivery::Ready(response) => response,
                        Delivery::Pending(ticket) => ticket.fetch(&gateway).await,
                    };
                    controller.apply(response).unwrap();
                }
            });

            prop_assert_eq!(controller.criteria(), &expected);
            let page_ids = ids(controller.current_page().candidates());
            prop_assert_eq!(page_ids, vec![criteria_id(&expected)]);
        }
    }
}
