use pawmatch_catalog::{BreedCatalog, CandidateId, Credentials, Gateway, GatewayError, SortOrder};
use tracing::debug;

use crate::models::browse::{Applied, BrowseController, FetchTicket, ResultPage, SearchCriteria};
use crate::models::favorites::FavoritesLedger;
use crate::models::matching::{MatchError, MatchOutcome, MatchResolver, MatchResult};
use crate::models::notification::Notification;
use crate::models::session::{Session, SessionError};

/// The main API struct of a browsing session.
///
/// A [Pawmatch] owns the gateway and all state derived from it.
/// Gateway failures are reported as [Notification]s and never
/// leave the state half updated.
/// When the gateway stops accepting the session,
/// the session is ended and all session state is discarded.
#[derive(Debug)]
pub struct Pawmatch<G> {
    gateway: G,
    session: Session,
    browse: BrowseController,
    favorites: FavoritesLedger,
    matcher: MatchResolver,
    default_sort: SortOrder,
}

impl<G: Gateway> Pawmatch<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            session: Session::new(),
            browse: BrowseController::new(),
            favorites: FavoritesLedger::new(),
            matcher: MatchResolver::new(),
            default_sort: SortOrder::default(),
        }
    }

    /// Sort order of the first page of every session.
    pub fn with_default_sort(mut self, sort: SortOrder) -> Self {
        self.default_sort = sort;
        self.browse = BrowseController::with_sort(sort);
        self
    }

    /// Look up the full record of matches that are not on the current page.
    pub fn with_match_details(mut self, enabled: bool) -> Self {
        self.matcher = MatchResolver::new().with_detail_lookup(enabled);
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn browse(&self) -> &BrowseController {
        &self.browse
    }

    pub fn criteria(&self) -> &SearchCriteria {
        self.browse.criteria()
    }

    pub fn current_page(&self) -> &ResultPage {
        self.browse.current_page()
    }

    pub fn favorites(&self) -> &FavoritesLedger {
        &self.favorites
    }

    pub fn current_match(&self) -> Option<&MatchResult> {
        self.matcher.current()
    }

    /// Log in, starting a fresh session.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), Notification> {
        self.end_session();
        match self.session.login(&self.gateway, credentials).await {
            Ok(()) => Ok(()),
            Err(SessionError::Rejected(_)) => Err(Notification::authentication_failed()),
            Err(SessionError::Login(e) | SessionError::Logout(e)) => {
                Err(Notification::from_gateway_error("logging in", &e))
            },
        }
    }

    /// Log out and discard all session state.
    ///
    /// The local session ends even if the service could not be reached.
    pub async fn logout(&mut self) -> Result<(), Notification> {
        let result = self.session.logout(&self.gateway).await;
        self.end_session();
        match result {
            Ok(()) => Ok(()),
            Err(SessionError::Logout(e) | SessionError::Login(e) | SessionError::Rejected(e)) => {
                Err(Notification::from_gateway_error("logging out", &e))
            },
        }
    }

    /// The breed catalog, fetched once per session.
    pub async fn load_breeds(&mut self) -> Result<BreedCatalog, Notification> {
        self.require_session()?;
        let result = self
            .browse
            .load_breeds(&self.gateway)
            .await
            .map(Clone::clone);
        result.map_err(|e| self.notify("loading breeds", e))
    }

    pub async fn set_breed_filter(
        &mut self,
        breed: Option<impl Into<String>>,
    ) -> Result<Applied, Notification> {
        self.require_session()?;
        let ticket = self.browse.set_breed_filter(breed);
        self.run(ticket).await
    }

    pub async fn set_sort_order(&mut self, sort: SortOrder) -> Result<Applied, Notification> {
        self.require_session()?;
        let ticket = self.browse.set_sort_order(sort);
        self.run(ticket).await
    }

    /// Go to page `page`, `None` if the index was rejected.
    pub async fn go_to_page(&mut self, page: i64) -> Result<Option<Applied>, Notification> {
        self.require_session()?;
        let ticket = self.browse.go_to_page(page);
        self.run_optional(ticket).await
    }

    pub async fn next_page(&mut self) -> Result<Option<Applied>, Notification> {
        self.require_session()?;
        let ticket = self.browse.next_page();
        self.run_optional(ticket).await
    }

    pub async fn previous_page(&mut self) -> Result<Option<Applied>, Notification> {
        self.require_session()?;
        let ticket = self.browse.previous_page();
        self.run_optional(ticket).await
    }

    /// Load the page for `criteria` with a single fetch.
    pub async fn set_criteria(&mut self, criteria: SearchCriteria) -> Result<Applied, Notification> {
        self.require_session()?;
        let ticket = self.browse.set_criteria(criteria);
        self.run(ticket).await
    }

    /// Reload the page for the current criteria.
    pub async fn refresh(&mut self) -> Result<Applied, Notification> {
        self.require_session()?;
        let ticket = self.browse.refresh();
        self.run(ticket).await
    }

    /// Returns whether `id` is a favorite afterwards.
    pub fn toggle_favorite(&mut self, id: CandidateId) -> bool {
        self.favorites.toggle(id)
    }

    pub fn is_favorite(&self, id: &CandidateId) -> bool {
        self.favorites.is_favorite(id)
    }

    /// Submit the favorites for matching.
    pub async fn generate_match(&mut self) -> Result<MatchOutcome, Notification> {
        self.require_session()?;
        let result = self
            .matcher
            .generate_match(&self.gateway, &self.favorites, self.browse.current_page())
            .await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(MatchError::EmptySelection) => Err(Notification::empty_selection()),
            Err(MatchError::Gateway(e)) => Err(self.notify("generating a match", e)),
        }
    }

    async fn run(&mut self, ticket: FetchTicket) -> Result<Applied, Notification> {
        match self.browse.run(&self.gateway, ticket).await {
            Ok(applied) => Ok(applied),
            Err(e) => Err(self.notify("loading candidates", e)),
        }
    }

    async fn run_optional(
        &mut self,
        ticket: Option<FetchTicket>,
    ) -> Result<Option<Applied>, Notification> {
        match ticket {
            Some(ticket) => self.run(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    fn require_session(&self) -> Result<(), Notification> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(Notification::session_expired())
        }
    }

    /// Turn a gateway failure into a notification,
    /// ending the session if it is no longer accepted.
    fn notify(&mut self, action: &str, err: GatewayError) -> Notification {
        if err.is_session_expired() {
            debug!(action, "gateway rejected the session");
            self.end_session();
        }
        Notification::from_gateway_error(action, &err)
    }

    fn end_session(&mut self) {
        self.session.expire();
        self.browse = BrowseController::with_sort(self.default_sort);
        self.favorites.clear();
        self.matcher.clear();
    }
}
