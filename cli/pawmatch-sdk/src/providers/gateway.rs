//! Access to the remote catalog gateway.
//!
//! The HTTP implementation lives in `pawmatch-catalog`,
//! this module re-exports it and provides a [MockGateway] for tests.

pub use pawmatch_catalog::{
    BreedCatalog,
    Candidate,
    CandidateId,
    Credentials,
    Gateway,
    GatewayClient,
    GatewayConfig,
    GatewayError,
    MatchResponse,
    SearchQuery,
    SearchResponse,
    SortOrder,
};

#[cfg(any(test, feature = "tests"))]
pub use self::mock::*;

#[cfg(any(test, feature = "tests"))]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use pawmatch_catalog::StatusCode;

    use super::*;

    // Arc allows you to push things into the gateway from outside if necessary
    // Mutex allows the gateway to be driven by several futures at once
    type MockField<T> = Arc<Mutex<T>>;

    /// The gateway endpoints, used to seed failures and inspect calls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Endpoint {
        Login,
        Logout,
        Breeds,
        Search,
        Details,
        Match,
    }

    /// A failure the mock should produce instead of its canned response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockFailure {
        /// Respond as if the credential was rejected (HTTP 401)
        Unauthorized,
        /// Respond with the given HTTP status
        Status(u16),
    }

    impl From<MockFailure> for GatewayError {
        fn from(failure: MockFailure) -> Self {
            match failure {
                MockFailure::Unauthorized => GatewayError::Unauthorized,
                MockFailure::Status(status) => GatewayError::Status {
                    status: StatusCode::from_u16(status)
                        .expect("mock failure status should be valid"),
                    detail: Some("mock failure".to_string()),
                },
            }
        }
    }

    /// A call received by the mock, in arrival order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Login(String),
        Logout,
        Breeds,
        Search(SearchQuery),
        Details(Vec<CandidateId>),
        Match(Vec<CandidateId>),
    }

    impl Call {
        pub fn endpoint(&self) -> Endpoint {
            match self {
                Call::Login(_) => Endpoint::Login,
                Call::Logout => Endpoint::Logout,
                Call::Breeds => Endpoint::Breeds,
                Call::Search(_) => Endpoint::Search,
                Call::Details(_) => Endpoint::Details,
                Call::Match(_) => Endpoint::Match,
            }
        }
    }

    #[derive(Debug, Default)]
    struct MockState {
        breeds: BreedCatalog,
        candidates: HashMap<CandidateId, Candidate>,
        search_results: HashMap<SearchQuery, Vec<CandidateId>>,
        search_delays: HashMap<SearchQuery, Duration>,
        match_responses: VecDeque<Option<CandidateId>>,
        failures: HashMap<Endpoint, VecDeque<MockFailure>>,
        reverse_details: bool,
        calls: Vec<Call>,
    }

    /// A gateway that can be seeded with canned responses.
    ///
    /// Search results are keyed by query, so that several in flight
    /// requests can be answered independently of their arrival order.
    /// Queries without a seeded result answer with no identifiers.
    #[derive(Debug, Default, Clone)]
    pub struct MockGateway {
        state: MockField<MockState>,
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().expect("couldn't acquire mock lock")
        }

        pub fn set_breeds(&self, breeds: impl IntoIterator<Item = impl Into<String>>) {
            self.state().breeds =
                BreedCatalog::from(breeds.into_iter().map(Into::into).collect::<Vec<_>>());
        }

        /// Make records available to the details endpoint.
        pub fn add_candidates(&self, candidates: impl IntoIterator<Item = Candidate>) {
            let mut state = self.state();
            for candidate in candidates {
                state.candidates.insert(candidate.id.clone(), candidate);
            }
        }

        pub fn set_search_result(
            &self,
            query: SearchQuery,
            ids: impl IntoIterator<Item = impl Into<CandidateId>>,
        ) {
            self.state()
                .search_results
                .insert(query, ids.into_iter().map(Into::into).collect());
        }

        /// Delay the response to `query` by `delay`.
        pub fn set_search_delay(&self, query: SearchQuery, delay: Duration) {
            self.state().search_delays.insert(query, delay);
        }

        /// Return detail records in reverse request order.
        pub fn set_reverse_details(&self, reverse: bool) {
            self.state().reverse_details = reverse;
        }

        /// Push a new response into the list of match responses
        pub fn push_match_response(&self, matched: Option<impl Into<CandidateId>>) {
            self.state()
                .match_responses
                .push_back(matched.map(Into::into));
        }

        /// Fail the next call to `endpoint`.
        pub fn push_failure(&self, endpoint: Endpoint, failure: MockFailure) {
            self.state()
                .failures
                .entry(endpoint)
                .or_default()
                .push_back(failure);
        }

        /// All calls received so far.
        pub fn calls(&self) -> Vec<Call> {
            self.state().calls.clone()
        }

        pub fn call_count(&self, endpoint: Endpoint) -> usize {
            self.state()
                .calls
                .iter()
                .filter(|call| call.endpoint() == endpoint)
                .count()
        }

        /// Record `call` and return a seeded failure for its endpoint, if any.
        fn record(&self, call: Call) -> Result<(), GatewayError> {
            let mut state = self.state();
            let endpoint = call.endpoint();
            state.calls.push(call);
            match state
                .failures
                .get_mut(&endpoint)
                .and_then(VecDeque::pop_front)
            {
                Some(failure) => Err(failure.into()),
                None => Ok(()),
            }
        }
    }

    impl Gateway for MockGateway {
        async fn login(&self, credentials: &Credentials) -> Result<(), GatewayError> {
            self.record(Call::Login(credentials.name().to_string()))
        }

        async fn logout(&self) -> Result<(), GatewayError> {
            self.record(Call::Logout)
        }

        async fn breeds(&self) -> Result<BreedCatalog, GatewayError> {
            self.record(Call::Breeds)?;
            Ok(self.state().breeds.clone())
        }

        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, GatewayError> {
            let delay = self.state().search_delays.get(query).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.record(Call::Search(query.clone()))?;
            let result_ids = self
                .state()
                .search_results
                .get(query)
                .cloned()
                .unwrap_or_default();
            Ok(SearchResponse {
                result_ids,
                total: None,
            })
        }

        async fn details(&self, ids: &[CandidateId]) -> Result<Vec<Candidate>, GatewayError> {
            self.record(Call::Details(ids.to_vec()))?;
            let state = self.state();
            let mut candidates = ids
                .iter()
                .filter_map(|id| state.candidates.get(id).cloned())
                .collect::<Vec<_>>();
            if state.reverse_details {
                candidates.reverse();
            }
            Ok(candidates)
        }

        async fn match_candidates(
            &self,
            ids: &[CandidateId],
        ) -> Result<MatchResponse, GatewayError> {
            self.record(Call::Match(ids.to_vec()))?;
            let matched = self
                .state()
                .match_responses
                .pop_front()
                .expect("no match response seeded in mock gateway");
            Ok(MatchResponse { matched })
        }
    }

    /// A well formed candidate record for tests.
    pub fn mock_candidate(id: &str, breed: &str) -> Candidate {
        Candidate {
            id: CandidateId::from(id),
            name: format!("dog {id}"),
            breed: breed.to_string(),
            age: 3,
            zip_code: "10001".to_string(),
            img: format!("https://example.com/{id}.jpg")
                .parse()
                .expect("mock image url should parse"),
        }
    }
}
