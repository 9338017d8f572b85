//! Gateway client for the adoption catalog service.

use std::fmt::Debug;
use std::str::FromStr;

use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::*;

/// The details endpoint accepts at most this many identifiers per request.
pub const MAX_DETAIL_BATCH: usize = 100;

/// The complete catalog gateway interface.
///
/// This trait enables alternate implementations:
/// - **HTTP**: REST calls to the adoption service via [`GatewayClient`]
/// - **Mock** (core tests): canned responses without HTTP
///
/// Implementations are driven from a single logical control flow,
/// so the returned futures are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    /// Establish a session for `credentials`.
    async fn login(&self, credentials: &Credentials) -> Result<(), GatewayError>;

    /// End the current session.
    async fn logout(&self) -> Result<(), GatewayError>;

    /// List all breed names.
    async fn breeds(&self) -> Result<BreedCatalog, GatewayError>;

    /// Search for candidate identifiers.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, GatewayError>;

    /// Fetch full records for `ids`.
    ///
    /// The order of the returned records is determined by the service.
    async fn details(&self, ids: &[CandidateId]) -> Result<Vec<Candidate>, GatewayError>;

    /// Submit `ids` and receive the selected match, if any.
    async fn match_candidates(&self, ids: &[CandidateId]) -> Result<MatchResponse, GatewayError>;
}

/// A client for the adoption catalog service.
///
/// Wraps a [reqwest::Client] that handles:
/// - the session cookie set by `login` and sent on every later call
/// - HTTP timeouts
/// - extra default headers and the user agent
pub struct GatewayClient {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a new gateway client from configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Send a request and check its status, returning the raw response.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }
        Ok(response)
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

impl Gateway for GatewayClient {
    #[instrument(skip_all, fields(name = credentials.name()))]
    async fn login(&self, credentials: &Credentials) -> Result<(), GatewayError> {
        debug!("logging in");
        let request = self
            .client
            .post(self.config.endpoint("/auth/login"))
            .json(credentials);
        self.send(request).await?;
        debug!("session established");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn logout(&self) -> Result<(), GatewayError> {
        let request = self.client.post(self.config.endpoint("/auth/logout"));
        self.send(request).await?;
        debug!("session cleared");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn breeds(&self) -> Result<BreedCatalog, GatewayError> {
        let request = self.client.get(self.config.endpoint("/dogs/breeds"));
        let breeds: BreedCatalog = self.send_json(request).await?;
        debug!(n_breeds = breeds.len(), "received breeds");
        Ok(breeds)
    }

    #[instrument(skip_all, fields(breeds = ?query.breeds, from = query.from, sort = %query.sort))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, GatewayError> {
        debug!("sending search request");
        let request = self
            .client
            .get(self.config.endpoint("/dogs/search"))
            .query(&query.query_pairs());
        let mut response: SearchResponse = self.send_json(request).await?;

        let n_received = response.result_ids.len();
        response.result_ids.retain(|id| !id.is_blank());
        if response.result_ids.len() < n_received {
            warn!(
                n_skipped = n_received - response.result_ids.len(),
                "skipping blank candidate identifiers"
            );
        }

        debug!(
            n_results = response.result_ids.len(),
            total = ?response.total,
            "received search results"
        );
        Ok(response)
    }

    #[instrument(skip_all, fields(n_ids = ids.len()))]
    async fn details(&self, ids: &[CandidateId]) -> Result<Vec<Candidate>, GatewayError> {
        if ids.len() > MAX_DETAIL_BATCH {
            return Err(GatewayError::InvalidRequest(format!(
                "cannot fetch more than {MAX_DETAIL_BATCH} records at once, got {}",
                ids.len()
            )));
        }

        let request = self.client.post(self.config.endpoint("/dogs")).json(ids);
        let records: Vec<serde_json::Value> = self.send_json(request).await?;
        let (candidates, unrequested): (Vec<_>, Vec<_>) = validate_records(records)
            .into_iter()
            .partition(|candidate| ids.contains(&candidate.id));
        if !unrequested.is_empty() {
            let unrequested = unrequested.iter().map(|c| &c.id).collect::<Vec<_>>();
            warn!(?unrequested, "skipping records that were not requested");
        }
        debug!(n_candidates = candidates.len(), "received candidate details");
        Ok(candidates)
    }

    #[instrument(skip_all, fields(n_ids = ids.len()))]
    async fn match_candidates(&self, ids: &[CandidateId]) -> Result<MatchResponse, GatewayError> {
        let request = self
            .client
            .post(self.config.endpoint("/dogs/match"))
            .json(ids);
        let response: MatchResponse = self.send_json(request).await?;
        debug!(matched = ?response.matched, "received match");
        Ok(response)
    }
}

/// Validate each record on its own, dropping the ones that are malformed.
fn validate_records(records: Vec<serde_json::Value>) -> Vec<Candidate> {
    records
        .into_iter()
        .filter_map(|record| {
            let raw = match serde_json::from_value::<RawCandidate>(record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "skipping undecodable candidate record");
                    return None;
                },
            };
            let id = raw.id.clone();
            match Candidate::try_from(raw) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!(?id, error = %e, "skipping malformed candidate record");
                    None
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build the HTTP client with a cookie store for the session credential.
fn build_http_client(config: &GatewayConfig) -> Result<reqwest::Client, GatewayError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|e: header::InvalidHeaderName| GatewayError::Other(e.to_string()))?,
            header::HeaderValue::from_str(value)
                .map_err(|e: header::InvalidHeaderValue| GatewayError::Other(e.to_string()))?,
        );
    }

    debug!(
        base_url = %config.base_url,
        extra_headers = config.extra_headers.len(),
        "building gateway HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout);

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| GatewayError::Other(e.to_string()))
}
