use pawmatch_catalog::{Candidate, CandidateId, Gateway, GatewayError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::browse::ResultPage;
use super::favorites::FavoritesLedger;

/// The candidate selected by the match endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MatchResult {
    /// The full record was available
    Candidate(Candidate),
    /// Only the identifier is known
    Identifier(CandidateId),
}

impl MatchResult {
    pub fn id(&self) -> &CandidateId {
        match self {
            MatchResult::Candidate(candidate) => &candidate.id,
            MatchResult::Identifier(id) => id,
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            MatchResult::Candidate(candidate) => Some(candidate),
            MatchResult::Identifier(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    /// The service did not select any candidate
    NoMatch,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("no favorites selected")]
    EmptySelection,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Submits favorites for matching and resolves the selected candidate.
#[derive(Debug, Default)]
pub struct MatchResolver {
    current: Option<MatchResult>,
    detail_lookup: bool,
}

impl MatchResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the full record of a match that is not on the current page.
    pub fn with_detail_lookup(mut self, detail_lookup: bool) -> Self {
        self.detail_lookup = detail_lookup;
        self
    }

    /// The result of the last successful match request.
    pub fn current(&self) -> Option<&MatchResult> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Submit `favorites` and resolve the match.
    ///
    /// An empty ledger is rejected without contacting the gateway.
    /// Records already on `page` are reused.
    /// On error the previous result is kept.
    #[instrument(skip_all, fields(n_favorites = favorites.len()))]
    pub async fn generate_match(
        &mut self,
        gateway: &impl Gateway,
        favorites: &FavoritesLedger,
        page: &ResultPage,
    ) -> Result<MatchOutcome, MatchError> {
        if favorites.is_empty() {
            return Err(MatchError::EmptySelection);
        }

        let response = gateway.match_candidates(&favorites.all()).await?;

        let Some(id) = response.matched else {
            debug!("no match");
            self.current = None;
            return Ok(MatchOutcome::NoMatch);
        };

        let result = match page.get(&id) {
            Some(candidate) => {
                debug!(%id, "match found on current page");
                MatchResult::Candidate(candidate.clone())
            },
            None if self.detail_lookup => self.lookup(gateway, id).await?,
            None => MatchResult::Identifier(id),
        };

        self.current = Some(result.clone());
        Ok(MatchOutcome::Matched(result))
    }

    /// Fetch the record for `id`, falling back to the bare identifier
    /// unless the session has expired.
    async fn lookup(
        &self,
        gateway: &impl Gateway,
        id: CandidateId,
    ) -> Result<MatchResult, GatewayError> {
        match gateway.details(std::slice::from_ref(&id)).await {
            Ok(records) => match records.into_iter().find(|candidate| candidate.id == id) {
                Some(candidate) => Ok(MatchResult::Candidate(candidate)),
                None => {
                    debug!(%id, "match details not returned");
                    Ok(MatchResult::Identifier(id))
                },
            },
            Err(e) if e.is_session_expired() => Err(e),
            Err(e) => {
                warn!(%id, error = %e, "could not fetch match details");
                Ok(MatchResult::Identifier(id))
            },
        }
    }
}
