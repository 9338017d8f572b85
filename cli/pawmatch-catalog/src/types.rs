//! Catalog interaction types.
//!
//! These types represent the domain model for gateway operations.
//! Everything received from the service passes through a loosely typed
//! `Raw*` form first and is validated into the types below,
//! so that missing or malformed fields never reach the browsing core.

use std::fmt::Display;
use std::str::FromStr;

use derive_more::{Display as DeriveDisplay, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::RecordError;

/// Number of candidates requested per search page.
pub const PAGE_SIZE: u32 = 25;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Opaque identifier of an adoptable animal.
///
/// Identifiers received from the service are checked to be non-empty,
/// blank search results are skipped by the client and blank record ids
/// fail record validation.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, DeriveDisplay, From,
)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for CandidateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for CandidateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One adoptable animal as returned by the details endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCandidate")]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub breed: String,
    pub age: u32,
    pub zip_code: String,
    pub img: Url,
}

/// A candidate record before validation.
///
/// All fields are optional so that a single malformed record can be
/// rejected without failing the entire response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    pub id: Option<String>,
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age: Option<i64>,
    pub zip_code: Option<String>,
    pub img: Option<String>,
}

impl TryFrom<RawCandidate> for Candidate {
    type Error = RecordError;

    fn try_from(raw: RawCandidate) -> Result<Self, Self::Error> {
        let id = raw.id.ok_or(RecordError::MissingField("id"))?;
        if id.trim().is_empty() {
            return Err(RecordError::EmptyId);
        }
        let name = raw.name.ok_or(RecordError::MissingField("name"))?;
        let breed = raw.breed.ok_or(RecordError::MissingField("breed"))?;
        let age = raw.age.ok_or(RecordError::MissingField("age"))?;
        let age = u32::try_from(age).map_err(|_| RecordError::InvalidAge(age))?;
        let zip_code = raw.zip_code.ok_or(RecordError::MissingField("zip_code"))?;
        let img = raw.img.ok_or(RecordError::MissingField("img"))?;
        let img = Url::parse(&img).map_err(|_| RecordError::InvalidImage(img))?;

        Ok(Candidate {
            id: CandidateId(id),
            name,
            breed,
            age,
            zip_code,
            img,
        })
    }
}

// ---------------------------------------------------------------------------
// Breeds
// ---------------------------------------------------------------------------

/// Ordered list of breed names known to the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(transparent)]
pub struct BreedCatalog(Vec<String>);

impl BreedCatalog {
    pub fn contains(&self, breed: &str) -> bool {
        self.0.iter().any(|known| known == breed)
    }

    /// Case insensitive lookup returning the canonical spelling.
    pub fn find(&self, breed: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|known| known.eq_ignore_ascii_case(breed))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Sort direction over breed names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

impl SortOrder {
    /// The value of the `sort` query parameter.
    pub fn as_sort_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "breed:asc",
            SortOrder::Desc => "breed:desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid sort order '{0}', expected 'asc' or 'desc'")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

/// Parameters of a single ID search request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    /// Zero or one breed, empty means all breeds.
    pub breeds: Vec<String>,
    pub size: u32,
    pub from: u64,
    pub sort: SortOrder,
}

impl SearchQuery {
    /// Query for page `page_index` of [PAGE_SIZE] results.
    pub fn page(breed: Option<&str>, page_index: u32, sort: SortOrder) -> Self {
        Self {
            breeds: breed.map(ToString::to_string).into_iter().collect(),
            size: PAGE_SIZE,
            from: u64::from(page_index) * u64::from(PAGE_SIZE),
            sort,
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self
            .breeds
            .iter()
            .map(|breed| ("breeds", breed.clone()))
            .collect::<Vec<_>>();
        pairs.push(("size", self.size.to_string()));
        pairs.push(("from", self.from.to_string()));
        pairs.push(("sort", self.sort.as_sort_param().to_string()));
        pairs
    }
}

/// Identifiers matching a [SearchQuery].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "resultIds")]
    pub result_ids: Vec<CandidateId>,
    /// Total number of matches across all pages, if reported.
    ///
    /// Informational only, paging past the end simply yields no results.
    #[serde(default)]
    pub total: Option<u64>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Result of submitting favorites to the match endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawMatchResponse")]
pub struct MatchResponse {
    #[serde(rename = "match")]
    pub matched: Option<CandidateId>,
}

#[derive(Deserialize)]
struct RawMatchResponse {
    #[serde(rename = "match", default)]
    matched: Option<String>,
}

impl From<RawMatchResponse> for MatchResponse {
    fn from(raw: RawMatchResponse) -> Self {
        let matched = raw
            .matched
            .filter(|id| !id.trim().is_empty())
            .map(CandidateId);
        MatchResponse { matched }
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum CredentialsError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

/// Name and email used to establish a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    name: String,
    email: String,
}

impl Credentials {
    pub fn new(
        name: impl AsRef<str>,
        email: impl AsRef<str>,
    ) -> Result<Self, CredentialsError> {
        let name = name.as_ref().trim();
        let email = email.as_ref().trim();

        if name.is_empty() {
            return Err(CredentialsError::EmptyName);
        }

        let plausible_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            })
            && !email.contains(char::is_whitespace);
        if !plausible_email {
            return Err(CredentialsError::InvalidEmail(email.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
