//! HTTP client for the pet adoption catalog service.
//!
//! This crate provides:
//! - HTTP client construction with a session cookie store
//! - Typed, validated records for everything the service returns
//! - Common error handling for catalog gateway operations
//! - The [`Gateway`] trait the browsing core is written against
//!
//! ## Usage
//!
//! ```ignore
//! use pawmatch_catalog::{Credentials, Gateway, GatewayClient, GatewayConfig};
//!
//! let client = GatewayClient::new(GatewayConfig::default())?;
//! client.login(&Credentials::new("Ada", "ada@example.com")?).await?;
//! let breeds = client.breeds().await?;
//! ```

mod client;
mod config;
mod error;
pub mod types;

pub use client::{Gateway, GatewayClient, MAX_DETAIL_BATCH};
pub use config::{DEFAULT_BASE_URL, GatewayConfig};
pub use error::{GatewayError, RecordError};
pub use reqwest::StatusCode;
pub use types::{
    BreedCatalog,
    Candidate,
    CandidateId,
    Credentials,
    CredentialsError,
    MatchResponse,
    PAGE_SIZE,
    ParseSortOrderError,
    RawCandidate,
    SearchQuery,
    SearchResponse,
    SortOrder,
};
