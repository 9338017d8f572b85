use std::io::Write;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use pawmatch_catalog::{Gateway, SortOrder};
use pawmatch_sdk::models::browse::SearchCriteria;
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::{debug, instrument};

use super::auth::{CredentialArgs, credential_args, end_session, start_session};
use crate::config::Config;
use crate::utils::display::DisplayCandidates;
use crate::utils::message;

// Show one page of the catalog
#[derive(Debug, Clone, Bpaf)]
pub struct Search {
    #[bpaf(external(credential_args))]
    pub credentials: CredentialArgs,

    /// Only show dogs of this breed (case insensitive)
    #[bpaf(long, argument("BREED"))]
    pub breed: Option<String>,

    /// Page to show, starting at 1
    #[bpaf(long, argument("N"))]
    pub page: Option<u32>,

    /// Sort by breed, 'asc' or 'desc' (default: from config)
    #[bpaf(long, argument("ORDER"))]
    pub sort: Option<SortOrder>,

    /// Display the page as a JSON array
    #[bpaf(long)]
    pub json: bool,
}

impl Search {
    #[instrument(name = "search", skip_all, fields(breed = ?self.breed, page = ?self.page))]
    pub async fn handle<G: Gateway>(self, config: Config, mut pawmatch: Pawmatch<G>) -> Result<()> {
        start_session(&mut pawmatch, &self.credentials, &config).await?;
        let result = self
            .print_page(&mut pawmatch, &config, &mut std::io::stdout())
            .await;
        end_session(&mut pawmatch).await;
        result
    }

    async fn criteria<G: Gateway>(
        &self,
        pawmatch: &mut Pawmatch<G>,
        config: &Config,
    ) -> Result<SearchCriteria> {
        let page_index = match self.page {
            Some(0) => bail!("Pages start at 1"),
            Some(page) => page - 1,
            None => 0,
        };

        let breed = match &self.breed {
            None => None,
            Some(breed) => {
                let breeds = pawmatch.load_breeds().await?;
                match breeds.find(breed) {
                    Some(known) => Some(known.to_string()),
                    None => bail!("Unknown breed '{breed}', see 'pawmatch breeds' for all breeds"),
                }
            },
        };

        Ok(SearchCriteria {
            breed,
            page_index,
            sort: self.sort.unwrap_or(config.default_sort),
        })
    }

    async fn print_page<G: Gateway>(
        &self,
        pawmatch: &mut Pawmatch<G>,
        config: &Config,
        out: &mut impl Write,
    ) -> Result<()> {
        let criteria = self.criteria(pawmatch, config).await?;
        debug!(?criteria, "searching");
        pawmatch.set_criteria(criteria).await?;

        let page = pawmatch.current_page();

        if self.json {
            writeln!(out, "{}", serde_json::to_string_pretty(page.candidates())?)?;
            return Ok(());
        }

        if page.is_empty() {
            message::plain("No dogs found");
            return Ok(());
        }
        writeln!(out, "{}", DisplayCandidates::new(page.candidates()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pawmatch_catalog::{Credentials, SearchQuery};
    use pawmatch_sdk::providers::gateway::{Call, MockGateway, mock_candidate};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    fn config() -> Config {
        Config {
            base_url: "http://localhost".to_string(),
            name: None,
            email: None,
            default_sort: SortOrder::Desc,
            match_details: true,
            user_agent: None,
            config_dir: PathBuf::new(),
        }
    }

    fn args(breed: Option<&str>, page: Option<u32>, sort: Option<SortOrder>) -> Search {
        Search {
            credentials: CredentialArgs::default(),
            breed: breed.map(ToString::to_string),
            page,
            sort,
            json: false,
        }
    }

    async fn logged_in(gateway: &MockGateway) -> Pawmatch<MockGateway> {
        let mut pawmatch = Pawmatch::new(gateway.clone());
        pawmatch
            .login(&Credentials::new("Ada", "ada@example.com").unwrap())
            .await
            .unwrap();
        pawmatch
    }

    #[tokio::test]
    async fn breed_is_matched_case_insensitively() {
        let gateway = MockGateway::new();
        gateway.set_breeds(["Boxer", "Poodle"]);
        let mut pawmatch = logged_in(&gateway).await;

        let criteria = args(Some("poodle"), Some(3), None)
            .criteria(&mut pawmatch, &config())
            .await
            .unwrap();

        assert_eq!(criteria, SearchCriteria {
            breed: Some("Poodle".to_string()),
            page_index: 2,
            sort: SortOrder::Desc,
        });
    }

    #[tokio::test]
    async fn unknown_breed_is_an_error() {
        let gateway = MockGateway::new();
        gateway.set_breeds(["Boxer"]);
        let mut pawmatch = logged_in(&gateway).await;

        let err = args(Some("Wolf"), None, None)
            .criteria(&mut pawmatch, &config())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unknown breed 'Wolf'"), "{err}");
    }

    #[tokio::test]
    async fn page_zero_is_an_error() {
        let gateway = MockGateway::new();
        let mut pawmatch = logged_in(&gateway).await;

        let result = args(None, Some(0), None)
            .criteria(&mut pawmatch, &config())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn prints_page_as_json() {
        let gateway = MockGateway::new();
        gateway.add_candidates([mock_candidate("d1", "Boxer")]);
        let query = SearchQuery::page(None, 0, SortOrder::Asc);
        gateway.set_search_result(query.clone(), ["d1"]);
        let mut pawmatch = logged_in(&gateway).await;
        let mut search = args(None, None, Some(SortOrder::Asc));
        search.json = true;
        let mut out = Vec::new();

        search
            .print_page(&mut pawmatch, &config(), &mut out)
            .await
            .unwrap();

        let json: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json[0]["id"], "d1");
        assert_eq!(json[0]["breed"], "Boxer");
        let calls = gateway.calls().into_iter().skip(1).collect::<Vec<_>>();
        assert_eq!(calls, vec![Call::Search(query), Call::Details(vec!["d1".into()])]);
    }
}
