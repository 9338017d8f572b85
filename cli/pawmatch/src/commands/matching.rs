use std::io::Write;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use pawmatch_catalog::{CandidateId, Gateway};
use pawmatch_sdk::models::matching::MatchOutcome;
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::instrument;

use super::auth::{CredentialArgs, credential_args, end_session, start_session};
use crate::config::Config;
use crate::utils::display::DisplayMatch;
use crate::utils::message;

// Match with one of the given dogs
#[derive(Debug, Clone, Bpaf)]
pub struct GenerateMatch {
    #[bpaf(external(credential_args))]
    pub credentials: CredentialArgs,

    /// Display the match as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Ids of the dogs to choose from
    #[bpaf(positional("ID"), many)]
    pub ids: Vec<String>,
}

impl GenerateMatch {
    #[instrument(name = "match", skip_all, fields(n_ids = self.ids.len()))]
    pub async fn handle<G: Gateway>(self, config: Config, mut pawmatch: Pawmatch<G>) -> Result<()> {
        if self.ids.is_empty() {
            bail!("No dogs given, pass the ids of your favorite dogs");
        }

        start_session(&mut pawmatch, &self.credentials, &config).await?;
        let result = self.print_match(&mut pawmatch, &mut std::io::stdout()).await;
        end_session(&mut pawmatch).await;
        result
    }

    async fn print_match<G: Gateway>(
        &self,
        pawmatch: &mut Pawmatch<G>,
        out: &mut impl Write,
    ) -> Result<()> {
        for id in &self.ids {
            let id = CandidateId::from(id.as_str());
            if !pawmatch.is_favorite(&id) {
                pawmatch.toggle_favorite(id);
            }
        }

        match pawmatch.generate_match().await? {
            MatchOutcome::Matched(result) if self.json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            },
            MatchOutcome::Matched(result) => {
                message::updated("You matched with:");
                writeln!(out, "{}", DisplayMatch(&result))?;
            },
            MatchOutcome::NoMatch => message::plain("The service did not pick a match"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pawmatch_catalog::Credentials;
    use pawmatch_sdk::providers::gateway::{Call, Endpoint, MockGateway, mock_candidate};
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(ids: &[&str], json: bool) -> GenerateMatch {
        GenerateMatch {
            credentials: CredentialArgs::default(),
            json,
            ids: ids.iter().map(ToString::to_string).collect(),
        }
    }

    async fn logged_in(gateway: &MockGateway) -> Pawmatch<MockGateway> {
        let mut pawmatch = Pawmatch::new(gateway.clone()).with_match_details(true);
        pawmatch
            .login(&Credentials::new("Ada", "ada@example.com").unwrap())
            .await
            .unwrap();
        pawmatch
    }

    #[tokio::test]
    async fn submits_each_id_once() {
        let gateway = MockGateway::new();
        gateway.add_candidates([mock_candidate("d2", "Boxer")]);
        gateway.push_match_response(Some("d2"));
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        args(&["d1", "d2", "d1"], false)
            .print_match(&mut pawmatch, &mut out)
            .await
            .unwrap();

        let Some(Call::Match(mut submitted)) = gateway
            .calls()
            .into_iter()
            .find(|call| call.endpoint() == Endpoint::Match)
        else {
            panic!("expected a match call");
        };
        submitted.sort();
        assert_eq!(submitted, vec![CandidateId::from("d1"), CandidateId::from("d2")]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "dog d2 (Boxer, 3 years, 10001)\n  https://example.com/d2.jpg\n"
        );
    }

    #[tokio::test]
    async fn prints_match_as_json() {
        let gateway = MockGateway::new();
        gateway.add_candidates([mock_candidate("d1", "Boxer")]);
        gateway.push_match_response(Some("d1"));
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        args(&["d1"], true)
            .print_match(&mut pawmatch, &mut out)
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["id"], "d1");
        assert_eq!(json["img"], "https://example.com/d1.jpg");
    }

    #[tokio::test]
    async fn no_match_is_not_an_error() {
        let gateway = MockGateway::new();
        gateway.push_match_response(None::<&str>);
        let mut pawmatch = logged_in(&gateway).await;
        let mut out = Vec::new();

        args(&["d1"], false)
            .print_match(&mut pawmatch, &mut out)
            .await
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(pawmatch.current_match(), None);
    }
}
