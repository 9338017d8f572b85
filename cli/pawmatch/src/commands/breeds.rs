use std::io::Write;

use anyhow::Result;
use bpaf::Bpaf;
use pawmatch_catalog::Gateway;
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::instrument;

use super::auth::{CredentialArgs, credential_args, end_session, start_session};
use crate::config::Config;

// List all breeds in the catalog
#[derive(Debug, Clone, Bpaf)]
pub struct Breeds {
    #[bpaf(external(credential_args))]
    pub credentials: CredentialArgs,

    /// Display the breeds as a JSON array
    #[bpaf(long)]
    pub json: bool,
}

impl Breeds {
    #[instrument(name = "breeds", fields(json = self.json), skip_all)]
    pub async fn handle<G: Gateway>(self, config: Config, mut pawmatch: Pawmatch<G>) -> Result<()> {
        start_session(&mut pawmatch, &self.credentials, &config).await?;
        let result = self.print_breeds(&mut pawmatch, &mut std::io::stdout()).await;
        end_session(&mut pawmatch).await;
        result
    }

    async fn print_breeds<G: Gateway>(
        &self,
        pawmatch: &mut Pawmatch<G>,
        out: &mut impl Write,
    ) -> Result<()> {
        let breeds = pawmatch.load_breeds().await?;

        if self.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&breeds)?)?;
        } else {
            for breed in breeds.iter() {
                writeln!(out, "{breed}")?;
            }
        }
        Ok(())
    }
}
