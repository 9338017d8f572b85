use anyhow::{Context, Result, bail};
use bpaf::Bpaf;
use pawmatch_catalog::{Credentials, Gateway};
use pawmatch_sdk::models::notification::NoticeKind;
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::debug;

use crate::config::Config;
use crate::utils::dialog::{Dialog, Text};
use crate::utils::message;

/// Credentials given on the command line
#[derive(Debug, Clone, Default, Bpaf)]
pub struct CredentialArgs {
    /// Name to log in with (default: from config or prompt)
    #[bpaf(long, argument("NAME"))]
    pub name: Option<String>,

    /// Email to log in with (default: from config or prompt)
    #[bpaf(long, argument("EMAIL"))]
    pub email: Option<String>,
}

impl CredentialArgs {
    /// Resolve credentials from flags, then config, then an interactive prompt.
    ///
    /// Prompts are only shown if `interactive` is true.
    pub async fn resolve(&self, config: &Config, interactive: bool) -> Result<Credentials> {
        let name = self.name.clone().or_else(|| config.name.clone());
        let email = self.email.clone().or_else(|| config.email.clone());

        let (name, email) = match (name, email) {
            (Some(name), Some(email)) => (name, email),
            (name, email) if interactive => {
                let name = match name {
                    Some(name) => name,
                    None => prompt("Name:", None).await?,
                };
                let email = match email {
                    Some(email) => email,
                    None => prompt("Email:", None).await?,
                };
                (name, email)
            },
            _ => bail!(
                "Missing credentials, use '--name' and '--email' or set 'name' and 'email' in the config file"
            ),
        };

        Ok(Credentials::new(name, email)?)
    }
}

async fn prompt(message: &str, default: Option<String>) -> Result<String> {
    let value = Dialog {
        message,
        help_message: None,
        typed: Text { default },
    }
    .prompt()
    .await
    .context("Could not read credentials")?;
    Ok(value)
}

/// Log in with the given credentials.
///
/// If the service rejects the credentials and prompting is possible,
/// ask for new ones until a login succeeds or the prompt is cancelled.
pub async fn start_session<G: Gateway>(
    pawmatch: &mut Pawmatch<G>,
    args: &CredentialArgs,
    config: &Config,
) -> Result<()> {
    let interactive = Dialog::can_prompt();
    let mut credentials = args.resolve(config, interactive).await?;

    loop {
        match pawmatch.login(&credentials).await {
            Ok(()) => {
                debug!(user = credentials.name(), "session started");
                return Ok(());
            },
            Err(notice) if notice.kind == NoticeKind::AuthenticationFailed && interactive => {
                message::notice(&notice);
                let name = prompt("Name:", Some(credentials.name().to_string())).await?;
                let email = prompt("Email:", Some(credentials.email().to_string())).await?;
                credentials = match Credentials::new(name, email) {
                    Ok(credentials) => credentials,
                    Err(e) => {
                        message::error(e);
                        continue;
                    },
                };
            },
            Err(notice) => return Err(notice.into()),
        }
    }
}

/// End the session, reporting but not failing on remote errors
pub async fn end_session<G: Gateway>(pawmatch: &mut Pawmatch<G>) {
    if let Err(notice) = pawmatch.logout().await {
        message::warning(notice);
    }
}
