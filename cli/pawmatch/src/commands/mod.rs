mod auth;
mod breeds;
mod browse;
mod matching;
mod search;

use std::fmt;

use anyhow::Result;
use bpaf::{Bpaf, Parser};
use indoc::indoc;
use pawmatch_sdk::pawmatch::Pawmatch;
use tracing::debug;

use crate::config::Config;
use crate::utils::init::init_gateway_client;

static PAWMATCH_DESCRIPTION: &'_ str = indoc! {"
    Pawmatch browses a catalog of adoptable dogs.\n\n

    Filter and page through the catalog, pick your favorites,
    and let the service match you with one of them."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(PAWMATCH_DESCRIPTION))]
pub struct PawmatchCli(#[bpaf(external(pawmatch_args))] pub PawmatchArgs);

/// Main pawmatch args parser
///
/// To parse the pawmatch CLI, use [`PawmatchCli`] instead using [`pawmatch_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)]
pub struct PawmatchArgs {
    /// Verbose mode
    ///
    /// Invoke multiple times for increasing detail.
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    /// Print the version of the program
    #[allow(dead_code)] // fake arg, `--version` is checked for separately (see [Version])
    #[bpaf(long, short('V'))]
    version: bool,

    #[bpaf(external(commands))]
    command: Commands,
}

impl PawmatchArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        let client = init_gateway_client(&config)?;
        debug!(base_url = client.base_url(), "initialized gateway client");

        let pawmatch = Pawmatch::new(client)
            .with_default_sort(config.default_sort)
            .with_match_details(config.match_details);

        match self.command {
            Commands::Browse(args) => args.handle(config, pawmatch).await,
            Commands::Breeds(args) => args.handle(config, pawmatch).await,
            Commands::Search(args) => args.handle(config, pawmatch).await,
            Commands::Match(args) => args.handle(config, pawmatch).await,
        }
    }
}

#[derive(Bpaf, Clone)]
enum Commands {
    /// Browse the catalog interactively
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),

    /// List all breeds in the catalog
    #[bpaf(command)]
    Breeds(#[bpaf(external(breeds::breeds))] breeds::Breeds),

    /// Show one page of the catalog
    #[bpaf(command)]
    Search(#[bpaf(external(search::search))] search::Search),

    /// Match with one of the given dogs
    #[bpaf(command("match"))]
    Match(#[bpaf(external(matching::generate_match))] matching::GenerateMatch),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command")
    }
}

/// Fake argument used to parse `--version` separately
///
/// bpaf allows `pawmatch --invalid option --version`
/// (https://github.com/pacak/bpaf/issues/288) but common utilities,
/// such as git always require correct arguments even in the presence of
/// short circuiting flags such as `--version`
#[derive(Bpaf, Default)]
pub struct Version(#[bpaf(short('V'), long("version"))] bool);

impl Version {
    /// Parses to [Self] and extract the `--version` flag
    pub fn check() -> bool {
        bpaf::construct!(version(), pawmatch_args())
            .to_options()
            .run_inner(bpaf::Args::current_args())
            .map(|(v, _)| v)
            .unwrap_or_default()
            .0
    }
}
