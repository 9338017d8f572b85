use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::{env, fs};

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use pawmatch_catalog::{DEFAULT_BASE_URL, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use xdg::BaseDirectories;

/// Name of pawmatch managed directories
pub const PAWMATCH_DIR_NAME: &str = "pawmatch";
pub const PAWMATCH_CONFIG_DIR_VAR: &str = "PAWMATCH_CONFIG_DIR";
pub const PAWMATCH_CONFIG_FILE: &str = "pawmatch.toml";

/// Describes the configuration of the pawmatch CLI
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// The URL of the catalog service
    // Using a URL here adds an extra trailing slash,
    // so just use a String.
    pub base_url: String,

    /// Name used to log in if not given on the command line
    pub name: Option<String>,
    /// Email used to log in if not given on the command line
    pub email: Option<String>,

    /// Sort order of the first page
    pub default_sort: SortOrder,

    /// Fetch the full record of a match that is not on the current page
    pub match_details: bool,

    pub user_agent: Option<String>,

    /// Directory where pawmatch loads its configuration file (default:
    /// `$XDG_CONFIG_HOME/pawmatch`)
    pub config_dir: PathBuf,
}

impl Config {
    /// Creates a raw [Config] object and caches it for the lifetime of the program
    fn raw_config(reload: bool) -> Result<HierarchicalConfig> {
        static INSTANCE: Mutex<Option<HierarchicalConfig>> = Mutex::new(None);

        let mut config_guard = INSTANCE
            .lock()
            .map_err(|_| anyhow::anyhow!("config mutex poisoned"))?;

        debug!(
            "reading raw config (initialized: {initialized}, reload: {reload})",
            initialized = config_guard.is_some()
        );

        if let Some(config) = config_guard.as_ref()
            && !reload
        {
            return Ok(config.clone());
        }

        let config = read_raw_config()?;
        *config_guard = Some(config.clone());
        Ok(config)
    }

    /// Creates a [Config] from the environment and config files
    ///
    /// When running in tests, the config is reloaded on every call.
    pub fn parse() -> Result<Config> {
        #[cfg(test)]
        let reload = true;

        #[cfg(not(test))]
        let reload = false;

        let final_config = Self::raw_config(reload)?;
        let cli_config: Config = final_config
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(cli_config)
    }
}

/// Locate the config directory, creating it if necessary
fn config_dir(dirs: &BaseDirectories) -> Result<PathBuf> {
    let config_dir = match env::var(PAWMATCH_CONFIG_DIR_VAR) {
        Ok(v) => {
            debug!("`${PAWMATCH_CONFIG_DIR_VAR}` set: {v}");
            PathBuf::from(v)
        },
        Err(_) => {
            let config_dir = dirs
                .get_config_home()
                .context("Could not determine config directory, is $HOME set?")?;
            debug!("`${PAWMATCH_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
            config_dir
        },
    };
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Could not create config directory: {config_dir:?}"))?;
    Ok(config_dir)
}

fn read_raw_config() -> Result<HierarchicalConfig> {
    let pawmatch_dirs = BaseDirectories::with_prefix(PAWMATCH_DIR_NAME);
    let config_dir = config_dir(&pawmatch_dirs)?;

    let mut builder = HierarchicalConfig::builder()
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("default_sort", SortOrder::default().to_string())?
        .set_default("match_details", true)?
        // Config dir is added to the config for completeness;
        // the config file cannot change the config dir.
        .set_override("config_dir", config_dir.to_string_lossy().as_ref())?;

    // read from /etc
    builder = builder.add_source(
        config::File::from(
            PathBuf::from("/etc")
                .join(PAWMATCH_DIR_NAME)
                .join(PAWMATCH_CONFIG_FILE),
        )
        .format(config::FileFormat::Toml)
        .required(false),
    );

    // look for files in XDG_CONFIG_DIRS locations
    for file in pawmatch_dirs.find_config_files(PAWMATCH_CONFIG_FILE) {
        if file.parent() == Some(config_dir.as_path()) {
            continue;
        }
        builder = builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
    }

    // Add explicit config dir file last
    builder = builder.add_source(
        config::File::from(config_dir.join(PAWMATCH_CONFIG_FILE))
            .format(config::FileFormat::Toml)
            .required(false),
    );

    // override via env variables
    let pawmatch_envs = env::vars()
        .filter_map(|(k, v)| {
            k.strip_prefix("PAWMATCH_")
                .filter(|k| *k != "CONFIG_DIR")
                .map(|k| (k.to_lowercase(), v))
        })
        .collect::<HashMap<_, _>>();

    let final_config = builder
        .add_source(
            Environment::default()
                .source(Some(pawmatch_envs))
                .try_parsing(true),
        )
        .build()?;
    Ok(final_config)
}
