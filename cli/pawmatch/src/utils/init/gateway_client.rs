use anyhow::{Context, Result};
use pawmatch_catalog::{GatewayClient, GatewayConfig};
use tracing::debug;

use crate::config::Config;

/// Environment variable to override the configured service URL,
/// used to point the CLI at a local mock service.
pub const PAWMATCH_GATEWAY_URL_VAR: &str = "_PAWMATCH_GATEWAY_URL";

/// Build the gateway configuration from the CLI configuration
pub fn gateway_config(config: &Config) -> GatewayConfig {
    let base_url = match std::env::var(PAWMATCH_GATEWAY_URL_VAR) {
        Ok(url) => {
            debug!(url, "using gateway url from ${PAWMATCH_GATEWAY_URL_VAR}");
            url
        },
        Err(_) => config.base_url.clone(),
    };

    let mut gateway_config = GatewayConfig::with_base_url(base_url);
    gateway_config.user_agent = Some(
        config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("pawmatch/{}", env!("CARGO_PKG_VERSION"))),
    );
    gateway_config
}

/// Initialize the catalog gateway client
pub fn init_gateway_client(config: &Config) -> Result<GatewayClient> {
    let gateway_config = gateway_config(config);
    debug!("using gateway client with url: {}", gateway_config.base_url);
    GatewayClient::new(gateway_config).context("Could not initialize the catalog client")
}
