//! Periodic snow tail job: one snowfall fetch, one object write.

use anyhow::{Context, Result};
use tracing::error;

use lakewx::config::WxConfig;
use lakewx::provider::{open_meteo, OpenMeteoProvider};
use lakewx::snow;
use lakewx::storage::HttpBlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = WxConfig::load().context("Failed to load configuration")?;
    lakewx::init_tracing(&config.logging.level);

    // Destination check comes first: no point fetching when the write
    // cannot land anywhere.
    let http = open_meteo::http_client(&config.provider)?;
    let store = HttpBlobStore::new(http, &config.snow.blob_base_url)?;

    let provider = OpenMeteoProvider::new(&config.provider)?;

    if let Err(err) = snow::run(&provider, &store, &config.snow).await {
        error!(%err, "Snow tail job failed");
        return Err(err.into());
    }
    Ok(())
}
