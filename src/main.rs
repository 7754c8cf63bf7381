use std::sync::Arc;

use anyhow::{Context, Result};

use lakewx::api::AppState;
use lakewx::cache::PersistentCache;
use lakewx::config::WxConfig;
use lakewx::provider::OpenMeteoProvider;
use lakewx::resolver::MergedForecastResolver;
use lakewx::web;

#[tokio::main]
async fn main() -> Result<()> {
    let config = WxConfig::load().context("Failed to load configuration")?;
    lakewx::init_tracing(&config.logging.level);

    let cache = PersistentCache::open(&config.provider.cache_dir)
        .context("Failed to open provider response cache")?;
    let provider = Arc::new(OpenMeteoProvider::new(&config.provider)?.with_cache(cache));

    let resolver = MergedForecastResolver::new(
        provider,
        config.provider.preferred_model.clone(),
        config.provider.fallback_model.clone(),
        config.provider.zone()?,
    );
    let state = Arc::new(AppState { resolver });

    web::run(config.server.port, &config.server.static_dir, state).await
}
