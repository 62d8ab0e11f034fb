#![allow(clippy::uninlined_format_args)]

use std::env;
use std::sync::Arc;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use twistmap::aggregator;
use twistmap::commands;
use twistmap::db::Storage;
use twistmap::error::Error;
use twistmap::geo::{GeoLocationCache, Nominatim, RateLimiter};
use twistmap::ledger::JsonRpcClient;
use twistmap::orchestrator::CrawlOrchestrator;
use twistmap::profile::Profile;
use twistmap::settings::Settings;

fn main() -> Result<(), Error> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    let env_filter = EnvFilter::from_default_env();
    let max_level = match env_filter.max_level_hint() {
        Some(l) => l,
        None => LevelFilter::ERROR,
    };
    let show_debug = cfg!(debug_assertions) || max_level <= LevelFilter::DEBUG;
    tracing_subscriber::fmt::fmt()
        .with_target(false)
        .with_file(show_debug)
        .with_line_number(show_debug)
        .with_env_filter(env_filter)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    if let Err(e) = rt.block_on(tokio_main()) {
        tracing::error!("{}", e);
        return Err(e);
    }
    Ok(())
}

async fn tokio_main() -> Result<(), Error> {
    let profile = Profile::new()?;
    let path = profile.database_path();
    tracing::info!("Using database {}", path.display());

    // Setup the database (possibly create, possibly upgrade)
    let storage = Storage::open(&path)?;

    // If we were handed a command, execute the command and return
    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        return commands::handle_command(&args, &storage).await;
    }

    let mut settings = Settings::load(&storage).await?;
    settings.apply_env_overrides();

    let rpc = Arc::new(JsonRpcClient::new(
        &settings.rpc_url,
        &settings.rpc_user,
        &settings.rpc_password,
    )?);
    let geocoder = Arc::new(Nominatim::new(
        &settings.geocoder_url,
        settings.set_user_agent,
    )?);
    let limiter = RateLimiter::new(settings.geo_max_requests, settings.geo_window());
    let geo = GeoLocationCache::load(storage.clone(), geocoder, limiter, settings.geo_pacing()).await?;

    let orchestrator = CrawlOrchestrator::new(
        storage.clone(),
        rpc,
        Arc::new(geo),
        settings.refresh_ttl(),
        settings.checkpoint_every(),
    );
    let report = orchestrator.run().await?;
    if !report.failed.is_empty() {
        tracing::warn!("{} users could not be fetched this run", report.failed.len());
    }

    let users = storage.read_all_users().await?;
    let summary = aggregator::summarize(users.values());
    tracing::info!(
        "{} locations on the map: {} users placed, {} unresolved, {} without a location",
        summary.locations.len(),
        summary.users_with_location,
        summary.users_unresolved_location,
        summary.users_without_location
    );

    Ok(())
}
