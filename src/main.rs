use servetracker::database;
use servetracker::error::AppError;
use servetracker::services::background_sync::{self, DEFAULT_POLL_INTERVAL_SECONDS};
use servetracker::services::remote::SupabaseRemote;
use servetracker::services::{settings_service, AppSession};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("servetracker failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let conn = database::init_database()?;

    let session = AppSession::hydrate(&conn)?;
    log::info!(
        "Loaded {} clients and {} serve attempts from the local store",
        session.clients.len(),
        session.serves.len()
    );

    let Some(settings) = settings_service::load_remote_settings(&conn)? else {
        log::warn!("Remote backend not configured; serving from the local cache only");
        return Ok(());
    };

    if !settings.enabled {
        log::warn!("Remote sync is disabled; serving from the local cache only");
        return Ok(());
    }

    let remote = SupabaseRemote::new(&settings)?;
    let session = Arc::new(Mutex::new(session));

    let poll_interval = if settings.poll_interval_secs > 0 {
        Duration::from_secs(settings.poll_interval_secs as u64)
    } else {
        Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS)
    };

    let handle = background_sync::start(remote, session, poll_interval);

    // Reconcile in the background until interrupted
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Other(format!("Failed to create runtime: {}", e)))?;
    runtime.block_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to wait for shutdown signal: {}", e);
        }
    });

    handle.stop();
    Ok(())
}
