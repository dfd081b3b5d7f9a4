//! Startup wiring: config source, coordinator, dispatcher and the
//! background reload triggers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use notify::RecommendedWatcher;
use tracing::{info, warn};

use herald_core::Settings;
use herald_notify::{Dispatcher, NotifierSettings, RetryPolicy};
use herald_routing::loader::watch_config_file;
use herald_routing::snapshot::snapshot_subscriber;
use herald_routing::{ChannelLoader, ConfigLoader, ConfigOpts, Coordinator, FileLoader};

use crate::state::AppState;

/// Pick the config source: the query service when its URL is set, the
/// YAML file otherwise.
pub fn build_loader(settings: &Settings) -> anyhow::Result<Box<dyn ConfigLoader>> {
    match &settings.source.query_service_url {
        Some(url) => {
            let loader = ChannelLoader::new(url).context("invalid query service url")?;
            info!(url = %loader.channel_url(), "Loading channels from query service");
            Ok(Box::new(loader))
        }
        None => {
            info!(path = %settings.source.config_file.display(), "Loading config from file");
            Ok(Box::new(FileLoader::new(&settings.source.config_file)))
        }
    }
}

/// Build the coordinator and dispatcher and register the subscribers.
///
/// Nothing is loaded yet; call [`initial_reload`] afterwards.
pub fn build_app_state(settings: Settings) -> anyhow::Result<Arc<AppState>> {
    let loader = build_loader(&settings)?;
    let opts = ConfigOpts::from_defaults(&settings.routing, &settings.smtp);
    let coordinator = Arc::new(Coordinator::new(opts, loader));

    let notifier_settings = NotifierSettings {
        external_url: settings.server.external_url.clone(),
        timeout: settings.delivery.attempt_timeout,
        ..NotifierSettings::default()
    };
    let dispatcher = Arc::new(Dispatcher::new(
        notifier_settings,
        RetryPolicy::from(&settings.delivery),
    ));

    coordinator.subscribe(dispatcher.subscriber());
    if let Some(path) = &settings.source.snapshot_path {
        info!(path = %path.display(), "Config snapshots enabled");
        coordinator.subscribe(snapshot_subscriber(path.clone()));
    }

    Ok(Arc::new(AppState {
        coordinator,
        dispatcher,
        settings,
    }))
}

/// Run one reload off the async workers. Loaders and subscribers block.
pub async fn reload(coordinator: &Arc<Coordinator>) -> anyhow::Result<()> {
    let coordinator = coordinator.clone();
    tokio::task::spawn_blocking(move || coordinator.reload())
        .await
        .context("reload task panicked")?
        .map_err(Into::into)
}

/// Load the first config. A failure is logged and the service keeps
/// running so that a later reload or API call can fix it.
pub async fn initial_reload(state: &AppState) {
    match reload(&state.coordinator).await {
        Ok(()) => info!(
            receivers = state.dispatcher.receivers().len(),
            "Initial config loaded"
        ),
        Err(e) => warn!(error = %e, "Initial config load failed"),
    }
}

/// Reload on a fixed interval until the process exits.
pub fn spawn_reload_timer(coordinator: Arc<Coordinator>, every: Duration) {
    info!(interval_secs = every.as_secs(), "Periodic config reload enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately; the initial load already ran.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = reload(&coordinator).await {
                warn!(error = %e, "Periodic config reload failed");
            }
        }
    });
}

/// Reload whenever the config file changes. The watcher stops when the
/// returned handle is dropped.
pub fn watch_config(state: &AppState) -> anyhow::Result<Option<RecommendedWatcher>> {
    if !state.settings.source.watch {
        return Ok(None);
    }
    if state.settings.source.query_service_url.is_some() {
        warn!("Config watching ignored: channels come from the query service");
        return Ok(None);
    }
    let coordinator = state.coordinator.clone();
    // Watcher callbacks run on their own thread, so the blocking reload is fine here.
    let watcher = watch_config_file(&state.settings.source.config_file, move || {
        if let Err(e) = coordinator.reload() {
            warn!(error = %e, "Config reload after file change failed");
        }
    })
    .context("failed to watch config file")?;
    Ok(Some(watcher))
}
