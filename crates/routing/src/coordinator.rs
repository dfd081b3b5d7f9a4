//! Single owner of the live configuration.
//!
//! Every reload and mutation runs under one exclusive lock for its whole
//! duration: build the next config, validate it, install it, then notify
//! subscribers in registration order. Concurrent callers are serialized, so
//! no update is lost and nobody observes a half-edited config.
//!
//! Subscribers run after the new config is installed. If one fails, the
//! config stays installed, later subscribers are skipped and the failure is
//! reported to the caller and in the reload metrics.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{ConfigError, Result};
use crate::loader::ConfigLoader;
use crate::schema::{Config, ConfigOpts, Receiver, Route};
use crate::snapshot::content_hash;

/// Outcome of a subscriber callback.
pub type SubscriberResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback invoked with every newly installed config.
pub type Subscriber = Box<dyn Fn(&Config) -> SubscriberResult + Send + Sync>;

/// Point-in-time view of the reload gauges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinatorMetrics {
    /// Low 48 bits of the installed config's content hash.
    pub config_hash: f64,
    pub last_reload_successful: bool,
    /// Unix seconds of the last fully successful install; 0 if none yet.
    pub last_reload_success_timestamp_seconds: i64,
}

#[derive(Default)]
struct Gauges {
    config_hash: AtomicU64,
    last_reload_successful: AtomicBool,
    last_success_ts: AtomicI64,
}

impl Gauges {
    fn record_success(&self, original: &str) {
        let hash = content_hash(original.as_bytes());
        self.config_hash.store(hash.to_bits(), Ordering::Relaxed);
        self.last_success_ts.store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
        self.last_reload_successful.store(true, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.last_reload_successful.store(false, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            config_hash: f64::from_bits(self.config_hash.load(Ordering::Relaxed)),
            last_reload_successful: self.last_reload_successful.load(Ordering::Relaxed),
            last_reload_success_timestamp_seconds: self.last_success_ts.load(Ordering::Relaxed),
        }
    }
}

struct State {
    config: Option<Arc<Config>>,
    subscribers: Vec<Subscriber>,
}

pub struct Coordinator {
    opts: ConfigOpts,
    loader: Box<dyn ConfigLoader>,
    state: Mutex<State>,
    gauges: Gauges,
}

impl Coordinator {
    pub fn new(opts: ConfigOpts, loader: Box<dyn ConfigLoader>) -> Self {
        Self {
            opts,
            loader,
            state: Mutex::new(State { config: None, subscribers: Vec::new() }),
            gauges: Gauges::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("coordinator state lock poisoned")
    }

    /// Register a callback for every future install.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&Config) -> SubscriberResult + Send + Sync + 'static,
    {
        self.lock().subscribers.push(Box::new(subscriber));
    }

    /// The live config, if one has been installed.
    pub fn config(&self) -> Option<Arc<Config>> {
        self.lock().config.clone()
    }

    /// Textual form of the live config; empty before the first install.
    pub fn original(&self) -> String {
        self.lock()
            .config
            .as_ref()
            .map(|c| c.original().to_string())
            .unwrap_or_default()
    }

    /// Readable without taking the config lock.
    pub fn metrics(&self) -> CoordinatorMetrics {
        self.gauges.snapshot()
    }

    /// Build a fresh config from the loader and install it.
    ///
    /// A loader or validation failure leaves the live config in place.
    pub fn reload(&self) -> Result<()> {
        let mut state = self.lock();
        info!("loading a new configuration");

        let mut next = Config::initial(&self.opts);
        if let Err(e) = self.loader.load(&mut next).and_then(|()| next.validate()) {
            error!(error = %e, "configuration update failed");
            self.gauges.record_failure();
            return Err(e);
        }

        info!(receivers = next.receivers.len(), "completed loading of configuration");
        self.install(&mut state, next);
        self.notify_subscribers(&state)
    }

    /// Re-run all subscribers against the live config.
    pub fn on_update(&self) -> Result<()> {
        let state = self.lock();
        self.notify_subscribers(&state)
    }

    pub fn add_route(&self, route: Route, receiver: Receiver) -> Result<()> {
        self.apply("add", move |config| config.add_route(route, receiver))
    }

    pub fn edit_route(&self, route: Route, receiver: Receiver) -> Result<()> {
        self.apply("edit", move |config| config.edit_route(route, receiver))
    }

    pub fn delete_route(&self, name: &str) -> Result<()> {
        self.apply("delete", |config| config.delete_route(name))
    }

    /// Clone the live config, edit and validate the clone, install it.
    fn apply<F>(&self, op: &'static str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Config) -> Result<()>,
    {
        let mut state = self.lock();
        let current = state.config.as_ref().ok_or(ConfigError::NotInitialized)?;

        let mut next = Config::clone(current);
        if let Err(e) = mutate(&mut next).and_then(|()| next.validate()) {
            warn!(op, error = %e, "rejected config change");
            return Err(e);
        }

        info!(op, receivers = next.receivers.len(), "applied config change");
        self.install(&mut state, next);
        self.notify_subscribers(&state)
    }

    fn install(&self, state: &mut State, mut config: Config) {
        if let Err(e) = config.refresh_original() {
            error!(error = %e, "failed to serialize installed config");
        }
        state.config = Some(Arc::new(config));
    }

    fn notify_subscribers(&self, state: &State) -> Result<()> {
        let Some(config) = state.config.as_ref() else {
            return Err(ConfigError::NotInitialized);
        };
        for (i, subscriber) in state.subscribers.iter().enumerate() {
            if let Err(e) = subscriber(config) {
                warn!(subscriber = i, error = %e, "config subscriber failed");
                self.gauges.record_failure();
                return Err(ConfigError::Subscriber(e.to_string()));
            }
        }
        self.gauges.record_success(config.original());
        Ok(())
    }
}
