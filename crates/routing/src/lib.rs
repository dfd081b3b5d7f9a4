//! Routing configuration for the alert delivery service.
//!
//! This crate provides:
//! - The typed configuration model (global defaults, route tree, receivers,
//!   inhibition rules, mute time intervals) with strict YAML/JSON decoding
//! - Whole-config validation with global-default inheritance
//! - Route/receiver mutations (add, edit, delete)
//! - The [`Coordinator`]: the single owner of the live configuration, which
//!   installs new versions and fans them out to subscribers
//! - Config loaders: a YAML file loader with a change watcher and a remote
//!   loader that assembles channels from the query service

pub mod coordinator;
pub mod error;
pub mod loader;
pub mod mutation;
pub mod schema;
pub mod snapshot;
pub mod validation;

pub use coordinator::{Coordinator, CoordinatorMetrics, Subscriber, SubscriberResult};
pub use error::{ConfigError, Result};
pub use loader::{ChannelLoader, ConfigLoader, FileLoader};
pub use schema::{Config, ConfigOpts, GlobalConfig, Matcher, Receiver, Route};
