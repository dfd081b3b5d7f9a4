//! Config loaders.
//!
//! A loader fills in a freshly initialised [`Config`]; the coordinator then
//! validates and installs it. Two sources exist: a YAML file on disk (with
//! an optional change watcher) and the query service's channel list.

mod file;
mod remote;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::file::{load_file, load_str, FileLoader};
pub use self::remote::{decode_channel, ChannelItem, ChannelLoader};
pub use self::watcher::watch_config_file;

use crate::error::Result;
use crate::schema::Config;

/// Produces the next config. Any error means "no new config available".
pub trait ConfigLoader: Send + Sync {
    fn load(&self, config: &mut Config) -> Result<()>;
}

impl<F> ConfigLoader for F
where
    F: Fn(&mut Config) -> Result<()> + Send + Sync,
{
    fn load(&self, config: &mut Config) -> Result<()> {
        self(config)
    }
}
