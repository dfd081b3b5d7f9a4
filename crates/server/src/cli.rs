//! Command-line flags. Environment settings (profiled) are read first by
//! `Settings::from_env`; any flag given here overrides them.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use herald_core::Settings;

#[derive(Parser, Debug, Default)]
#[command(name = "herald", version, about = "Alert routing and notification delivery service")]
pub struct Cli {
    /// Path of the YAML routing config.
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Base URL of the query service; when set, channels are loaded from it
    /// instead of the config file.
    #[arg(long)]
    pub query_service_url: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Reload the config every N seconds (0 disables the timer).
    #[arg(long)]
    pub reload_interval_secs: Option<u64>,

    /// Write every installed config to this path.
    #[arg(long)]
    pub snapshot_path: Option<PathBuf>,

    /// Reload when the config file changes on disk.
    #[arg(long)]
    pub watch: bool,
}

impl Cli {
    /// Apply the flags that were given on top of `settings`.
    pub fn apply(self, settings: &mut Settings) {
        if let Some(path) = self.config_file {
            settings.source.config_file = path;
        }
        if let Some(url) = self.query_service_url.filter(|u| !u.is_empty()) {
            settings.source.query_service_url = Some(url);
        }
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(secs) = self.reload_interval_secs {
            settings.source.reload_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(path) = self.snapshot_path {
            settings.source.snapshot_path = Some(path);
        }
        if self.watch {
            settings.source.watch = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let mut settings = Settings::for_profile("");
        let cli = Cli::parse_from([
            "herald",
            "--config-file",
            "/etc/herald/routes.yml",
            "--port",
            "9999",
            "--reload-interval-secs",
            "0",
            "--watch",
        ]);
        cli.apply(&mut settings);
        assert_eq!(settings.source.config_file, PathBuf::from("/etc/herald/routes.yml"));
        assert_eq!(settings.server.port, 9999);
        assert_eq!(settings.source.reload_interval, None);
        assert!(settings.source.watch);
    }

    #[test]
    fn absent_flags_keep_settings() {
        let mut settings = Settings::for_profile("");
        let before = settings.server.host.clone();
        Cli::default().apply(&mut settings);
        assert_eq!(settings.server.host, before);
    }
}
