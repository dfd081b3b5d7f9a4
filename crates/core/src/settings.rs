use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        _ => default,
    }
}

// ── Top-level settings ────────────────────────────────────────

/// Process-level settings, read once at startup.
///
/// These are distinct from the routing configuration managed by the
/// coordinator: they decide where that configuration comes from and which
/// defaults a freshly initialised configuration starts with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerSettings,
    pub source: SourceSettings,
    pub routing: RouteDefaults,
    pub smtp: SmtpDefaults,
    pub delivery: DeliverySettings,
}

impl Settings {
    /// Build settings from environment variables (call `load_dotenv()` first).
    /// Profile is read from `HERALD_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("HERALD_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build settings for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerSettings::from_env_profiled(p),
            source: SourceSettings::from_env_profiled(p),
            routing: RouteDefaults::from_env_profiled(p),
            smtp: SmtpDefaults::from_env_profiled(p),
            delivery: DeliverySettings::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Settings loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   {}:{}", self.server.host, self.server.port);
        match &self.source.query_service_url {
            Some(url) => tracing::info!("  source:   query service {}", url),
            None => tracing::info!("  source:   file {}", self.source.config_file.display()),
        }
        tracing::info!(
            "  routing:  group_wait={}s group_interval={}s repeat_interval={}s",
            self.routing.group_wait.as_secs(),
            self.routing.group_interval.as_secs(),
            self.routing.repeat_interval.as_secs()
        );
        tracing::info!("  smtp:     {}:{} from={}", self.smtp.host, self.smtp.port, self.smtp.from);
    }

    /// Return a redacted view safe for API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "source": {
                "config_file": self.source.config_file,
                "remote": self.source.query_service_url.is_some(),
                "reload_interval_secs": self.source.reload_interval.map(|d| d.as_secs()),
                "watch": self.source.watch,
            },
            "routing": {
                "group_wait_secs": self.routing.group_wait.as_secs(),
                "group_interval_secs": self.routing.group_interval.as_secs(),
                "repeat_interval_secs": self.routing.repeat_interval.as_secs(),
                "resolve_timeout_secs": self.routing.resolve_timeout.as_secs(),
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// URL used in notifications to link back to the alerting UI.
    pub external_url: String,
}

impl ServerSettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HERALD_HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "HERALD_PORT", 9093),
            external_url: profiled_env_or(p, "HERALD_EXTERNAL_URL", "http://localhost:9093"),
        }
    }
}

// ── Config source ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    pub config_file: PathBuf,
    /// When set, configuration is assembled from the query service's
    /// channel list instead of the config file.
    pub query_service_url: Option<String>,
    /// Periodic reload interval; `None` disables the timer.
    pub reload_interval: Option<Duration>,
    pub snapshot_path: Option<PathBuf>,
    pub watch: bool,
}

impl SourceSettings {
    fn from_env_profiled(p: &str) -> Self {
        let reload_secs = profiled_env_u64(p, "HERALD_RELOAD_INTERVAL_SECS", 0);
        Self {
            config_file: PathBuf::from(profiled_env_or(p, "HERALD_CONFIG_FILE", "alertmanager.yml")),
            query_service_url: profiled_env_opt(p, "HERALD_QUERY_SERVICE_URL"),
            reload_interval: (reload_secs > 0).then(|| Duration::from_secs(reload_secs)),
            snapshot_path: profiled_env_opt(p, "HERALD_SNAPSHOT_PATH").map(PathBuf::from),
            watch: profiled_env_bool(p, "HERALD_WATCH_CONFIG", false),
        }
    }
}

// ── Routing defaults ──────────────────────────────────────────

/// Timing defaults applied to the root route of an initial configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDefaults {
    pub group_wait: Duration,
    pub group_interval: Duration,
    pub repeat_interval: Duration,
    pub resolve_timeout: Duration,
}

impl RouteDefaults {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            group_wait: Duration::from_secs(profiled_env_u64(p, "ALERTMANAGER_GROUP_WAIT", 30)),
            group_interval: Duration::from_secs(profiled_env_u64(p, "ALERTMANAGER_GROUP_INTERVAL", 300)),
            // minutes
            repeat_interval: Duration::from_secs(60 * profiled_env_u64(p, "ALERTMANAGER_REPEAT_INTERVAL", 240)),
            resolve_timeout: Duration::from_secs(60 * profiled_env_u64(p, "ALERTMANAGER_RESOLVE_TIMEOUT", 5)),
        }
    }
}

impl Default for RouteDefaults {
    fn default() -> Self {
        Self::from_env_profiled("")
    }
}

// ── SMTP defaults ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpDefaults {
    pub host: String,
    pub port: String,
    pub from: String,
}

impl SmtpDefaults {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "ALERTMANAGER_SMTP_HOST", "localhost"),
            port: profiled_env_or(p, "ALERTMANAGER_SMTP_PORT", "25"),
            from: profiled_env_or(p, "ALERTMANAGER_SMTP_FROM", "alertmanager@signoz.io"),
        }
    }
}

impl Default for SmtpDefaults {
    fn default() -> Self {
        Self::from_env_profiled("")
    }
}

// ── Delivery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySettings {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl DeliverySettings {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_attempts: profiled_env_u64(p, "HERALD_NOTIFY_MAX_ATTEMPTS", 3).max(1) as u32,
            attempt_timeout: Duration::from_secs(profiled_env_u64(p, "HERALD_NOTIFY_TIMEOUT_SECS", 10)),
            backoff_base: Duration::from_millis(profiled_env_u64(p, "HERALD_NOTIFY_BACKOFF_MS", 500)),
            backoff_max: Duration::from_millis(profiled_env_u64(p, "HERALD_NOTIFY_BACKOFF_MAX_MS", 30_000)),
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from_env_profiled("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("HERALD_TEST_PROFILE_KEY", "plain");
        env::set_var("STAGING_HERALD_TEST_PROFILE_KEY", "staged");
        assert_eq!(profiled_env_or("STAGING", "HERALD_TEST_PROFILE_KEY", "x"), "staged");
        assert_eq!(profiled_env_or("", "HERALD_TEST_PROFILE_KEY", "x"), "plain");
        assert_eq!(profiled_env_or("OTHER", "HERALD_TEST_PROFILE_KEY", "x"), "plain");
        assert_eq!(profiled_env_or("", "HERALD_TEST_PROFILE_MISSING", "x"), "x");
    }

    #[test]
    fn route_defaults_use_documented_units() {
        let d = RouteDefaults::from_env_profiled("NO_SUCH_PROFILE_FOR_DEFAULTS");
        if env::var("ALERTMANAGER_REPEAT_INTERVAL").is_err() {
            assert_eq!(d.repeat_interval, Duration::from_secs(240 * 60));
        }
        if env::var("ALERTMANAGER_GROUP_WAIT").is_err() {
            assert_eq!(d.group_wait, Duration::from_secs(30));
        }
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        env::set_var("HERALD_TEST_BAD_PORT", "not-a-port");
        assert_eq!(profiled_env_u16("", "HERALD_TEST_BAD_PORT", 9093), 9093);
    }
}
