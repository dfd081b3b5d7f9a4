//! Scalar value types used across the configuration schema.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── HTTP URL ────────────────────────────────────────────────────────

/// An absolute `http`/`https` URL with a non-empty host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl(url::Url);

impl HttpUrl {
    pub fn parse(s: &str) -> Result<Self, String> {
        let parsed = url::Url::parse(s).map_err(|e| format!("invalid URL {s:?}: {e}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("unsupported scheme {:?} for URL", parsed.scheme()));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err("missing host for URL".to_string());
        }
        Ok(Self(parsed))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Append `/` to the path unless it already ends with one.
    pub fn ensure_trailing_slash(&mut self) {
        if !self.0.path().ends_with('/') {
            let path = format!("{}/", self.0.path());
            self.0.set_path(&path);
        }
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HttpUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(D::Error::custom)
    }
}

// ── Host/port pair ──────────────────────────────────────────────────

/// A `host:port` pair, e.g. an SMTP smarthost. Empty means "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: String,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self { host: host.into(), port: port.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.port.is_empty()
    }
}

impl FromStr for HostPort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("address {s}: missing ']' in address"))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| format!("address {s}: missing port in address"))?;
            (host, port)
        } else {
            let (host, port) = s
                .rsplit_once(':')
                .ok_or_else(|| format!("address {s}: missing port in address"))?;
            if host.contains(':') {
                return Err(format!("address {s}: too many colons in address"));
            }
            (host, port)
        };
        if port.is_empty() {
            return Err(format!("address {s}: port cannot be empty"));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            Ok(())
        } else if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Serialize for HostPort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HostPort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ── Secret ──────────────────────────────────────────────────────────

/// A credential. Serializes its value (snapshots must round-trip) but never
/// shows it in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("<secret>")
        }
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ── Duration ────────────────────────────────────────────────────────

const UNITS: &[(&str, u64)] = &[
    ("y", 365 * 24 * 60 * 60 * 1000),
    ("w", 7 * 24 * 60 * 60 * 1000),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
    ("ms", 1),
];

/// A duration written as a sequence of `<int><unit>` terms (`1h30m`, `500ms`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromDuration(Duration);

impl PromDuration {
    pub const ZERO: PromDuration = PromDuration(Duration::ZERO);

    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for PromDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl FromStr for PromDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "0" {
            return Ok(Self::ZERO);
        }
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }
        let invalid = || format!("not a valid duration string: {s:?}");
        let mut total: u64 = 0;
        let mut rest = s;
        // Units must appear from largest to smallest, each at most once.
        let mut next_unit = 0;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(invalid());
            }
            let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            rest = &rest[digits..];
            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];
            let idx = UNITS[next_unit..]
                .iter()
                .position(|(name, _)| *name == unit)
                .map(|i| i + next_unit)
                .ok_or_else(invalid)?;
            next_unit = idx + 1;
            total = value
                .checked_mul(UNITS[idx].1)
                .and_then(|ms| total.checked_add(ms))
                .ok_or_else(|| "duration out of range".to_string())?;
        }
        Ok(Self(Duration::from_millis(total)))
    }
}

impl fmt::Display for PromDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ms = self.0.as_millis() as u64;
        if ms == 0 {
            return f.write_str("0s");
        }
        for (name, unit) in UNITS {
            if ms >= *unit {
                write!(f, "{}{}", ms / unit, name)?;
                ms %= unit;
            }
        }
        Ok(())
    }
}

impl Serialize for PromDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PromDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ── Label names ─────────────────────────────────────────────────────

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parses_compound_terms() {
        let d: PromDuration = "1h30m".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_secs(5400));
        assert_eq!(d.to_string(), "1h30m");
        let d: PromDuration = "500ms".parse().unwrap();
        assert_eq!(d.as_duration(), Duration::from_millis(500));
        assert_eq!("0".parse::<PromDuration>().unwrap(), PromDuration::ZERO);
        assert_eq!(PromDuration::ZERO.to_string(), "0s");
        assert_eq!(PromDuration::from_secs(4 * 3600).to_string(), "4h");
    }

    #[test]
    fn duration_rejects_garbage() {
        for bad in ["", "5", "h", "5x", "1m1h", "1s1s", "-5m", "1.5h"] {
            assert!(bad.parse::<PromDuration>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn host_port_requires_port() {
        let hp: HostPort = "smtp.example.com:587".parse().unwrap();
        assert_eq!(hp, HostPort::new("smtp.example.com", "587"));
        let v6: HostPort = "[::1]:25".parse().unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.to_string(), "[::1]:25");
        assert!("smtp.example.com".parse::<HostPort>().is_err());
        assert!("smtp.example.com:".parse::<HostPort>().is_err());
        assert!("".parse::<HostPort>().unwrap().is_empty());
    }

    #[test]
    fn url_requires_http_scheme_and_host() {
        assert!(HttpUrl::parse("https://hooks.example.com/x").is_ok());
        assert!(HttpUrl::parse("ftp://example.com/").is_err());
        assert!(HttpUrl::parse("not a url").is_err());
        let mut u = HttpUrl::parse("https://api.opsgenie.com/v2").unwrap();
        u.ensure_trailing_slash();
        assert_eq!(u.as_str(), "https://api.opsgenie.com/v2/");
        u.ensure_trailing_slash();
        assert_eq!(u.as_str(), "https://api.opsgenie.com/v2/");
    }

    #[test]
    fn secret_hides_value_in_debug() {
        let s = Secret::new("hunter2");
        assert_eq!(format!("{s:?}"), "<secret>");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"hunter2\"");
    }

    #[test]
    fn label_names() {
        assert!(is_valid_label_name("alertname"));
        assert!(is_valid_label_name("_x1"));
        assert!(!is_valid_label_name("1x"));
        assert!(!is_valid_label_name("a-b"));
        assert!(!is_valid_label_name(""));
    }
}
