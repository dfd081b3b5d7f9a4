//! String helpers shared by notifiers: truncation and URL redaction.

use crate::traits::NotifyError;

const REDACTED: &str = "<redacted>";
const RUNE_MARKER: &str = "…";
const ASCII_MARKER: &str = "...";

pub fn default_user_agent() -> String {
    format!("Herald/{}", env!("CARGO_PKG_VERSION"))
}

/// Largest char boundary of `s` that is `<= index`.
fn floor_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Truncate to at most `n` bytes, ending in `...` when `n > 3`.
///
/// Never splits a multi-byte character, so the result can be shorter than `n`.
pub fn truncate(s: &str, n: usize) -> (String, bool) {
    if s.len() <= n {
        return (s.to_string(), false);
    }
    if n <= 3 {
        return (s[..floor_boundary(s, n)].to_string(), true);
    }
    let cut = floor_boundary(s, n - ASCII_MARKER.len());
    (format!("{}{ASCII_MARKER}", &s[..cut]), true)
}

/// Truncate to at most `n` characters, ending in `…` when `n > 3`.
pub fn truncate_in_runes(s: &str, n: usize) -> (String, bool) {
    if s.chars().count() <= n {
        return (s.to_string(), false);
    }
    if n <= 3 {
        return (s.chars().take(n).collect(), true);
    }
    let mut out: String = s.chars().take(n - 1).collect();
    out.push_str(RUNE_MARKER);
    (out, true)
}

/// Wrap a transport error with its URL removed.
pub fn redact_url(err: reqwest::Error) -> NotifyError {
    NotifyError::Http(err.without_url())
}

/// Replace every occurrence of `url`, and of its host and path, in `message`.
pub fn redact_in(message: &str, url: &str) -> String {
    if url.is_empty() {
        return message.to_string();
    }
    let mut out = message.replace(url, REDACTED);
    let trimmed = url.trim_end_matches('/');
    if !trimmed.is_empty() {
        out = out.replace(trimmed, REDACTED);
    }
    if let Ok(parsed) = url::Url::parse(url) {
        let path = parsed.path().trim_end_matches('/');
        if !path.is_empty() {
            out = out.replace(path, REDACTED);
        }
        if let Some(host) = parsed.host_str() {
            out = out.replace(host, REDACTED);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_bytes() {
        assert_eq!(truncate("hello world", 5), ("he...".to_string(), true));
        assert_eq!(truncate("hi", 5), ("hi".to_string(), false));
        assert_eq!(truncate("hello", 3), ("hel".to_string(), true));
        assert_eq!(truncate("hello", 5), ("hello".to_string(), false));
    }

    #[test]
    fn truncate_bytes_keeps_char_boundaries() {
        // "é" is two bytes; cutting at 5 would split the third one.
        let (out, truncated) = truncate("ééééé", 8);
        assert!(truncated);
        assert_eq!(out, "éé...");
        assert!(out.len() <= 8);
    }

    #[test]
    fn truncate_runes_counts_code_points() {
        assert_eq!(truncate_in_runes("日本語テキスト", 4), ("日本語…".to_string(), true));
        assert_eq!(truncate_in_runes("日本語", 3), ("日本語".to_string(), false));
        assert_eq!(truncate_in_runes("日本語テ", 3), ("日本語".to_string(), true));
        assert_eq!(truncate_in_runes("hello world", 5), ("hell…".to_string(), true));
    }

    #[test]
    fn redaction_removes_host_and_path() {
        let url = "https://hooks.example.com/services/T000/B000/XXXX";
        let msg = format!("error sending request for url ({url}): connection refused");
        let out = redact_in(&msg, url);
        assert!(!out.contains("hooks.example.com"), "{out}");
        assert!(!out.contains("/services/T000/B000/XXXX"), "{out}");
        assert!(out.contains("connection refused"));

        let partial = redact_in("dns error for hooks.example.com", url);
        assert!(!partial.contains("hooks.example.com"));
    }

    #[tokio::test]
    async fn redact_url_strips_transport_errors() {
        let url = "http://127.0.0.1:1/secret/path";
        let err = reqwest::Client::new().get(url).send().await.unwrap_err();
        let redacted = redact_url(err);
        let text = redacted.to_string();
        assert!(!text.contains("/secret/path"), "{text}");
        assert!(redacted.should_retry());
    }
}
