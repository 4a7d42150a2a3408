//! Shared HTTP utilities for the event site.
//!
//! Provides HTML escaping, cookie header helpers, and time formatting used by
//! the server-rendered views.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use std::time::{Duration, SystemTime};

// ============================================================================
// HTML
// ============================================================================

/// Escape text for use in HTML element content and quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Build an `href` for a path segment, percent-encoding the segment.
pub fn segment_href(prefix: &str, segment: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), urlencoding::encode(segment))
}

// ============================================================================
// Cookies
// ============================================================================

/// Find the value of cookie `name` in a `Cookie` request header value.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

/// `Set-Cookie` value for an HTTP-only session cookie living `max_age`.
pub fn session_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that removes cookie `name`.
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert SystemTime to RFC3339 string (seconds precision, UTC).
pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let dt: DateTime<Utc> = t.into();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human readable local time, e.g. `2024-03-01 18:30`.
pub fn display_time(t: SystemTime) -> String {
    let dt: DateTime<Local> = t.into();
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_segment_href() {
        assert_eq!(segment_href("", "test-event"), "/test-event");
        assert_eq!(segment_href("/admin", "test-event"), "/admin/test-event");
        assert_eq!(segment_href("/admin/", "a?b"), "/admin/a%3Fb");
        assert_eq!(segment_href("", "þorri"), "/%C3%BEorri");
    }

    #[test]
    fn test_cookie_value() {
        let header = "theme=dark; sid=abc-123; other=1";
        assert_eq!(cookie_value(header, "sid"), Some("abc-123"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("", "sid"), None);
        assert_eq!(cookie_value("sidx=1", "sid"), None);
    }

    #[test]
    fn test_cookie_builders() {
        assert_eq!(
            session_cookie("sid", "v", Duration::from_secs(1200)),
            "sid=v; Path=/; HttpOnly; SameSite=Lax; Max-Age=1200"
        );
        assert!(expired_cookie("sid").starts_with("sid=;"));
        assert!(expired_cookie("sid").ends_with("Max-Age=0"));
    }

    #[test]
    fn test_system_time_to_rfc3339() {
        assert_eq!(system_time_to_rfc3339(UNIX_EPOCH), "1970-01-01T00:00:00Z");
        assert_eq!(
            system_time_to_rfc3339(UNIX_EPOCH + Duration::from_secs(86_400 + 61)),
            "1970-01-02T00:01:01Z"
        );
    }
}
