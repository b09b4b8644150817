//! Title sentinels and the private relay URI scheme.
//!
//! When the bridge script cannot call back into the host directly it
//! exposes the captured token through one of two side channels: a
//! sentinel-prefixed document title, or a navigation to a private URI
//! scheme the host intercepts before it resolves. This module owns the
//! grammar of both channels; parsing is total.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

/// Private scheme used for the navigation side channel.
pub const RELAY_SCHEME: &str = "cadenza";

/// Host segment of the relay URI (`cadenza://token/<value>`).
const RELAY_HOST: &str = "token";

/// Title prefix announcing a captured token.
pub const TOKEN_TITLE_PREFIX: &str = "cadenza-token:";

/// Title prefix announcing a close-without-token request.
pub const CLOSE_TITLE_PREFIX: &str = "cadenza-close:";

/// Characters left verbatim when encoding a token into a URI path
/// segment (the unreserved set of RFC 3986).
const TOKEN_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A classified document title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleSignal {
    /// Title carried a captured token.
    Token(String),
    /// Title asked the host to close the surface without a relay.
    CloseRequested,
    /// An ordinary page title.
    Unrelated,
}

/// Classifies a document title observed on the authorization surface.
#[must_use]
pub fn parse_title(title: &str) -> TitleSignal {
    if let Some(value) = title.strip_prefix(TOKEN_TITLE_PREFIX) {
        return TitleSignal::Token(value.to_string());
    }
    if title.starts_with(CLOSE_TITLE_PREFIX) {
        return TitleSignal::CloseRequested;
    }
    TitleSignal::Unrelated
}

/// Formats the token-capture title for a given token.
#[must_use]
pub fn token_title(token: &str) -> String {
    format!("{TOKEN_TITLE_PREFIX}{token}")
}

/// Formats the close-without-token title.
#[must_use]
pub fn close_title() -> String {
    CLOSE_TITLE_PREFIX.to_string()
}

/// Builds the relay URI for a token: `cadenza://token/<encoded>`.
#[must_use]
pub fn relay_uri(token: &str) -> String {
    let encoded = utf8_percent_encode(token, TOKEN_SEGMENT);
    format!("{RELAY_SCHEME}://{RELAY_HOST}/{encoded}")
}

/// Decodes a token from an intercepted relay-scheme navigation.
///
/// Returns `None` for anything that is not a well-formed relay URI; the
/// caller still applies the token-shape heuristic to the decoded value.
#[must_use]
pub fn parse_relay_uri(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != RELAY_SCHEME || url.host_str() != Some(RELAY_HOST) {
        return None;
    }
    let segment = url.path_segments()?.next()?;
    if segment.is_empty() {
        return None;
    }
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(std::borrow::Cow::into_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relay_uri_round_trip_with_reserved_chars() {
        let token = "AbC+dEf/123==".repeat(6);
        let uri = relay_uri(&token);
        assert!(uri.starts_with("cadenza://token/"));
        assert_eq!(parse_relay_uri(&uri), Some(token));
    }

    #[test]
    fn test_parse_rejects_foreign_scheme() {
        assert_eq!(parse_relay_uri("https://token/abcdef"), None);
    }

    #[test]
    fn test_parse_rejects_wrong_host() {
        assert_eq!(parse_relay_uri("cadenza://other/abcdef"), None);
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert_eq!(parse_relay_uri("cadenza://token/"), None);
        assert_eq!(parse_relay_uri("not a uri"), None);
    }

    #[test]
    fn test_title_signals() {
        assert_eq!(
            parse_title("cadenza-token:abc123"),
            TitleSignal::Token("abc123".to_string())
        );
        assert_eq!(parse_title("cadenza-close:"), TitleSignal::CloseRequested);
        assert_eq!(parse_title("Sign in to listen"), TitleSignal::Unrelated);
    }

    #[test]
    fn test_token_title_round_trip() {
        let title = token_title("value-123");
        assert_eq!(parse_title(&title), TitleSignal::Token("value-123".into()));
    }
}
