//! The injected bridge script template.
//!
//! The shim must run inside the authorization surface's own script
//! context, so it is serialized to JavaScript here, built from this one
//! template with named placeholders rather than hand-assembled
//! concatenation.
//! The behavior mirrors [`super::OpenerEmulator`] and the domain
//! sentinel grammar; the unit tests pin the pieces a host controller
//! depends on.

use cadenza_domain::sentinel::{CLOSE_TITLE_PREFIX, RELAY_SCHEME, TOKEN_TITLE_PREFIX};
use cadenza_domain::token::MIN_TOKEN_LENGTH;

/// Delay before the relay-scheme navigation, letting the handshake
/// protocol's own response step complete first.
const NAV_DELAY_MS: u64 = 250;

/// Global marker flag guarding against double installation.
const INSTALL_MARKER: &str = "__cadenzaBridgeInstalled";

const TEMPLATE: &str = r#"(function () {
  if (window["@MARKER@"]) { return; }
  window["@MARKER@"] = true;

  var MIN_TOKEN_LENGTH = @MIN_TOKEN_LENGTH@;
  var DEVELOPER_TOKEN = @DEVELOPER_TOKEN@;
  var relayed = false;

  function looksLikeToken(value) {
    return typeof value === 'string' && value.length > MIN_TOKEN_LENGTH && value !== 'null';
  }

  function announce(token) {
    if (relayed) { return; }
    relayed = true;
    document.title = '@TOKEN_TITLE_PREFIX@' + token;
    setTimeout(function () {
      try {
        window.location.href = '@RELAY_SCHEME@://token/' + encodeURIComponent(token);
      } catch (e) { /* title channel already fired */ }
    }, @NAV_DELAY_MS@);
  }

  function extractCookieToken(value) {
    if (typeof value !== 'string') { return null; }
    var match = /media-user-token=([^;]+)/.exec(value);
    return (match && looksLikeToken(match[1])) ? match[1] : null;
  }

  function probeTokenField(value, depth) {
    if (depth > 3 || value === null || typeof value !== 'object') { return null; }
    var keys = ['token', 'musicUserToken', 'userToken', 'media-user-token'];
    for (var i = 0; i < keys.length; i++) {
      if (looksLikeToken(value[keys[i]])) { return value[keys[i]]; }
    }
    for (var key in value) {
      if (typeof value[key] === 'string') {
        var fromCookie = extractCookieToken(value[key]);
        if (fromCookie) { return fromCookie; }
      }
      var nested = probeTokenField(value[key], depth + 1);
      if (nested) { return nested; }
    }
    return null;
  }

  function handlePayload(data, respond) {
    if (relayed || data === null || data === undefined) { return; }
    if (typeof data === 'object' && typeof data.method === 'string') {
      var method = data.method.toLowerCase();
      if (method === 'authorize') {
        var param = data.params && data.params[0];
        if (looksLikeToken(param)) { announce(param); }
        return;
      }
      if (method === 'thirdpartyinfo') {
        if (DEVELOPER_TOKEN !== null && respond) {
          respond({
            id: (data.id === undefined) ? null : data.id,
            result: { developerToken: DEVELOPER_TOKEN }
          });
        }
        return;
      }
    }
    var token = extractCookieToken(data) || probeTokenField(data, 0);
    if (token) { announce(token); }
  }

  var mockOpener = {
    closed: false,
    location: { href: window.location.href },
    postMessage: function (data, origin) {
      handlePayload(data, function (envelope) {
        try { window.postMessage(envelope, '*'); } catch (e) {}
      });
    }
  };
  mockOpener.window = mockOpener;

  try {
    Object.defineProperty(window, 'opener', {
      get: function () { return mockOpener; },
      configurable: true
    });
  } catch (e) {
    try { window.opener = mockOpener; } catch (ignored) {}
  }

  window.addEventListener('message', function (event) {
    handlePayload(event.data, null);
  });

  var fromRedirect = extractCookieToken(document.cookie);
  if (fromRedirect) { announce(fromRedirect); }

  var nativeClose = window.close;
  window.close = function () {
    if (!relayed) { document.title = '@CLOSE_TITLE_PREFIX@'; }
    try { nativeClose.call(window); } catch (e) {}
  };
})();
"#;

/// Renders the bridge script for one injection.
///
/// `developer_token` is embedded (JSON-escaped) so the script can answer
/// the page's third-party identity handshake step; `None` renders a
/// script that leaves identity requests unanswered.
#[must_use]
pub fn bridge_script(developer_token: Option<&str>) -> String {
    let credential_literal = developer_token
        .and_then(|token| serde_json::to_string(token).ok())
        .unwrap_or_else(|| "null".to_string());

    TEMPLATE
        .replace("@MARKER@", INSTALL_MARKER)
        .replace("@MIN_TOKEN_LENGTH@", &MIN_TOKEN_LENGTH.to_string())
        .replace("@DEVELOPER_TOKEN@", &credential_literal)
        .replace("@TOKEN_TITLE_PREFIX@", TOKEN_TITLE_PREFIX)
        .replace("@CLOSE_TITLE_PREFIX@", CLOSE_TITLE_PREFIX)
        .replace("@RELAY_SCHEME@", RELAY_SCHEME)
        .replace("@NAV_DELAY_MS@", &NAV_DELAY_MS.to_string())
}
