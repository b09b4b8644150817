//! Popup-open routing.
//!
//! The vendor SDK calls the standard "open a new browsing context"
//! primitive when it wants its authorization popup. Instead of patching
//! that global, the shell's open hook delegates to [`PopupRouter`]: calls
//! targeting the vendor's authorization or purchase domains are routed to
//! the surface controller and answered synchronously with a mock window
//! handle so the SDK caller does not throw; every other URL is declined
//! back to the default opener.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cadenza_domain::WindowId;
use url::Url;

use crate::controller::AuthorizationSurfaceController;

/// Window-like value returned synchronously to the vendor SDK in place
/// of a real popup handle.
#[derive(Debug, Clone)]
pub struct MockWindowHandle {
    href: String,
    closed: Arc<AtomicBool>,
}

impl MockWindowHandle {
    fn new(href: String) -> Self {
        Self {
            href,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The URL the SDK asked to open.
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Mirror of the `closed` flag the SDK may poll.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the handle closed once the real surface goes away.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Routes vendor popup-open calls to the authorization surface.
pub struct PopupRouter {
    controller: Arc<AuthorizationSurfaceController>,
    vendor_hosts: Vec<String>,
}

impl PopupRouter {
    /// Creates a router over the controller and the vendor host list.
    #[must_use]
    pub const fn new(
        controller: Arc<AuthorizationSurfaceController>,
        vendor_hosts: Vec<String>,
    ) -> Self {
        Self {
            controller,
            vendor_hosts,
        }
    }

    /// Whether a URL belongs to the vendor's authorization or purchase
    /// domains.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| {
            self.vendor_hosts
                .iter()
                .any(|vendor| host.eq_ignore_ascii_case(vendor))
        })
    }

    /// Routes one popup-open call.
    ///
    /// Returns a mock handle when the URL was routed to an authorization
    /// surface, or `None` when the caller should fall back to its
    /// default open behavior. The surface is opened in the background;
    /// the handle is returned without waiting so the SDK's synchronous
    /// caller never blocks.
    #[must_use]
    pub fn route(self: &Arc<Self>, owner: WindowId, url: &Url) -> Option<MockWindowHandle> {
        if !self.matches(url) {
            return None;
        }
        let handle = MockWindowHandle::new(url.to_string());
        let router = Arc::clone(self);
        let target = url.clone();
        let returned = handle.clone();
        tokio::spawn(async move {
            if let Err(error) = router.controller.open(owner, &target).await {
                tracing::warn!(%error, "routed popup failed to open");
                returned.mark_closed();
            }
        });
        Some(handle)
    }
}
