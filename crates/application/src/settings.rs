//! Relay timing and routing settings.

use std::time::Duration;

/// Vendor hosts whose popup-open calls are routed to the authorization
/// surface instead of a real browser window.
pub const DEFAULT_VENDOR_HOSTS: &[&str] = &[
    "authorize.music.apple.com",
    "buy.music.apple.com",
    "buy.itunes.apple.com",
];

/// Tunable timings of the relay and reauthorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    /// Wait after direct injection before inspecting `isAuthorized`.
    /// Sub-second: the injection either takes quickly or not at all.
    pub settle_interval: Duration,
    /// Interval between interactive sign-in polls.
    pub poll_interval: Duration,
    /// Maximum number of interactive sign-in polls.
    pub poll_budget: u32,
    /// Hosts routed to the authorization surface.
    pub vendor_hosts: Vec<String>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_millis(400),
            poll_interval: Duration::from_secs(1),
            poll_budget: 15,
            vendor_hosts: DEFAULT_VENDOR_HOSTS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl RelaySettings {
    /// Override the settle interval.
    #[must_use]
    pub const fn with_settle_interval(mut self, interval: Duration) -> Self {
        self.settle_interval = interval;
        self
    }

    /// Override the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the poll budget.
    #[must_use]
    pub const fn with_poll_budget(mut self, budget: u32) -> Self {
        self.poll_budget = budget;
        self
    }
}
