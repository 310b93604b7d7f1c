//! Resolver configuration

use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_USER_AGENT: &str = concat!("frost-link/", env!("CARGO_PKG_VERSION"));

/// Transport settings for [`crate::LinkResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Whole-request timeout. `None` waits as long as the transport does.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Build from a millisecond count as given on the command line (0 disables)
    pub fn from_timeout_ms(timeout_ms: u64) -> Self {
        Self::default().with_timeout_ms(timeout_ms)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}
