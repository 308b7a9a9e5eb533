//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and starting [`HubClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use hub_client::HubClient;
//!
//! # fn example() -> hub_client::Result<()> {
//! let (client, _events) = HubClient::builder()
//!     .url("ws://localhost:58080/hub")
//!     .endpoint("chrome")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::backoff::{DEFAULT_DELAY_CEILING, DEFAULT_INITIAL_DELAY};
use super::handle::{HubClient, HubEvents};

// ============================================================================
// Constants
// ============================================================================

/// Well-known local hub endpoint.
pub const DEFAULT_HUB_URL: &str = "ws://localhost:58080/hub";

/// Endpoint name this client registers under.
pub const DEFAULT_ENDPOINT: &str = "chrome";

/// Heartbeat period while connected (10s per design).
pub const DEFAULT_KEEPALIVE_PERIOD: Duration = Duration::from_secs(10);

// ============================================================================
// ClientOptions
// ============================================================================

/// Validated client configuration, produced by [`HubClientBuilder::build`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Hub endpoint to dial.
    pub url: Url,
    /// Logical endpoint name used as `sender` on outbound control frames.
    pub endpoint: String,
    /// Heartbeat period while connected.
    pub keepalive_period: Duration,
    /// First-retry delay after an unintentional disconnect.
    pub backoff_initial: Duration,
    /// Upper bound on any single retry delay.
    pub backoff_ceiling: Duration,
}

// ============================================================================
// HubClientBuilder
// ============================================================================

/// Builder for configuring a [`HubClient`] instance.
///
/// Use [`HubClient::builder()`] to create a new builder. Every knob has a
/// design default; `build()` validates, spawns the client actor, and
/// returns the handle plus the consumer event stream.
#[derive(Debug, Clone)]
pub struct HubClientBuilder {
    /// Hub endpoint URL.
    url: String,
    /// Logical endpoint name.
    endpoint: String,
    /// Heartbeat period.
    keepalive_period: Duration,
    /// First-retry delay.
    backoff_initial: Duration,
    /// Retry delay ceiling.
    backoff_ceiling: Duration,
}

impl Default for HubClientBuilder {
    fn default() -> Self {
        Self {
            url: DEFAULT_HUB_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            keepalive_period: DEFAULT_KEEPALIVE_PERIOD,
            backoff_initial: DEFAULT_INITIAL_DELAY,
            backoff_ceiling: DEFAULT_DELAY_CEILING,
        }
    }
}

// ============================================================================
// HubClientBuilder Implementation
// ============================================================================

impl HubClientBuilder {
    /// Creates a new builder with the design defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hub endpoint URL.
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., "ws://localhost:58080/hub")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the logical endpoint name this client registers under.
    ///
    /// Used as `sender` on `register`, `heartbeat`, and `response` frames.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the heartbeat period used while connected.
    #[inline]
    #[must_use]
    pub fn keepalive_period(mut self, period: Duration) -> Self {
        self.keepalive_period = period;
        self
    }

    /// Sets the reconnect backoff floor and ceiling.
    #[inline]
    #[must_use]
    pub fn backoff(mut self, initial: Duration, ceiling: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_ceiling = ceiling;
        self
    }

    /// Validates the configuration and starts the client actor.
    ///
    /// The returned [`HubClient`] is clone-able; the [`HubEvents`] stream
    /// is the single consumer-facing notification channel.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL does not parse
    /// - [`Error::Config`] if the URL scheme is not `ws`/`wss`, or a
    ///   timing knob is zero
    pub fn build(self) -> Result<(HubClient, HubEvents)> {
        let options = self.into_options()?;
        Ok(HubClient::start(options))
    }

    /// Validates the raw knobs into [`ClientOptions`].
    fn into_options(self) -> Result<ClientOptions> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "hub URL must use ws:// or wss://, got {}",
                url.scheme()
            )));
        }

        if self.endpoint.is_empty() {
            return Err(Error::config("endpoint name must not be empty"));
        }
        if self.keepalive_period.is_zero() {
            return Err(Error::config("keepalive period must be non-zero"));
        }
        if self.backoff_initial.is_zero() {
            return Err(Error::config("backoff initial delay must be non-zero"));
        }

        Ok(ClientOptions {
            url,
            endpoint: self.endpoint,
            keepalive_period: self.keepalive_period,
            backoff_initial: self.backoff_initial,
            backoff_ceiling: self.backoff_ceiling,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
