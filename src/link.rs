//! Connectivity supervisor for the network link.
//!
//! Drives a [`LinkDriver`] through association and re-association. Each
//! call to [`ConnectivitySupervisor::ensure_connected`] does at most one
//! unit of work and returns immediately; "wait 500 ms and poll again"
//! becomes "the next poll is eligible at T".
//!
//! # Example
//!
//! ```rust
//! use light_node::config::WifiConfig;
//! use light_node::hal::MockLink;
//! use light_node::link::{ConnectionState, ConnectivitySupervisor};
//!
//! let wifi = WifiConfig::default().with_ssid("shop").with_password("secret");
//! let mut link = ConnectivitySupervisor::new(MockLink::up_after(1), &wifi);
//!
//! assert!(link.ensure_connected(0).is_err());
//! assert_eq!(link.state(), ConnectionState::Connecting);
//!
//! assert!(link.ensure_connected(500).is_ok());
//! assert!(link.is_connected());
//! ```

use crate::config::{ShortString, WifiConfig};
use crate::error::Error;
use crate::traits::LinkDriver;

/// State of the link or of a broker session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connectivity; an attempt is due or scheduled.
    #[default]
    Disconnected,
    /// Attempt in progress.
    Connecting,
    /// Ready for traffic.
    Connected,
}

/// Keeps the network link associated.
///
/// When the link is disabled in [`WifiConfig`] (the host OS owns the
/// network), the supervisor reports [`ConnectionState::Connected`] without
/// ever touching the driver.
pub struct ConnectivitySupervisor<L: LinkDriver> {
    link: L,
    ssid: ShortString,
    password: ShortString,
    poll_interval_ms: u64,
    connect_timeout_ms: u64,
    enabled: bool,
    state: ConnectionState,
    next_attempt_ms: u64,
    attempt_started_ms: u64,
}

impl<L: LinkDriver> ConnectivitySupervisor<L> {
    /// Create a supervisor in the [`Disconnected`](ConnectionState::Disconnected) state.
    pub fn new(link: L, config: &WifiConfig) -> Self {
        Self {
            link,
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            poll_interval_ms: config.poll_interval_ms as u64,
            connect_timeout_ms: config.connect_timeout_ms as u64,
            enabled: config.enabled,
            state: if config.enabled {
                ConnectionState::Disconnected
            } else {
                ConnectionState::Connected
            },
            next_attempt_ms: 0,
            attempt_started_ms: 0,
        }
    }

    /// Advance the association state machine.
    ///
    /// Idempotent while the link stays up. Returns
    /// [`Error::LinkUnavailable`] whenever the link is not connected after
    /// this call.
    pub fn ensure_connected(&mut self, now_ms: u64) -> Result<(), Error> {
        if !self.enabled {
            return Ok(());
        }

        if self.state == ConnectionState::Connected {
            if self.link.is_up() {
                return Ok(());
            }
            tracing::warn!("link lost");
            self.state = ConnectionState::Disconnected;
            self.next_attempt_ms = now_ms;
        }

        if self.state == ConnectionState::Disconnected && now_ms >= self.next_attempt_ms {
            tracing::info!(ssid = self.ssid.as_str(), "associating");
            if self
                .link
                .associate(self.ssid.as_str(), self.password.as_str())
            {
                self.state = ConnectionState::Connecting;
                self.attempt_started_ms = now_ms;
                // First poll happens right away, like the blocking loop it replaces.
                self.next_attempt_ms = now_ms;
            } else {
                tracing::debug!("association could not be started");
                self.next_attempt_ms = now_ms + self.poll_interval_ms;
            }
        }

        if self.state == ConnectionState::Connecting && now_ms >= self.next_attempt_ms {
            if self.link.is_up() {
                tracing::info!(ssid = self.ssid.as_str(), "link up");
                self.state = ConnectionState::Connected;
            } else if now_ms.saturating_sub(self.attempt_started_ms) >= self.connect_timeout_ms {
                tracing::warn!(
                    error = %Error::LinkUnavailable,
                    timeout_ms = self.connect_timeout_ms,
                    "association timed out"
                );
                self.state = ConnectionState::Disconnected;
                self.next_attempt_ms = now_ms + self.poll_interval_ms;
            } else {
                self.next_attempt_ms = now_ms + self.poll_interval_ms;
            }
        }

        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(Error::LinkUnavailable)
        }
    }

    /// Whether the link is ready for traffic.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the supervisor manages the link at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the underlying driver.
    pub fn driver(&self) -> &L {
        &self.link
    }

    /// Get mutable access to the underlying driver.
    pub fn driver_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockLink;

    fn wifi() -> WifiConfig {
        WifiConfig::default()
            .with_ssid("shop")
            .with_password("secret")
    }

    #[test]
    fn starts_disconnected() {
        let sup = ConnectivitySupervisor::new(MockLink::new(), &wifi());
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(!sup.is_connected());
    }

    #[test]
    fn connects_on_first_poll_when_link_comes_up_immediately() {
        let mut sup = ConnectivitySupervisor::new(MockLink::up_after(0), &wifi());
        assert_eq!(sup.ensure_connected(0), Ok(()));
        assert!(sup.is_connected());
        assert_eq!(sup.driver().associate_calls, 1);
        assert_eq!(sup.driver().last_ssid.as_deref(), Some("shop"));
    }

    #[test]
    fn polls_at_interval_while_connecting() {
        let mut sup = ConnectivitySupervisor::new(MockLink::up_after(2), &wifi());
        assert_eq!(sup.ensure_connected(0), Err(Error::LinkUnavailable));
        assert_eq!(sup.state(), ConnectionState::Connecting);

        // Not yet eligible: no poll happens.
        assert!(sup.ensure_connected(100).is_err());
        assert_eq!(sup.driver().polls(), 1);

        assert!(sup.ensure_connected(500).is_err());
        assert!(sup.ensure_connected(1000).is_ok());
        assert_eq!(sup.driver().associate_calls, 1);
    }

    #[test]
    fn idempotent_when_connected() {
        let mut sup = ConnectivitySupervisor::new(MockLink::up_after(0), &wifi());
        sup.ensure_connected(0).unwrap();
        sup.ensure_connected(10).unwrap();
        sup.ensure_connected(20).unwrap();
        assert_eq!(sup.driver().associate_calls, 1);
    }

    #[test]
    fn times_out_and_reassociates() {
        let config = wifi().with_connect_timeout_ms(1000);
        let mut sup = ConnectivitySupervisor::new(MockLink::new(), &config);

        sup.ensure_connected(0).unwrap_err();
        sup.ensure_connected(500).unwrap_err();
        sup.ensure_connected(1000).unwrap_err();
        assert_eq!(sup.state(), ConnectionState::Disconnected);

        sup.ensure_connected(1500).unwrap_err();
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.driver().associate_calls, 2);
    }

    #[test]
    fn failed_association_retries_after_interval() {
        let mut link = MockLink::new();
        link.accept_associate = false;
        let mut sup = ConnectivitySupervisor::new(link, &wifi());

        sup.ensure_connected(0).unwrap_err();
        sup.ensure_connected(200).unwrap_err();
        assert_eq!(sup.driver().associate_calls, 1);
        sup.ensure_connected(500).unwrap_err();
        assert_eq!(sup.driver().associate_calls, 2);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn link_drop_triggers_reassociation() {
        let mut sup = ConnectivitySupervisor::new(MockLink::up_after(0), &wifi());
        sup.ensure_connected(0).unwrap();

        sup.driver_mut().drop_link();
        assert_eq!(sup.ensure_connected(3000), Ok(()));
        assert_eq!(sup.driver().associate_calls, 2);
    }

    #[test]
    fn disabled_link_reports_connected() {
        let config = wifi().with_enabled(false);
        let mut sup = ConnectivitySupervisor::new(MockLink::new(), &config);
        assert!(sup.is_connected());
        assert_eq!(sup.ensure_connected(0), Ok(()));
        assert!(!sup.is_enabled());
        assert_eq!(sup.driver().associate_calls, 0);
    }
}
