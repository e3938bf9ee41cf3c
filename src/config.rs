use std::time::Duration;

/// Entries older than this since their last send are retransmitted.
pub const DEFAULT_RETRANSMISSION_TIMEOUT: Duration = Duration::from_millis(2000);
/// Sleep between two sweeps of the pending table.
pub const DEFAULT_RETRANSMISSION_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 4096;

/// Tuning knobs shared by the receiver and retransmitter loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastConfig {
    /// An entry is resent once `now - last_sent` is strictly greater than this
    pub retransmission_timeout: Duration,
    pub retransmission_interval: Duration,
    /// Size of the receive buffer; longer datagrams are truncated by the transport
    pub max_datagram_size: usize,
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            retransmission_timeout: DEFAULT_RETRANSMISSION_TIMEOUT,
            retransmission_interval: DEFAULT_RETRANSMISSION_INTERVAL,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl MulticastConfig {
    /// Returns a `MulticastConfig` with the given timings and the default datagram size
    #[must_use]
    pub fn new(retransmission_timeout: Duration, retransmission_interval: Duration) -> Self {
        Self {
            retransmission_timeout,
            retransmission_interval,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MulticastConfig::default();
        assert_eq!(config.retransmission_timeout, Duration::from_secs(2));
        assert_eq!(config.retransmission_interval, Duration::from_millis(500));
        assert_eq!(config.max_datagram_size, 4096);
    }

    #[test]
    fn new_keeps_default_datagram_size() {
        let config = MulticastConfig::new(Duration::from_millis(30), Duration::from_millis(5));
        assert_eq!(config.retransmission_timeout, Duration::from_millis(30));
        assert_eq!(config.retransmission_interval, Duration::from_millis(5));
        assert_eq!(config.max_datagram_size, DEFAULT_MAX_DATAGRAM_SIZE);
    }
}
