//! Configuration for the eID controller

use std::time::Duration;

use crate::certificate::TrustAnchors;

/// Configuration options for [`crate::BeId`]
#[derive(Debug, Clone)]
pub struct BeIdConfig {
    /// Only connect to the reader with this exact name
    pub reader_name: Option<String>,

    /// Accept non-production cards by skipping root pinning and record signature checks
    ///
    /// Never enable this for security-sensitive deployments.
    pub test_card: bool,

    /// Root certificates accepted as trust anchors
    pub trust_anchors: TrustAnchors,

    /// Bounded wait for a card to appear, per reader and poll
    pub card_present_wait: Duration,

    /// Bounded wait for the card to disappear, per poll
    pub card_absent_wait: Duration,

    /// Pause after each file read so the reader can settle
    pub read_settle_delay: Duration,

    /// Timeout for OCSP and CRL downloads
    pub http_timeout: Duration,
}

impl Default for BeIdConfig {
    fn default() -> Self {
        Self {
            reader_name: None,
            test_card: false,
            trust_anchors: TrustAnchors::default(),
            card_present_wait: Duration::from_millis(500),
            card_absent_wait: Duration::from_millis(500),
            read_settle_delay: Duration::from_millis(100),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl BeIdConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict connections to the named reader
    pub fn with_reader_name(mut self, reader_name: impl Into<String>) -> Self {
        self.reader_name = Some(reader_name.into());
        self
    }

    /// Enable or disable test-card mode
    pub const fn with_test_card(mut self, test_card: bool) -> Self {
        self.test_card = test_card;
        self
    }

    /// Set the accepted root certificates
    pub fn with_trust_anchors(mut self, trust_anchors: TrustAnchors) -> Self {
        self.trust_anchors = trust_anchors;
        self
    }

    /// Set the presence monitor wait durations
    pub const fn with_presence_waits(mut self, present: Duration, absent: Duration) -> Self {
        self.card_present_wait = present;
        self.card_absent_wait = absent;
        self
    }

    /// Set the pause after each file read
    pub const fn with_read_settle_delay(mut self, delay: Duration) -> Self {
        self.read_settle_delay = delay;
        self
    }

    /// Set the OCSP and CRL download timeout
    pub const fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
