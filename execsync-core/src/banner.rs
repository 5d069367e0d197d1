//! Transient banners with a fixed lifetime.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub expires_at: Instant,
}

/// Holds at most one banner; showing a new one replaces the old.
#[derive(Debug, Clone)]
pub struct BannerSlot {
    ttl: Duration,
    current: Option<Banner>,
}

impl BannerSlot {
    pub fn new(ttl: Duration) -> Self {
        BannerSlot { ttl, current: None }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some(Banner {
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// The banner still visible at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|b| now < b.expires_at)
            .map(|b| b.message.as_str())
    }

    /// Drop the banner once it has expired.
    pub fn expire(&mut self, now: Instant) {
        if self.current.as_ref().is_some_and(|b| now >= b.expires_at) {
            self.current = None;
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
