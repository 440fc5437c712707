//! Expiring-state records for timed effects.

/// Absolute expiry in simulated seconds. Re-arming replaces the pending one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EffectTimer {
    expires_at: Option<f64>,
}

impl EffectTimer {
    pub const fn new() -> Self {
        Self { expires_at: None }
    }

    /// Start or restart the timer. Any previous expiry is discarded.
    pub fn arm(&mut self, now: f64, duration: f64) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.expires_at = Some(now + duration);
    }

    pub fn cancel(&mut self) {
        self.expires_at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn is_active(&self, now: f64) -> bool {
        matches!(self.expires_at, Some(at) if now < at)
    }

    pub fn expires_at(&self) -> Option<f64> {
        self.expires_at
    }

    pub fn remaining(&self, now: f64) -> f64 {
        self.expires_at.map_or(0.0, |at| (at - now).max(0.0))
    }

    /// True exactly once: on the first poll at or after the expiry time.
    pub fn poll_expired(&mut self, now: f64) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.expires_at = None;
                true
            }
            _ => false,
        }
    }
}
