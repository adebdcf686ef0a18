use std::time::Duration;

use tokio::time::Instant;

use crate::error::{BlueGreenError, Result};

pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(500);

/// Remaining-time budget of one stage invocation.
///
/// The expiry sits `safety_margin` before the platform's own hard limit so a
/// timeout failure can still be reported before the process is killed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    hard_limit: Instant,
}

impl Deadline {
    #[cfg(test)]
    pub fn from_remaining(remaining: Duration, safety_margin: Duration) -> Self {
        Self::starting_at(Instant::now(), remaining, safety_margin)
    }

    /// Budget measured from `started`, the moment the platform's remaining
    /// time was sampled.
    pub fn starting_at(started: Instant, remaining: Duration, safety_margin: Duration) -> Self {
        Self {
            expires_at: started + remaining.saturating_sub(safety_margin),
            hard_limit: started + remaining,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// When the platform kills the invocation. Reporting after the stage
    /// deadline has to finish before this.
    pub fn hard_limit(&self) -> Instant {
        self.hard_limit
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_expired() {
            Err(BlueGreenError::timeout(stage))
        } else {
            Ok(())
        }
    }

    /// The earlier of this deadline and `max` from now.
    pub fn capped(&self, max: Option<Duration>) -> Self {
        match max {
            Some(max) => Self {
                expires_at: self.expires_at.min(Instant::now() + max),
                ..*self
            },
            None => *self,
        }
    }
}
