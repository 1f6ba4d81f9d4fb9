//! Wall-clock deadline for cooperative cancellation.
//!
//! Long loops poll `expired()` between iterations; there are no suspension
//! points at the language level.

use std::time::Instant;

/// A deadline derived from an optional time limit in seconds.
#[derive(Debug, Clone)]
pub struct Deadline {
    start: Instant,
    limit: Option<f64>,
}

impl Deadline {
    /// Start the clock. `limit` of `None` or non-finite means no limit.
    pub fn new(limit: Option<f64>) -> Self {
        Self {
            start: Instant::now(),
            limit: limit.filter(|t| t.is_finite() && *t >= 0.0),
        }
    }

    /// Seconds since the clock started.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// True once the wall clock has passed the limit.
    pub fn expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.elapsed() >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_never_expires() {
        let d = Deadline::new(None);
        assert!(!d.expired());
    }

    #[test]
    fn test_zero_limit_expires() {
        let d = Deadline::new(Some(0.0));
        assert!(d.expired());
    }

    #[test]
    fn test_infinite_limit_ignored() {
        let d = Deadline::new(Some(f64::INFINITY));
        assert!(!d.expired());
    }
}
