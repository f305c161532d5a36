//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays to prevent thundering
//! herd effects when multiple requests retry simultaneously.
//!
//! - [`JitterPolicy::None`] — no randomization, predictable delays
//! - [`JitterPolicy::Full`] — random delay in [0, backoff_delay]
//! - [`JitterPolicy::Equal`] — delay = backoff_delay/2 + random[0, backoff_delay/2]

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of retry delays.
///
/// ## Trade-offs
/// - **None**: Predictable, but risks synchronized retries
/// - **Full**: Maximum randomness, aggressive load spreading
/// - **Equal**: Balanced; preserves ~75% of the original backoff on average
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    ///
    /// The default. With the stock three-attempt budget only one request
    /// retries at a time per slot, so herd risk is low and predictable
    /// timing is worth more.
    #[default]
    None,

    /// Full jitter: random delay in [0, backoff_delay].
    Full,

    /// Equal jitter: delay = backoff_delay/2 + random[0, backoff_delay/2].
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.random_range(0..=ms))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let mut rng = rand::rng();
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rng.random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn full_jitter_within_bounds() {
        let d = Duration::from_millis(1000);
        for _ in 0..100 {
            let j = JitterPolicy::Full.apply(d);
            assert!(j <= d);
        }
    }

    #[test]
    fn equal_jitter_within_bounds() {
        let d = Duration::from_millis(1000);
        for _ in 0..100 {
            let j = JitterPolicy::Equal.apply(d);
            assert!(j >= Duration::from_millis(500));
            assert!(j <= d);
        }
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
