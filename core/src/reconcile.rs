//! Offline catch-up arithmetic.
//!
//! Both functions are pure: same inputs, same outputs, no logging and no
//! clock reads. A checkpoint found ahead of `now` is clamped to `now` and
//! reported through the `clock_skew` flag so the caller can log it.

use crate::{
    error::{LivesError, LivesResult},
    types::Seconds,
};

/// Result of measuring normal regeneration since the last restore checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalCatchUp {
    /// Whole refill periods that elapsed. Never negative.
    pub restored: u64,
    /// Checkpoint advanced by exactly `restored` periods.
    pub checkpoint: Seconds,
    /// Seconds until the next unit would be restored.
    pub time_to_next: Seconds,
    /// True when the stored checkpoint was in the future and got clamped.
    pub clock_skew: bool,
}

/// Result of measuring unlimited-mode decay since the verification checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfinityDecay {
    /// Seconds to subtract from the remaining unlimited time.
    pub elapsed: Seconds,
    pub checkpoint: Seconds,
    pub clock_skew: bool,
}

/// Reject refill periods the catch-up division cannot work with.
pub fn validate_refill_period(refill_period: Seconds) -> LivesResult<()> {
    if refill_period.is_finite() && refill_period > 0.0 {
        Ok(())
    } else {
        Err(LivesError::InvalidRefillPeriod { seconds: refill_period })
    }
}

pub fn compute_normal_catch_up(
    last_restore: Seconds,
    refill_period: Seconds,
    now: Seconds,
) -> LivesResult<NormalCatchUp> {
    validate_refill_period(refill_period)?;

    let clock_skew = last_restore > now;
    let base = if clock_skew { now } else { last_restore };

    let elapsed = now - base;
    let restored = (elapsed / refill_period).floor() as u64;
    let time_to_next = refill_period - elapsed.rem_euclid(refill_period);

    Ok(NormalCatchUp {
        restored,
        checkpoint: base + restored as f64 * refill_period,
        time_to_next,
        clock_skew,
    })
}

pub fn compute_infinity_decay(verification: Seconds, now: Seconds) -> InfinityDecay {
    let clock_skew = verification > now;
    let base = if clock_skew { now } else { verification };
    InfinityDecay {
        elapsed: now - base,
        checkpoint: now,
        clock_skew,
    }
}
