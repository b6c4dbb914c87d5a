//! Size-derived timeout policy for a single conversion.

use std::time::Duration;

const MIB: u64 = 1024 * 1024;
const BASE: Duration = Duration::from_secs(5 * 60);
const MEDIUM_THRESHOLD: u64 = 10 * MIB;
const MEDIUM: Duration = Duration::from_secs(7 * 60);
const LARGE_THRESHOLD: u64 = 50 * MIB;
const LARGE_BASE: Duration = Duration::from_secs(10 * 60);
const LARGE_STEP: Duration = Duration::from_secs(2 * 60);
const LARGE_STEP_BYTES: u64 = 50 * MIB;
const HARD_CAP: Duration = Duration::from_secs(60 * 60);

/// Compute the conversion timeout for an input of `input_size_bytes`.
///
/// Base 5 minutes; inputs over 10 MiB get 7 minutes; inputs over 50 MiB get
/// 10 minutes plus 2 minutes per additional full 50 MiB; hard-capped at 60
/// minutes.
#[must_use]
pub fn compute_timeout(input_size_bytes: u64) -> Duration {
    if input_size_bytes <= MEDIUM_THRESHOLD {
        return BASE;
    }
    if input_size_bytes <= LARGE_THRESHOLD {
        return MEDIUM;
    }

    let extra_bytes = input_size_bytes - LARGE_THRESHOLD;
    let extra_steps = extra_bytes.div_ceil(LARGE_STEP_BYTES);
    let extra = LARGE_STEP.saturating_mul(u32::try_from(extra_steps).unwrap_or(u32::MAX));
    (LARGE_BASE + extra).min(HARD_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_inputs_get_the_base_timeout() {
        assert_eq!(compute_timeout(MIB), BASE);
        assert_eq!(compute_timeout(MEDIUM_THRESHOLD), BASE);
    }

    #[test]
    fn medium_inputs_get_seven_minutes() {
        assert_eq!(compute_timeout(MEDIUM_THRESHOLD + 1), MEDIUM);
        assert_eq!(compute_timeout(LARGE_THRESHOLD), MEDIUM);
    }

    #[test]
    fn large_inputs_step_by_two_minutes_per_50_mib() {
        assert_eq!(compute_timeout(LARGE_THRESHOLD + 1), LARGE_BASE + LARGE_STEP);
        assert_eq!(compute_timeout(LARGE_THRESHOLD + LARGE_STEP_BYTES), LARGE_BASE + LARGE_STEP);
        assert_eq!(compute_timeout(LARGE_THRESHOLD + LARGE_STEP_BYTES + 1), LARGE_BASE + LARGE_STEP * 2);
    }

    #[test]
    fn timeout_is_hard_capped_at_one_hour() {
        assert_eq!(compute_timeout(100 * 1024 * MIB), HARD_CAP);
    }
}
