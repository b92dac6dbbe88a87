//! Exponential cooldown for the failure gate.

use std::time::Duration;

/// Largest power of two applied to the cooldown unit. Keeps the shift in
/// range however many failures pile up.
const MAX_EXPONENT: u32 = 32;

/// Cooldown the gate enforces after `consecutive_failures` with the given
/// `threshold`, measured from the last delegated attempt.
///
/// Returns `None` while the failure count is below the threshold. At the
/// threshold the cooldown is 2 seconds and it doubles for every further
/// failure.
pub fn cooldown(consecutive_failures: u32, threshold: u32) -> Option<Duration> {
    if consecutive_failures < threshold {
        return None;
    }

    let over = consecutive_failures - threshold;
    let exponent = over.saturating_add(1).min(MAX_EXPONENT);

    Some(Duration::from_secs(1u64 << exponent))
}
