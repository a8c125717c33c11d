//! Epoch-second conversion from wall-clock instants to the node's own genesis-relative clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unix timestamp of the network genesis instant, 2014-03-22T22:22:22Z.
pub const EPOCH_ORIGIN_UNIX_SECS: u64 = 1_395_526_942;

/// Seconds since the network genesis, truncated to 32 bits as the wire format requires.
pub type EpochSeconds = u32;

/// Converts a [`SystemTime`] to epoch-seconds since genesis. Instants before genesis saturate to
/// 0; instants far enough past genesis to overflow `u32` saturate to `u32::MAX` rather than wrap,
/// since wrapping would silently resurrect an expired transaction.
pub fn to_epoch(instant: SystemTime) -> EpochSeconds {
    let unix_secs = instant
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    unix_secs
        .saturating_sub(EPOCH_ORIGIN_UNIX_SECS)
        .min(u64::from(u32::MAX)) as u32
}

/// Converts epoch-seconds since genesis back to a [`SystemTime`].
pub fn from_epoch(epoch_seconds: EpochSeconds) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(EPOCH_ORIGIN_UNIX_SECS + u64::from(epoch_seconds))
}

/// The current time, in epoch-seconds since genesis.
pub fn now() -> EpochSeconds {
    to_epoch(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_instant_is_epoch_zero() {
        assert_eq!(to_epoch(UNIX_EPOCH + Duration::from_secs(EPOCH_ORIGIN_UNIX_SECS)), 0);
    }

    #[test]
    fn round_trips_through_system_time() {
        let t = UNIX_EPOCH + Duration::from_secs(EPOCH_ORIGIN_UNIX_SECS + 1_000_000);
        assert_eq!(from_epoch(to_epoch(t)), t);
    }

    #[test]
    fn pre_genesis_instants_saturate_to_zero() {
        let t = UNIX_EPOCH + Duration::from_secs(EPOCH_ORIGIN_UNIX_SECS - 10);
        assert_eq!(to_epoch(t), 0);
    }
}
