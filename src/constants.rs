//! Genesis-critical constants shared across the pool, wire codec, and peer overlay.

/// Alphabet used for the base-36 rendering of peer/account ids elsewhere in the wider system.
pub const ID_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

/// Largest number of transactions admitted into a single block.
pub const MAX_NUMBER_OF_TRANSACTIONS: usize = 255;

/// Largest serialized payload size for a block's transaction set.
pub const MAX_PAYLOAD_LENGTH: usize = MAX_NUMBER_OF_TRANSACTIONS * 160;

/// Atomic units (NQT) per whole NHZ.
pub const ONE_NHZ: i64 = 100_000_000;

/// Largest circulating balance, in whole NHZ.
pub const MAX_BALANCE_NHZ: i64 = 1_000_000_000;

/// Minimum effective balance, in whole NHZ, for a hallmarked peer to carry nonzero weight.
pub const MIN_HUB_EFFECTIVE_BALANCE: i64 = 100_000;

/// Largest allowed transaction deadline, in minutes.
pub const MAX_DEADLINE_MINUTES: u16 = 1440;

/// The single historical block height at which `check_transaction_hashes` tolerates a hash
/// collision instead of rejecting it. The source carries no justification for this height;
/// preserve it verbatim rather than generalizing.
pub const GRANDFATHERED_DUPLICATE_HEIGHT: i64 = 58294;

/// Named protocol fork heights. Each gates a schema or validation change in the wire codec or
/// admission pipeline. Mirrors the `Height`/`HeightInfo` shape used for Filecoin network
/// upgrades, adapted to a single network rather than per-network upgrade schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkHeight {
    /// Transparent forging, phase 1: earliest forging-related wire change.
    TransparentForging1,
    /// Transparent forging, phase 2.
    TransparentForging2,
    /// NQT: amount/fee widen from i32 to i64 atomic units.
    Nqt,
    /// Fractional: fee/amount schema gains fractional-unit support.
    Fractional,
    /// Asset exchange: attachment schema gains asset-exchange transaction types.
    AssetExchange,
    /// Referenced transaction full hash: `referenced_transaction_id` becomes a 32-byte hash.
    ReferencedTransactionFullHash,
}

/// Mainnet block heights for each [`ForkHeight`]. Testnet uses a distinct, much lower schedule
/// so integration tests can exercise post-fork behavior without synthesizing huge heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightInfo {
    pub height: ForkHeight,
    pub block: i64,
}

pub const MAINNET_HEIGHTS: &[HeightInfo] = &[
    HeightInfo { height: ForkHeight::TransparentForging1, block: 7_750 },
    HeightInfo { height: ForkHeight::TransparentForging2, block: 14_800 },
    HeightInfo { height: ForkHeight::Nqt, block: 111_111 },
    HeightInfo { height: ForkHeight::Fractional, block: 111_111 },
    HeightInfo { height: ForkHeight::AssetExchange, block: 197_000 },
    HeightInfo { height: ForkHeight::ReferencedTransactionFullHash, block: 303_000 },
];

pub const TESTNET_HEIGHTS: &[HeightInfo] = &[
    HeightInfo { height: ForkHeight::TransparentForging1, block: 100 },
    HeightInfo { height: ForkHeight::TransparentForging2, block: 200 },
    HeightInfo { height: ForkHeight::Nqt, block: 300 },
    HeightInfo { height: ForkHeight::Fractional, block: 300 },
    HeightInfo { height: ForkHeight::AssetExchange, block: 400 },
    HeightInfo { height: ForkHeight::ReferencedTransactionFullHash, block: 500 },
];

/// Returns the block height at which `height` activates for the selected network.
pub fn activation_height(schedule: &[HeightInfo], height: ForkHeight) -> i64 {
    schedule
        .iter()
        .find(|info| info.height == height)
        .map(|info| info.block)
        .unwrap_or(i64::MAX)
}

/// Whether `height` has activated by `current_block`.
pub fn is_active(schedule: &[HeightInfo], height: ForkHeight, current_block: i64) -> bool {
    current_block >= activation_height(schedule, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_schedule_is_monotonic_enough_for_lookup() {
        assert_eq!(activation_height(MAINNET_HEIGHTS, ForkHeight::Nqt), 111_111);
        assert!(is_active(MAINNET_HEIGHTS, ForkHeight::Nqt, 111_111));
        assert!(!is_active(MAINNET_HEIGHTS, ForkHeight::Nqt, 111_110));
    }

    #[test]
    fn unknown_height_never_activates() {
        assert_eq!(activation_height(&[], ForkHeight::Nqt), i64::MAX);
    }
}
