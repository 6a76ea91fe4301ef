// Wraparound Clock - Elapsed time between 32-bit wrapping timestamps
//
// The simulation stamps every event with a free-running 32-bit counter.
// Only differences are meaningful, and at most one overflow may occur
// between two consecutive samples.

/// A raw timestamp from the simulation's wrapping counter (modulus 2^32)
pub type Timestamp = u32;

/// Modulus of the timestamp counter
pub const TIMESTAMP_MODULUS: u64 = 1 << 32;

/// Elapsed time from `older` to `newer`, assuming at most one wraparound
///
/// # Arguments
/// * `newer` - The later timestamp
/// * `older` - The earlier timestamp
///
/// # Returns
/// `newer - older` when `newer >= older`, otherwise `2^32 - older + newer`
#[inline]
pub fn elapsed(newer: Timestamp, older: Timestamp) -> u64 {
    if newer >= older {
        u64::from(newer - older)
    } else {
        TIMESTAMP_MODULUS - u64::from(older) + u64::from(newer)
    }
}
