use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Used for simulation time (seconds), belt positions, and rates so that
/// identical command/delta sequences produce bit-identical state.
pub type Fixed64 = I32F32;

/// Ticks are the count of `Engine::tick` calls.
pub type Ticks = u64;

/// Position an item is held at when it cannot leave its belt segment.
///
/// The nearest Q32.32 value to 0.99.
pub const STALL_POSITION: Fixed64 = Fixed64::from_bits(4_252_017_623);

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Like [`f64_to_fixed64`], but `None` for NaN or values outside the Q32.32
/// range instead of panicking. Use for user-supplied numbers.
#[inline]
pub fn checked_f64_to_fixed64(v: f64) -> Option<Fixed64> {
    Fixed64::checked_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Ratio `num / den` clamped into [0, 1]. A zero or negative denominator
/// reads as 0.
#[inline]
pub fn fraction(num: Fixed64, den: Fixed64) -> Fixed64 {
    if den <= Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    num.checked_div(den)
        .unwrap_or(Fixed64::ONE)
        .clamp(Fixed64::ZERO, Fixed64::ONE)
}
