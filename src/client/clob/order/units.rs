//! Hex codecs, decimal-to-base-unit conversion, and salt generation.
//!
//! Base-unit conversion is a wire-correctness path: amounts are stringified
//! at fixed precision and converted with decimal-point surgery, never by
//! multiplying through `10^decimals` in floating point.

use rand::Rng;

use crate::error::{ClobError, Result};

/// Fractional digits retained before the decimal-point shift. Ten digits is
/// past any supported amount precision but short of f64 noise.
const PRE_ROUND_DIGITS: usize = 10;

/// Salts are drawn uniformly from `[0, 10^12)`, well inside the signed
/// 64-bit range strict servers parse the wire salt into.
pub const SALT_MAX: u64 = 1_000_000_000_000;

// =============================================================================
// Hex
// =============================================================================

/// Encodes bytes as lowercase hex with a `0x` prefix.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decodes a hex string, with or without a `0x`/`0X` prefix, accepting both
/// cases. Odd-length input is rejected.
pub fn from_hex(input: &str) -> Result<Vec<u8>> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(stripped).map_err(|e| ClobError::HexParse(e.to_string()))
}

// =============================================================================
// Decimal -> base units
// =============================================================================

/// Converts a decimal amount into an integer base-unit string, rounding down.
///
/// Equivalent to `floor(amount * 10^decimals)` computed through the decimal
/// string representation.
pub fn to_base_units(amount: f64, decimals: u32) -> String {
    to_base_units_rounded(amount, decimals, true)
}

/// Converts a decimal amount into an integer base-unit string.
///
/// The amount is first fixed at ten fractional digits (absorbing binary
/// floating-point residue like `0.1 + 0.2`), then the decimal point is
/// shifted `decimals` places: the fraction is zero-padded or truncated and
/// leading zeros are stripped.
///
/// `round_down` floors at the tenth digit; otherwise the tenth digit is
/// rounded to nearest.
pub fn to_base_units_rounded(amount: f64, decimals: u32, round_down: bool) -> String {
    // Fixed-precision stringification does the rounding. For round-down,
    // format two digits deep and truncate, so residue two places below the
    // tenth digit is still absorbed before the floor.
    let fixed = if round_down {
        let wide = format!("{:.12}", amount);
        match wide.split_once('.') {
            Some((int_part, frac_part)) => {
                format!("{}.{}", int_part, &frac_part[..PRE_ROUND_DIGITS])
            }
            None => wide,
        }
    } else {
        format!("{:.10}", amount)
    };

    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut frac = String::from(frac_part);
    while frac.len() < decimals as usize {
        frac.push('0');
    }
    frac.truncate(decimals as usize);

    let combined = format!("{}{}", int_part, frac);
    let stripped = combined.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

// =============================================================================
// Salt
// =============================================================================

/// Generates a random order salt in `[0, 10^12)`.
pub fn generate_salt() -> u64 {
    rand::thread_rng().gen_range(0..SALT_MAX)
}
