//! Numeric and byte-layout utilities.
//!
//! Fixed-point price rounding, the compact app-id decoding used by data
//! submissions, and tolerant numeric extraction from decoded JSON arguments.

use serde_json::Value;
use thiserror::Error;

/// Display rounding keeps this many decimal places.
pub const PRICE_DECIMALS: u32 = 4;

/// Minimal currency units per whole token (10^18).
const UNITS_PER_TOKEN: f64 = 1_000_000_000_000_000_000.0;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("App id byte sequence is empty")]
    Empty,

    #[error("App id hex string has odd length")]
    OddLength,

    #[error("App id byte sequence too long: {0} bytes")]
    TooLong(usize),

    #[error("Invalid hex in app id: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Interpret a decimal string of minimal units as a display price.
///
/// Divides by 10^18 and rounds to [`PRICE_DECIMALS`] places. Returns `None`
/// for empty or non-numeric input instead of failing.
pub fn round_price(amount: &str) -> Option<f64> {
    if amount.is_empty() {
        return None;
    }
    let value: f64 = amount.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let scale = 10f64.powi(PRICE_DECIMALS as i32);
    Some((value / UNITS_PER_TOKEN * scale).round() / scale)
}

/// Decode a compact bit-packed application id from its raw byte sequence.
///
/// The id is stored little-endian; encodings of up to four bytes carry a
/// two-bit mode tag (shift 2), longer encodings lead with a full header byte
/// (shift 8).
pub fn decode_app_id(bytes: &[u8]) -> Result<u64, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() > 16 {
        return Err(DecodeError::TooLong(bytes.len()));
    }

    let mut acc: u128 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        acc |= (*byte as u128) << (8 * i);
    }

    let shift = if bytes.len() <= 4 { 2 } else { 8 };
    Ok((acc >> shift) as u64)
}

/// [`decode_app_id`] over a hex string (with or without `0x` prefix).
pub fn decode_hex_app_id(value: &str) -> Result<u64, DecodeError> {
    let digits = strip_hex_prefix(value);
    if digits.is_empty() {
        return Err(DecodeError::Empty);
    }
    if digits.len() % 2 != 0 {
        return Err(DecodeError::OddLength);
    }
    let bytes = hex::decode(digits)?;
    decode_app_id(&bytes)
}

pub fn strip_hex_prefix(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

/// Lowercase hex without prefix; the `0x` belongs to presentation boundaries.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn with_hex_prefix(digits: &str) -> String {
    format!("0x{digits}")
}

/// Pull a decimal-string number out of a decoded JSON argument.
///
/// Accepts plain numbers, decimal strings and `0x` hex strings; anything
/// else is not a number.
pub fn json_number_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            if let Some(digits) = s.strip_prefix("0x") {
                u128::from_str_radix(digits, 16).ok().map(|n| n.to_string())
            } else {
                Some(s.clone())
            }
        }
        _ => None,
    }
}
