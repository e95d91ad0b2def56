//! Byte-suffixed memory quantity parsing.
//!
//! Resource requests express memory as a number with a byte-convertible
//! unit suffix (`"1kb"`, `"512mb"`, `"2gb"`). All internal bookkeeping is
//! denominated in kilobytes, so parsing normalizes to KB here and nothing
//! downstream ever sees a unit again.

use crate::error::QuantityError;

const KB_PER_MB: u64 = 1024;
const KB_PER_GB: u64 = 1024 * 1024;
const KB_PER_TB: u64 = 1024 * 1024 * 1024;

/// Parse a memory quantity into kilobytes.
///
/// Accepted suffixes (case-insensitive): `b`, `kb`, `mb`, `gb`, `tb`.
/// A bare integer is kilobytes. Byte quantities round up to the next
/// kilobyte so a nonzero request never normalizes to zero.
pub fn parse_memory_kb(text: &str) -> Result<u64, QuantityError> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: u64 = number
        .parse()
        .map_err(|_| QuantityError::Malformed(text.to_string()))?;

    match unit.trim().to_ascii_lowercase().as_str() {
        "b" => Ok(value.div_ceil(1024)),
        "" | "kb" => Ok(value),
        "mb" => Ok(value * KB_PER_MB),
        "gb" => Ok(value * KB_PER_GB),
        "tb" => Ok(value * KB_PER_TB),
        _ => Err(QuantityError::UnknownUnit(text.to_string())),
    }
}
