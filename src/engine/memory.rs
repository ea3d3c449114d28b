//! Memory size strings in the `512m` / `1g` style.

use super::EngineError;

/// Parse a memory size such as `1g`, `512m`, `64k` or a plain byte count.
///
/// Suffixes are case-insensitive and may carry a trailing `b` (`1gb`).
pub fn parse_memory_size(input: &str) -> Result<u64, EngineError> {
    let invalid = || EngineError::InvalidMemorySize(input.to_string());

    let lower = input.trim().to_ascii_lowercase();
    let trimmed = lower.strip_suffix('b').unwrap_or(&lower);
    let split = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(invalid());
    }
    let amount: u64 = digits.parse().map_err(|_| invalid())?;

    let shift = match unit {
        "" => 0,
        "k" => 10,
        "m" => 20,
        "g" => 30,
        "t" => 40,
        _ => return Err(invalid()),
    };

    amount.checked_mul(1u64 << shift).ok_or_else(invalid)
}
