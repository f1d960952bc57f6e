//! Lenient coercion of raw form input.
//!
//! Malformed numbers fall back to a default instead of being rejected.

/// Parse a float, returning `default` for blank, malformed or non-finite input
pub fn coerce_f64(input: &str, default: f64) -> f64 {
    coerce_optional_f64(input).unwrap_or(default)
}

/// Parse a float, returning `None` for blank, malformed or non-finite input
pub fn coerce_optional_f64(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse an integer, returning `default` for blank or malformed input.
/// A decimal input is truncated toward zero.
pub fn coerce_i64(input: &str, default: i64) -> i64 {
    let trimmed = input.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value;
    }
    match coerce_optional_f64(trimmed) {
        Some(value) if value.abs() < i64::MAX as f64 => value.trunc() as i64,
        _ => default,
    }
}

/// `Some(trimmed)` when the input has visible characters
pub fn non_blank(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
