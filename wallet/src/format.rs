//! Display helpers for balances and addresses.
//!
//! Nothing in here feeds back into validation: the authoritative balance is
//! always the [`Amount`] held by the session.

use crate::blockchain::Amount;

const MIN_FRACTION_DIGITS: usize = 2;
const MAX_FRACTION_DIGITS: usize = Amount::DECIMALS as usize;

/// Format a balance string for display.
///
/// The leading numeric part of the input is used (`"12abc"` reads as 12);
/// input without one renders as `"0.00"`. Output is grouped en-US style with
/// two to seven fraction digits.
pub fn format_xlm(balance: &str) -> String {
    let value = match parse_leading_float(balance) {
        Some(value) if value.is_finite() => value,
        _ => return "0.00".to_string(),
    };

    // `Display` gives the shortest decimal that round-trips, never exponent form.
    let shortest = value.abs().to_string();
    let (whole, fraction) = shortest
        .split_once('.')
        .unwrap_or((shortest.as_str(), ""));
    let (whole, fraction) = round_half_away(whole, fraction, MAX_FRACTION_DIGITS);

    let mut fraction = fraction.trim_end_matches('0').to_string();
    while fraction.len() < MIN_FRACTION_DIGITS {
        fraction.push('0');
    }

    let is_zero = whole.bytes().all(|b| b == b'0') && fraction.bytes().all(|b| b == b'0');
    let sign = if value.is_sign_negative() && !is_zero {
        "-"
    } else {
        ""
    };

    format!("{}{}.{}", sign, group_thousands(&whole), fraction)
}

/// `GABC...WXYZ` style abbreviation; empty input stays empty.
pub fn shorten_address(address: &str, chars: usize) -> String {
    if address.is_empty() {
        return String::new();
    }
    let total = address.chars().count();
    let head: String = address.chars().take(chars).collect();
    let tail: String = address.chars().skip(total.saturating_sub(chars)).collect();
    format!("{}...{}", head, tail)
}

/// Largest amount that can be sent while keeping the 1 XLM base reserve.
pub fn max_sendable(balance: Amount) -> Amount {
    balance.saturating_sub(&Amount::ONE_XLM)
}

/// Block-explorer link for a submitted transaction.
pub fn explorer_tx_url(explorer_base: &str, hash: &str) -> String {
    format!("{}/tx/{}", explorer_base.trim_end_matches('/'), hash)
}

/// Round a decimal digit string at `places` fraction digits, ties away from zero.
fn round_half_away(whole: &str, fraction: &str, places: usize) -> (String, String) {
    if fraction.len() <= places {
        return (whole.to_string(), fraction.to_string());
    }

    let mut digits: Vec<u8> = whole.bytes().chain(fraction.bytes().take(places)).collect();
    if fraction.as_bytes()[places] >= b'5' {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - places;
    let whole = digits[..split].iter().map(|&b| b as char).collect();
    let fraction = digits[split..].iter().map(|&b| b as char).collect();
    (whole, fraction)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Parse the longest numeric prefix, skipping leading whitespace.
fn parse_leading_float(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        return trimmed[..end + "Infinity".len()].parse::<f64>().ok();
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        digits += cursor - fraction_start;
        if digits > 0 {
            end = cursor;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if cursor < bytes.len() && matches!(bytes[cursor], b'+' | b'-') {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }

    let candidate = &trimmed[..end];
    // "5." and ".5" are accepted by the prefix scan; normalise for str::parse.
    let normalised = if candidate.ends_with('.') {
        format!("{}0", candidate)
    } else {
        candidate.to_string()
    };
    normalised.parse::<f64>().ok()
}
