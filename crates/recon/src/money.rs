//! Fixed-point money: amounts live as i64 minor units (paise) end to end.

/// Minor units per major unit (2 decimal places).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Parse a decimal amount string to i64 minor units, without going through f64.
///
/// Handles "1234.56", "1234.5", "1234", "-1234.56", ".5" and "30.000".
/// Digits past the second decimal place must be zeros.
pub fn parse_amount_minor(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if s.is_empty() {
        return Err("empty amount".into());
    }

    let (whole_str, frac_str) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(format!("bad amount: {s}"));
    }
    if !whole_str.bytes().all(|b| b.is_ascii_digit()) || !frac_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("bad amount: {s}"));
    }

    let whole: i64 = if whole_str.is_empty() {
        0
    } else {
        whole_str.parse().map_err(|e| format!("bad amount: {e}"))?
    };

    let (kept, rest) = frac_str.split_at(frac_str.len().min(2));
    if rest.bytes().any(|b| b != b'0') {
        return Err(format!("too many decimal places: {s}"));
    }
    let frac: i64 = match kept.len() {
        0 => 0,
        1 => kept.parse::<i64>().map_err(|e| format!("bad fraction: {e}"))? * 10,
        _ => kept.parse().map_err(|e| format!("bad fraction: {e}"))?,
    };

    let minor = whole
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|m| m.checked_add(frac))
        .ok_or_else(|| format!("amount out of range: {s}"))?;
    Ok(if negative { -minor } else { minor })
}

/// Format minor units as a fixed 2-decimal string ("-10.50").
pub fn format_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    let per = MINOR_PER_MAJOR as u64;
    format!("{sign}{}.{:02}", abs / per, abs % per)
}

/// Minor units as a major-unit float. Display and statistics only.
pub fn to_major(minor: i64) -> f64 {
    minor as f64 / MINOR_PER_MAJOR as f64
}
