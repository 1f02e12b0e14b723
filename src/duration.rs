//! Session duration strings such as `1h`, `90m` or `1h30m`.
//!
//! The accepted grammar is a possibly signed sequence of decimal numbers, each with an
//! optional fraction and a mandatory unit suffix (`ns`, `us`, `µs`, `μs`, `ms`, `s`, `m`, `h`).
//! A bare `0` is accepted without a unit.

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

/// Largest representable duration, in i64 nanoseconds
const MAX_NANOS: u128 = i64::MAX as u128;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "µs" | "μs" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

fn invalid(input: &str, reason: &'static str) -> crate::error::Error {
    crate::error::Error::InvalidDuration(input.to_owned(), reason)
}

/// Parse a duration string. Negative durations are rejected.
pub fn parse(input: &str) -> Result<std::time::Duration, crate::error::Error> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(std::time::Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid(input, "empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(s) => {
                let frac_len = s.bytes().take_while(u8::is_ascii_digit).count();
                s.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(input, "expected a number"));
        }

        let unit_len = after_frac
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_frac.len());
        let (unit, after_unit) = after_frac.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid(input, "missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid(input, "unknown unit"))?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?
        };
        let mut value = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid(input, "duration out of range"))?;

        // Digits beyond nanosecond precision cannot contribute, so only the first 18 are kept.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let frac: u128 = frac_digits
                .parse()
                .map_err(|_| invalid(input, "number out of range"))?;
            let denom = 10u128.pow(frac_digits.len() as u32);
            value += frac * scale / denom;
        }

        total = total
            .checked_add(value)
            .ok_or_else(|| invalid(input, "duration out of range"))?;
        if total > MAX_NANOS {
            return Err(invalid(input, "duration out of range"));
        }
        rest = after_unit;
    }

    if negative && total > 0 {
        return Err(invalid(input, "negative duration"));
    }

    Ok(std::time::Duration::new(
        (total / SECOND) as u64,
        (total % SECOND) as u32,
    ))
}

/// Parse a duration string into whole seconds, truncating sub-second remainders.
pub fn parse_seconds(input: &str) -> Result<u32, crate::error::Error> {
    let secs = parse(input)?.as_secs();
    u32::try_from(secs).map_err(|_| invalid(input, "duration out of range"))
}
