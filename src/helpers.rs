//! Numeric conversions and JSON equality with exact number semantics.
use std::cmp::Ordering;
use std::str::FromStr;

use fraction::{BigFraction, BigUint};
use serde_json::{Number, Value};

/// Convert a JSON number to an exact decimal fraction.
///
/// The conversion goes through the number's decimal text, not through `f64`,
/// so `0.1` becomes exactly `1/10`. Returns `None` for text that is not a
/// decimal number, which the validator surfaces as an invalid-JSON-type
/// error.
pub(crate) fn to_fraction(number: &Number) -> Option<BigFraction> {
    parse_decimal(&number.to_string())
}

fn parse_decimal(text: &str) -> Option<BigFraction> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, i64::from_str(exponent).ok()?),
        None => (unsigned, 0),
    };
    let (integral, fractional) = match mantissa.split_once('.') {
        Some((integral, fractional)) => (integral, fractional),
        None => (mantissa, ""),
    };
    if integral.is_empty() && fractional.is_empty() {
        return None;
    }
    let mut digits = String::with_capacity(integral.len() + fractional.len());
    digits.push_str(integral);
    digits.push_str(fractional);
    let mut numerator = BigUint::from_str(&digits).ok()?;
    let mut denominator = BigUint::from(1_u8);
    let scale = exponent - i64::try_from(fractional.len()).ok()?;
    let ten = BigUint::from(10_u8);
    if scale >= 0 {
        for _ in 0..scale {
            numerator *= ten.clone();
        }
    } else {
        for _ in 0..-scale {
            denominator *= ten.clone();
        }
    }
    let fraction = BigFraction::new(numerator, denominator);
    Some(if negative { -fraction } else { fraction })
}

/// Compare two JSON numbers exactly. `None` means one of them could not be
/// interpreted as a decimal.
pub(crate) fn compare(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return Some(a.cmp(&b));
    }
    to_fraction(a)?.partial_cmp(&to_fraction(b)?)
}

/// Whether a JSON number is an integer under the given strictness.
///
/// Draft 4 requires an integral literal (`1.0` is not an integer there);
/// later drafts accept any number with a zero fractional part.
pub(crate) fn is_integer(number: &Number, strict: bool) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    if strict {
        return false;
    }
    matches!(to_fraction(number), Some(fraction) if is_integral(&fraction))
}

pub(crate) fn is_integral(fraction: &BigFraction) -> bool {
    matches!(fraction.denom(), Some(denom) if *denom == BigUint::from(1_u8))
}

pub(crate) fn is_positive(number: &Number) -> bool {
    if let Some(value) = number.as_i64() {
        return value > 0;
    }
    matches!(to_fraction(number), Some(fraction) if fraction > BigFraction::from(0.0))
}

/// Deep JSON equality with exact numeric comparison, so `1` equals `1.0`.
pub(crate) fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => compare(a, b) == Some(Ordering::Equal),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| equal(value, other)))
        }
        _ => false,
    }
}
