//! Built-in `format` validators.
//!
//! Formats receive the instance value and pass vacuously for anything but
//! strings. IDN variants (`idn-hostname`, `idn-email`) are not implemented.
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

use ahash::AHashMap;
use email_address::EmailAddress;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde_json::Value;
use url::Url;

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("Is a valid regex"));
static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)\z").expect("Is a valid regex")
});
static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-fA-F]{2})|\{[+#./;?&=,!@|]?(?:[a-zA-Z0-9_]|%[0-9a-fA-F]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-zA-Z0-9_]|%[0-9a-fA-F]{2})+(?::[1-9][0-9]{0,3}|\*)?)*})*\z"#,
    )
    .expect("Is a valid regex")
});
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?!$)(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?=\d)(?:\d+H)?(?:\d+M)?(?:\d+S)?)?)$")
        .expect("Is a valid regex")
});
static URI_REFERENCE_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("json-schema://format/").expect("Is a valid URL"));

pub(crate) type Format = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

fn string_format(check: fn(&str) -> bool) -> Format {
    Arc::new(move |value: &Value| value.as_str().map_or(true, check))
}

/// The default format registry, copied into every compiler.
pub(crate) fn defaults() -> AHashMap<String, Format> {
    let mut formats = AHashMap::with_capacity(16);
    formats.insert("date".to_string(), string_format(is_valid_date));
    formats.insert("time".to_string(), string_format(is_valid_time));
    formats.insert("date-time".to_string(), string_format(is_valid_date_time));
    formats.insert("duration".to_string(), string_format(is_valid_duration));
    formats.insert("period".to_string(), string_format(is_valid_period));
    formats.insert("email".to_string(), string_format(is_valid_email));
    formats.insert("hostname".to_string(), string_format(is_valid_hostname));
    formats.insert("ipv4".to_string(), string_format(is_valid_ipv4));
    formats.insert("ipv6".to_string(), string_format(is_valid_ipv6));
    formats.insert("uri".to_string(), string_format(is_valid_uri));
    formats.insert(
        "uri-reference".to_string(),
        string_format(is_valid_uri_reference),
    );
    formats.insert(
        "uri-template".to_string(),
        string_format(is_valid_uri_template),
    );
    formats.insert("uuid".to_string(), string_format(is_valid_uuid));
    formats.insert("regex".to_string(), string_format(is_valid_regex));
    formats.insert(
        "json-pointer".to_string(),
        string_format(is_valid_json_pointer),
    );
    formats.insert(
        "relative-json-pointer".to_string(),
        string_format(is_valid_relative_json_pointer),
    );
    formats
}

const fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn is_valid_date(date: &str) -> bool {
    let bytes = date.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    for idx in [0, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[idx].is_ascii_digit() {
            return false;
        }
    }
    let year = (bytes[0] - b'0') as u16 * 1000
        + (bytes[1] - b'0') as u16 * 100
        + (bytes[2] - b'0') as u16 * 10
        + (bytes[3] - b'0') as u16;
    let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
    let day = (bytes[8] - b'0') * 10 + (bytes[9] - b'0');
    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => day <= 31,
        4 | 6 | 9 | 11 => day <= 30,
        2 => day <= if is_leap_year(year) { 29 } else { 28 },
        _ => false,
    }
}

fn is_valid_time(time: &str) -> bool {
    let bytes = time.as_bytes();
    if bytes.len() < 9 {
        return false;
    }
    let two_digits = |at: usize| -> Option<u32> {
        if bytes[at].is_ascii_digit() && bytes[at + 1].is_ascii_digit() {
            Some(((bytes[at] - b'0') * 10 + (bytes[at + 1] - b'0')) as u32)
        } else {
            None
        }
    };
    if bytes[2] != b':' || bytes[5] != b':' {
        return false;
    }
    let (Some(hour), Some(minute), Some(second)) = (two_digits(0), two_digits(3), two_digits(6))
    else {
        return false;
    };
    if hour > 23 || minute > 59 || second > 60 {
        return false;
    }
    let mut idx = 8;
    if idx < bytes.len() && bytes[idx] == b'.' {
        idx += 1;
        let fraction_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == fraction_start {
            return false;
        }
    }
    if idx >= bytes.len() {
        return false;
    }
    let (offset_minutes, negative) = match bytes[idx] {
        b'Z' | b'z' => {
            if idx + 1 != bytes.len() {
                return false;
            }
            (0, false)
        }
        sign @ (b'+' | b'-') => {
            if bytes.len() - idx != 6 || bytes[idx + 3] != b':' {
                return false;
            }
            let (Some(oh), Some(om)) = (two_digits(idx + 1), two_digits(idx + 4)) else {
                return false;
            };
            if oh > 23 || om > 59 {
                return false;
            }
            (oh * 60 + om, sign == b'-')
        }
        _ => return false,
    };
    if second == 60 {
        // Leap seconds exist only at 23:59:60 UTC.
        let local = (hour * 60 + minute) as i32;
        let offset = offset_minutes as i32 * if negative { -1 } else { 1 };
        let utc = (local - offset).rem_euclid(24 * 60);
        if utc != 23 * 60 + 59 {
            return false;
        }
    }
    true
}

fn is_valid_date_time(value: &str) -> bool {
    if !value.is_ascii() || value.len() < 11 {
        return false;
    }
    let (date, rest) = value.split_at(10);
    let bytes = rest.as_bytes();
    (bytes[0] == b'T' || bytes[0] == b't') && is_valid_date(date) && is_valid_time(&rest[1..])
}

fn is_valid_duration(value: &str) -> bool {
    DURATION_RE.is_match(value).unwrap_or(false)
}

/// An ISO 8601 period: two date-times, or a date-time paired with a
/// duration on either side.
fn is_valid_period(value: &str) -> bool {
    let Some((start, end)) = value.split_once('/') else {
        return false;
    };
    (is_valid_date_time(start) && is_valid_date_time(end))
        || (is_valid_date_time(start) && is_valid_duration(end))
        || (is_valid_duration(start) && is_valid_date_time(end))
}

fn is_valid_email(value: &str) -> bool {
    EmailAddress::from_str(value).is_ok()
}

fn is_valid_hostname(value: &str) -> bool {
    let hostname = value.strip_suffix('.').unwrap_or(value);
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-')
    })
}

fn is_valid_ipv4(value: &str) -> bool {
    Ipv4Addr::from_str(value).is_ok()
}

fn is_valid_ipv6(value: &str) -> bool {
    Ipv6Addr::from_str(value).is_ok()
}

/// The `url` crate silently percent-encodes some characters that make a
/// URI invalid, so those are rejected up-front.
fn has_invalid_uri_characters(value: &str) -> bool {
    value
        .chars()
        .any(|ch| ch.is_whitespace() || ch == '\\' || ch == '<' || ch == '>' || ch == '"')
}

fn is_valid_uri(value: &str) -> bool {
    !has_invalid_uri_characters(value) && Url::parse(value).is_ok()
}

fn is_valid_uri_reference(value: &str) -> bool {
    !has_invalid_uri_characters(value)
        && Url::options()
            .base_url(Some(&URI_REFERENCE_BASE))
            .parse(value)
            .is_ok()
}

fn is_valid_uri_template(value: &str) -> bool {
    URI_TEMPLATE_RE.is_match(value).unwrap_or(false)
}

fn is_valid_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (idx, byte) in bytes.iter().enumerate() {
        match idx {
            8 | 13 | 18 | 23 => {
                if *byte != b'-' {
                    return false;
                }
            }
            _ => {
                if !byte.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

fn is_valid_regex(value: &str) -> bool {
    Regex::new(value).is_ok()
}

fn is_valid_json_pointer(value: &str) -> bool {
    JSON_POINTER_RE.is_match(value).unwrap_or(false)
}

fn is_valid_relative_json_pointer(value: &str) -> bool {
    RELATIVE_JSON_POINTER_RE.is_match(value).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2024-02-29", true; "leap day")]
    #[test_case("2023-02-29", false; "non leap day")]
    #[test_case("2024-13-01", false; "bad month")]
    #[test_case("2024-04-31", false; "bad day")]
    #[test_case("2024-1-01", false; "missing digit")]
    fn date(value: &str, expected: bool) {
        assert_eq!(is_valid_date(value), expected);
    }

    #[test_case("23:59:59Z", true; "utc")]
    #[test_case("08:30:06.283185Z", true; "fraction")]
    #[test_case("23:59:60Z", true; "leap second utc")]
    #[test_case("15:59:60-08:00", true; "leap second in offset")]
    #[test_case("12:00:60Z", false; "leap second at noon")]
    #[test_case("08:30:06-8:000", false; "bad offset")]
    #[test_case("24:00:00Z", false; "bad hour")]
    #[test_case("08:30:06", false; "missing offset")]
    fn time(value: &str, expected: bool) {
        assert_eq!(is_valid_time(value), expected);
    }

    #[test_case("1963-06-19T08:30:06.283185Z", true; "with fraction")]
    #[test_case("1963-06-19t08:30:06z", true; "lowercase separators")]
    #[test_case("06/19/1963 08:30:06 PST", false; "not rfc3339")]
    fn date_time(value: &str, expected: bool) {
        assert_eq!(is_valid_date_time(value), expected);
    }

    #[test_case("P4Y", true; "years")]
    #[test_case("PT0S", true; "zero seconds")]
    #[test_case("P1W", true; "weeks")]
    #[test_case("P4Y3M2DT1H", true; "combined")]
    #[test_case("P", false; "bare designator")]
    #[test_case("PT", false; "bare time designator")]
    #[test_case("P1D2H", false; "time component without T")]
    #[test_case("P2W1D", false; "weeks mixed with days")]
    fn duration(value: &str, expected: bool) {
        assert_eq!(is_valid_duration(value), expected);
    }

    #[test_case("2024-01-01T00:00:00Z/2024-12-31T23:59:59Z", true; "two datetimes")]
    #[test_case("2024-01-01T00:00:00Z/P1Y", true; "datetime and duration")]
    #[test_case("P1Y/2024-12-31T23:59:59Z", true; "duration and datetime")]
    #[test_case("P1Y/P2Y", false; "two durations")]
    fn period(value: &str, expected: bool) {
        assert_eq!(is_valid_period(value), expected);
    }

    #[test_case("www.example.com", true; "plain")]
    #[test_case("a-b.c", true; "hyphenated")]
    #[test_case("-bad.example", false; "leading hyphen")]
    #[test_case("under_score.example", false; "underscore")]
    fn hostname(value: &str, expected: bool) {
        assert_eq!(is_valid_hostname(value), expected);
    }

    #[test_case("127.0.0.1", true; "loopback")]
    #[test_case("127.000.0.1", false; "leading zeros")]
    #[test_case("::1", false; "ipv6 is not ipv4")]
    fn ipv4(value: &str, expected: bool) {
        assert_eq!(is_valid_ipv4(value), expected);
    }

    #[test_case("http://example.com/path?q=1#frag", true; "absolute")]
    #[test_case("urn:uuid:6e8bc430-9c3a-11d9-9669-0800200c9a66", true; "urn")]
    #[test_case("//example.com/relative", false; "protocol relative")]
    #[test_case("http://example.com/with space", false; "space")]
    fn uri(value: &str, expected: bool) {
        assert_eq!(is_valid_uri(value), expected);
    }

    #[test_case("a/relative/path", true; "relative")]
    #[test_case("#fragment", true; "fragment only")]
    fn uri_reference(value: &str, expected: bool) {
        assert_eq!(is_valid_uri_reference(value), expected);
    }

    #[test_case("6e8bc430-9c3a-11d9-9669-0800200c9a66", true; "hyphenated")]
    #[test_case("6e8bc430-9c3a-11d9-9669-0800200c9a6", false; "too short")]
    #[test_case("6e8bc4309c3a11d996690800200c9a66", false; "no hyphens")]
    fn uuid(value: &str, expected: bool) {
        assert_eq!(is_valid_uuid(value), expected);
    }

    #[test_case("/foo/bar~0baz", true; "escaped tilde")]
    #[test_case("/foo/~2", false; "bad escape")]
    fn json_pointer(value: &str, expected: bool) {
        assert_eq!(is_valid_json_pointer(value), expected);
    }

    #[test]
    fn non_strings_pass() {
        let check = string_format(is_valid_date);
        assert!(check(&serde_json::json!(42)));
    }
}
