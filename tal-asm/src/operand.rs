//! Operand parsing and range checks.

use crate::error::{Constraint, ErrorKind};

/// Character class names accepted by `strclass`, in selector order.
pub const CHAR_CLASSES: &[&str] = &[
    "alnum", "alpha", "ascii", "control", "digit", "graph", "lower", "print", "punct", "space",
    "upper", "word", "xdigit",
];

/// Encoded list index meaning "before the first element".
pub const INDEX_BEFORE: i32 = -1;
/// Encoded list index meaning `end`; `end-N` is `INDEX_END - N`.
pub const INDEX_END: i32 = -2;
/// Encoded list index meaning "after the last element".
pub const INDEX_AFTER: i32 = i32::MAX;

type Result<T> = std::result::Result<T, ErrorKind>;

/// Parse an integer: optional sign, then decimal or `0x`/`0o`/`0b` digits.
pub fn parse_int(word: &str) -> Result<i32> {
    let wide = parse_wide(word.trim()).ok_or_else(|| ErrorKind::NotAnInteger(word.to_owned()))?;
    i32::try_from(wide).map_err(|_| ErrorKind::NotAnInteger(word.to_owned()))
}

fn parse_wide(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_owned())
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_owned())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_owned())
    } else {
        (10, lower)
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(&body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a boolean: an integer (nonzero is true) or an unambiguous prefix
/// of `true`, `false`, `yes`, `no`, `on` or `off`, in any case.
pub fn parse_bool(word: &str) -> Result<bool> {
    if let Some(value) = parse_wide(word.trim()) {
        return Ok(value != 0);
    }
    const WORDS: &[(&str, bool)] = &[
        ("true", true),
        ("false", false),
        ("yes", true),
        ("no", false),
        ("on", true),
        ("off", false),
    ];
    let lower = word.trim().to_ascii_lowercase();
    let mut matches = WORDS
        .iter()
        .filter(|(name, _)| !lower.is_empty() && name.starts_with(lower.as_str()))
        .map(|&(_, value)| value);
    let found = match matches.next() {
        Some(value) if matches.all(|other| other == value) => Some(value),
        _ => None,
    };
    found.ok_or_else(|| ErrorKind::NotABoolean(word.to_owned()))
}

pub fn check_one_byte(value: i32) -> Result<i32> {
    if (0..=0xff).contains(&value) {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::OneByte))
    }
}

pub fn check_signed_byte(value: i32) -> Result<i32> {
    if (-0x80..=0x7f).contains(&value) {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::SignedByte))
    }
}

pub fn check_nonnegative(value: i32) -> Result<i32> {
    if value >= 0 {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::NonNegative))
    }
}

pub fn check_positive(value: i32) -> Result<i32> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::Positive))
    }
}

pub fn check_at_least_two(value: i32) -> Result<i32> {
    if value >= 2 {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::AtLeastTwo))
    }
}

pub fn check_clock_selector(value: i32) -> Result<i32> {
    if (0..=3).contains(&value) {
        Ok(value)
    } else {
        Err(ErrorKind::OutOfRange(Constraint::ClockSelector))
    }
}

/// Encode a list index (`3`, `end`, `end-1`, `2+1`, ...) as the interpreter
/// expects it in a four-byte index operand.
pub fn parse_index(word: &str) -> Result<i32> {
    let bad = || ErrorKind::BadIndex(word.to_owned());
    let text = word.trim();

    if let Some(rest) = text.strip_prefix("end") {
        if rest.is_empty() {
            return Ok(INDEX_END);
        }
        let mut chars = rest.chars();
        let sign = chars.next();
        let offset = chars.as_str();
        if !matches!(sign, Some('+' | '-')) || offset.starts_with(['+', '-']) {
            return Err(bad());
        }
        let offset = parse_wide(offset).ok_or_else(bad)?;
        let offset = if sign == Some('-') { -offset } else { offset };
        // Anything past the end is INDEX_AFTER; offsets too far below
        // INDEX_END for an i32 are INDEX_BEFORE.
        return Ok(if offset > 0 {
            INDEX_AFTER
        } else if offset < i64::from(i32::MIN) - i64::from(INDEX_END) {
            INDEX_BEFORE
        } else {
            INDEX_END + offset as i32
        });
    }

    let value = match split_arith(text) {
        Some((lhs, op, rhs)) => {
            let lhs = parse_wide(lhs).ok_or_else(bad)?;
            let rhs = parse_wide(rhs).ok_or_else(bad)?;
            let value = if op == '+' {
                lhs.checked_add(rhs)
            } else {
                lhs.checked_sub(rhs)
            };
            value.ok_or_else(bad)?
        }
        None => parse_wide(text).ok_or_else(bad)?,
    };
    Ok(match value {
        v if v < 0 => INDEX_BEFORE,
        v => i32::try_from(v).unwrap_or(INDEX_AFTER),
    })
}

/// Split `a+b` / `a-b`, ignoring a leading sign on `a`.
fn split_arith(text: &str) -> Option<(&str, char, &str)> {
    let start = usize::from(text.starts_with(['+', '-']));
    let at = text[start..].find(['+', '-'])? + start;
    let op = text[at..].chars().next()?;
    Some((&text[..at], op, &text[at + 1..]))
}

/// Selector byte of a character class name.
pub fn parse_char_class(word: &str) -> Result<u8> {
    CHAR_CLASSES
        .iter()
        .position(|&name| name == word)
        .map(|i| i as u8)
        .ok_or_else(|| ErrorKind::BadCharClass(word.to_owned()))
}

/// Whether `name` can be a compiled local: no namespace qualifiers and not
/// an array element reference.
pub fn is_local_scalar(name: &str) -> bool {
    if name.contains("::") {
        return false;
    }
    !(name.ends_with(')') && name.contains('('))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("-7"), Ok(-7));
        assert_eq!(parse_int("0x1F"), Ok(31));
        assert_eq!(parse_int("0b101"), Ok(5));
        assert_eq!(parse_int(" 12 "), Ok(12));
        assert!(matches!(parse_int("12a"), Err(ErrorKind::NotAnInteger(_))));
        assert!(matches!(parse_int(""), Err(ErrorKind::NotAnInteger(_))));
        assert!(matches!(parse_int("99999999999"), Err(ErrorKind::NotAnInteger(_))));
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("1"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("n"), Ok(false));
        assert_eq!(parse_bool("of"), Ok(false));
        assert!(parse_bool("o").is_err());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(check_one_byte(255), Ok(255));
        assert!(check_one_byte(256).is_err());
        assert!(check_one_byte(-1).is_err());
        assert_eq!(check_signed_byte(-128), Ok(-128));
        assert_eq!(
            check_signed_byte(200),
            Err(ErrorKind::OutOfRange(Constraint::SignedByte))
        );
        assert!(check_positive(0).is_err());
        assert!(check_nonnegative(0).is_ok());
        assert!(check_at_least_two(1).is_err());
        assert!(check_clock_selector(4).is_err());
    }

    #[test]
    fn indices() {
        assert_eq!(parse_index("0"), Ok(0));
        assert_eq!(parse_index("5"), Ok(5));
        assert_eq!(parse_index("-3"), Ok(INDEX_BEFORE));
        assert_eq!(parse_index("end"), Ok(INDEX_END));
        assert_eq!(parse_index("end-1"), Ok(-3));
        assert_eq!(parse_index("end+0"), Ok(INDEX_END));
        assert_eq!(parse_index("end+2"), Ok(INDEX_AFTER));
        assert_eq!(parse_index("2+3"), Ok(5));
        assert_eq!(parse_index("1-4"), Ok(INDEX_BEFORE));
        assert!(matches!(parse_index("end--1"), Err(ErrorKind::BadIndex(_))));
        assert!(matches!(parse_index("en"), Err(ErrorKind::BadIndex(_))));
    }

    #[test]
    fn indices_at_the_limits() {
        assert_eq!(parse_index("end-2147483646"), Ok(i32::MIN));
        assert_eq!(parse_index("end-2147483647"), Ok(INDEX_BEFORE));
        assert_eq!(parse_index("end-9223372036854775807"), Ok(INDEX_BEFORE));
        assert_eq!(parse_index("9223372036854775807"), Ok(INDEX_AFTER));
        assert!(matches!(
            parse_index("9223372036854775807+1"),
            Err(ErrorKind::BadIndex(_))
        ));
        assert!(matches!(
            parse_index("-9223372036854775807-2"),
            Err(ErrorKind::BadIndex(_))
        ));
    }

    #[test]
    fn char_classes() {
        assert_eq!(parse_char_class("alnum"), Ok(0));
        assert_eq!(parse_char_class("xdigit"), Ok(12));
        assert!(parse_char_class("bogus").is_err());
    }

    #[test]
    fn local_names() {
        assert!(is_local_scalar("x"));
        assert!(!is_local_scalar("a::b"));
        assert!(!is_local_scalar("arr(i)"));
    }
}
