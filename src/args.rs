//! Command-line range selection. Nothing here rejects input: malformed
//! numbers read as zero and malformed argument lists fall back to the
//! built-in ranges.

use crate::bridge::{ProgramConfig, MAX_WINDOWS};
use crate::range::DecodeRange;

/// Parses a hexadecimal number the way C's `strtoul(s, NULL, 16)` does:
/// optional leading whitespace, sign and `0x` prefix, then as many hex digits
/// as are present. No digits yields 0, overflow saturates.
pub fn parse_hex_lenient(s: &str) -> u32 {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let s = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_hexdigit()) => rest,
        _ => s,
    };

    let mut val = 0u32;
    for digit in s.chars().map_while(|c| c.to_digit(16)) {
        match val.checked_mul(16).and_then(|v| v.checked_add(digit)) {
            Some(v) => val = v,
            None => return u32::MAX,
        }
    }
    if negative {
        val.wrapping_neg()
    } else {
        val
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultReason {
    NoArguments,
    /// A base without its mask.
    Unpaired(usize),
    TooMany(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSelection {
    Explicit(Vec<DecodeRange>),
    Defaults(DefaultReason),
}

impl RangeSelection {
    pub fn ranges(&self) -> Vec<DecodeRange> {
        match self {
            RangeSelection::Explicit(ranges) => ranges.clone(),
            RangeSelection::Defaults(_) => DecodeRange::DEFAULTS.to_vec(),
        }
    }

    pub fn into_config(self) -> ProgramConfig {
        ProgramConfig {
            ranges: self.ranges(),
            ..ProgramConfig::default()
        }
    }
}

/// Turns positional `BASE MASK` pairs into ranges.
pub fn select_ranges<S: AsRef<str>>(values: &[S]) -> RangeSelection {
    let n = values.len();
    if n == 0 {
        return RangeSelection::Defaults(DefaultReason::NoArguments);
    }
    if n % 2 != 0 {
        return RangeSelection::Defaults(DefaultReason::Unpaired(n));
    }
    if n / 2 > MAX_WINDOWS {
        return RangeSelection::Defaults(DefaultReason::TooMany(n));
    }
    RangeSelection::Explicit(
        values
            .chunks_exact(2)
            .map(|pair| {
                DecodeRange::new(
                    parse_hex_lenient(pair[0].as_ref()),
                    parse_hex_lenient(pair[1].as_ref()),
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_hex() {
        assert_eq!(parse_hex_lenient("200"), 0x200);
        assert_eq!(parse_hex_lenient("0xFC"), 0xFC);
        assert_eq!(parse_hex_lenient("  a00"), 0xA00);
        assert_eq!(parse_hex_lenient("38zz"), 0x38);
        assert_eq!(parse_hex_lenient("zz"), 0);
        assert_eq!(parse_hex_lenient(""), 0);
        assert_eq!(parse_hex_lenient("0x"), 0);
        assert_eq!(parse_hex_lenient("-1"), u32::MAX);
        assert_eq!(parse_hex_lenient("123456789"), u32::MAX);
    }

    #[test]
    fn pairs() {
        let sel = select_ranges(&["300", "70", "388", "1c"]);
        assert_eq!(
            sel,
            RangeSelection::Explicit(vec![DecodeRange::new(0x300, 0x70), DecodeRange::new(0x388, 0x1C)])
        );
    }

    #[test]
    fn malformed_lists_use_defaults() {
        let none: [&str; 0] = [];
        assert_eq!(select_ranges(&none), RangeSelection::Defaults(DefaultReason::NoArguments));
        assert_eq!(select_ranges(&["200"]), RangeSelection::Defaults(DefaultReason::Unpaired(1)));
        let ten = ["1"; 10];
        assert_eq!(select_ranges(&ten), RangeSelection::Defaults(DefaultReason::TooMany(10)));
        assert_eq!(select_ranges(&ten).ranges(), DecodeRange::DEFAULTS.to_vec());
    }
}
