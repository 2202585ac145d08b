//! Hex text, as it arrives on a puzzle input line, to nibbles.

use nom::{
    character::complete::{multispace0, satisfy},
    combinator::map,
    multi::many0,
    sequence::delimited,
    IResult,
};

use crate::bits::bits_from_nibbles;
use crate::error::FormatError;

fn hex_digit(input: &str) -> IResult<&str, u8> {
    map(satisfy(|ch: char| ch.is_ascii_hexdigit()), |ch: char| {
        // satisfy() only lets hex digits through.
        ch.to_digit(16).map_or(0, |n| n as u8)
    })(input)
}

fn hex_digits(input: &str) -> IResult<&str, Vec<u8>> {
    delimited(multispace0, many0(hex_digit), multispace0)(input)
}

/// Parses a line of hex digits (either case) into nibbles.
/// Leading and trailing whitespace is ignored.
pub fn parse_nibbles(s: &str) -> Result<Vec<u8>, FormatError> {
    let (unparsed, nibbles) = match hex_digits(s) {
        Ok(parsed) => parsed,
        // many0 and multispace0 cannot fail on &str input, but if they
        // did, blame the first character.
        Err(_) => (s, Vec::new()),
    };
    match unparsed.chars().next() {
        None => Ok(nibbles),
        Some(digit) => Err(FormatError::InvalidHexDigit {
            digit,
            position: s[..s.len() - unparsed.len()].chars().count(),
        }),
    }
}

pub fn bits_from_hex(s: &str) -> Result<Vec<bool>, FormatError> {
    bits_from_nibbles(parse_nibbles(s)?)
}

#[test]
fn test_parse_nibbles() {
    assert_eq!(
        parse_nibbles("D2FE28"),
        Ok(vec![0xD, 0x2, 0xF, 0xE, 0x2, 0x8])
    );
    assert_eq!(parse_nibbles("d2fe28\n"), parse_nibbles("D2FE28"));
    assert_eq!(parse_nibbles(""), Ok(Vec::new()));
    assert_eq!(
        parse_nibbles("2Z"),
        Err(FormatError::InvalidHexDigit {
            digit: 'Z',
            position: 1
        })
    );
    assert_eq!(
        parse_nibbles("  AB CD"),
        Err(FormatError::InvalidHexDigit {
            digit: 'C',
            position: 5
        })
    );
}

#[test]
fn test_bits_from_hex() {
    assert_eq!(
        bits_from_hex("F0"),
        Ok(vec![true, true, true, true, false, false, false, false])
    );
    assert_eq!(
        bits_from_hex("52"),
        Ok(vec![false, true, false, true, false, false, true, false])
    );
    assert!(bits_from_hex("2Z").is_err());
}
