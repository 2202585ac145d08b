//! Recursive-descent decoding of packets from a bit cursor.

use std::cmp::Ordering;

use tracing::{event, span, Level};

use crate::bits::{binstring, BitCursor};
use crate::error::FormatError;
use crate::packet::{Header, LengthType, Operator, Packet};

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Decoding is bounded by a nesting limit; otherwise it is a pure
/// function of the bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthDescriptor {
    TotalBits(usize),
    ChildCount(usize),
}

fn read_header(cursor: &mut BitCursor<'_>) -> Result<Header, FormatError> {
    let version = cursor.read_number("version", 3)? as u8;
    let type_id = cursor.read_number("type id", 3)? as u8;
    Ok(Header { version, type_id })
}

/// Returns the literal's value and the number of groups it occupied.
fn read_literal(cursor: &mut BitCursor<'_>) -> Result<(u64, usize), FormatError> {
    let offset = cursor.position();
    let mut value: u64 = 0;
    let mut groups: usize = 0;
    loop {
        let more = cursor.read_bit("literal group")?;
        let nibble = cursor.read_number("literal group", 4)?;
        groups += 1;
        if value >> 60 != 0 {
            return Err(FormatError::LiteralOverflow { offset });
        }
        value = (value << 4) | nibble;
        if !more {
            break;
        }
    }
    Ok((value, groups))
}

fn read_length_descriptor(cursor: &mut BitCursor<'_>) -> Result<LengthDescriptor, FormatError> {
    let length_type = LengthType::from_bit(cursor.read_bit("length type")?);
    let width = length_type.field_width();
    Ok(match length_type {
        LengthType::TotalBits => {
            LengthDescriptor::TotalBits(cursor.read_number("subpacket bit length", width)? as usize)
        }
        LengthType::ChildCount => {
            LengthDescriptor::ChildCount(cursor.read_number("subpacket count", width)? as usize)
        }
    })
}

fn check_operands(operator: Operator, found: usize, offset: usize) -> Result<(), FormatError> {
    if found == 0 {
        Err(FormatError::NoOperands { operator, offset })
    } else if operator.is_binary() && found != 2 {
        Err(FormatError::WrongArity { operator, found })
    } else {
        Ok(())
    }
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder::default()
    }

    /// Sets how many levels of subpackets may sit below a top-level
    /// packet.
    pub fn with_max_depth(self, max_depth: usize) -> Decoder {
        Decoder { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decodes the packet starting at the cursor, leaving the cursor
    /// just past its last bit.
    pub fn decode_packet(&self, cursor: &mut BitCursor<'_>) -> Result<Packet, FormatError> {
        self.decode_at_depth(cursor, 0)
    }

    fn decode_at_depth(
        &self,
        cursor: &mut BitCursor<'_>,
        depth: usize,
    ) -> Result<Packet, FormatError> {
        if depth > self.max_depth {
            return Err(FormatError::TooDeep {
                limit: self.max_depth,
            });
        }
        let start = cursor.position();
        let header = read_header(cursor)?;
        event!(
            Level::TRACE,
            "packet at bit {}: version={}, type id={}, depth={}",
            start,
            header.version,
            header.type_id,
            depth,
        );
        if header.is_literal() {
            let (value, groups) = read_literal(cursor)?;
            event!(
                Level::TRACE,
                "literal at bit {}: value={} in {} groups",
                start,
                value,
                groups
            );
            return Ok(Packet::Literal {
                header,
                value,
                groups,
            });
        }

        let operator = Operator::try_from(header.type_id)?;
        let descriptor = read_length_descriptor(cursor)?;
        event!(
            Level::TRACE,
            "operator {} at bit {}: {:?}",
            operator,
            start,
            descriptor
        );
        let mut children: Vec<Packet> = Vec::new();
        let length_type = match descriptor {
            LengthDescriptor::TotalBits(declared) => {
                let children_start = cursor.position();
                loop {
                    let consumed = cursor.position() - children_start;
                    match consumed.cmp(&declared) {
                        Ordering::Less => {
                            children.push(self.decode_at_depth(cursor, depth + 1)?);
                        }
                        Ordering::Equal => {
                            break;
                        }
                        Ordering::Greater => {
                            return Err(FormatError::SubpacketLengthExceeded {
                                offset: children_start,
                                declared,
                                consumed,
                            });
                        }
                    }
                }
                LengthType::TotalBits
            }
            LengthDescriptor::ChildCount(count) => {
                children.reserve(count);
                for _ in 0..count {
                    children.push(self.decode_at_depth(cursor, depth + 1)?);
                }
                LengthType::ChildCount
            }
        };
        check_operands(operator, children.len(), start)?;
        Ok(Packet::Operator {
            header,
            operator,
            length_type,
            children,
        })
    }

    /// Decodes packets until only zero padding (or nothing) is left.
    pub fn decode_all(&self, bits: &[bool]) -> Result<Vec<Packet>, FormatError> {
        let span = span!(Level::DEBUG, "decode_all", nbits = bits.len());
        let _enter = span.enter();

        let mut cursor = BitCursor::new(bits);
        let mut packets: Vec<Packet> = Vec::new();
        while !cursor.only_padding_remains() {
            packets.push(self.decode_packet(&mut cursor)?);
        }
        if !cursor.is_exhausted() {
            event!(
                Level::TRACE,
                "ignoring {} bits of padding: {}",
                cursor.remaining(),
                binstring(cursor.unread()),
            );
        }
        Ok(packets)
    }

    /// Like `decode_all`, but the stream must hold exactly one
    /// top-level packet.
    pub fn decode_single(&self, bits: &[bool]) -> Result<Packet, FormatError> {
        let mut packets = self.decode_all(bits)?;
        match packets.len() {
            1 => Ok(packets.remove(0)),
            n => Err(FormatError::TopLevelCount(n)),
        }
    }
}

pub fn decode_packet(cursor: &mut BitCursor<'_>) -> Result<Packet, FormatError> {
    Decoder::default().decode_packet(cursor)
}

pub fn decode_all(bits: &[bool]) -> Result<Vec<Packet>, FormatError> {
    Decoder::default().decode_all(bits)
}

pub fn decode_single(bits: &[bool]) -> Result<Packet, FormatError> {
    Decoder::default().decode_single(bits)
}

#[cfg(test)]
use crate::bits::from_binstring;
#[cfg(test)]
use crate::hex::bits_from_hex;
#[cfg(test)]
use crate::packet::{lit, op};

#[cfg(test)]
fn decode_hex(s: &str) -> Vec<Packet> {
    let bits = match bits_from_hex(s) {
        Ok(bits) => bits,
        Err(e) => {
            panic!("decode_hex: bits_from_hex failed on {}: {}", s, e);
        }
    };
    match decode_all(&bits) {
        Ok(packets) => packets,
        Err(e) => {
            panic!("decode_hex: decode_all failed on {}: {}", s, e);
        }
    }
}

#[test]
fn test_decode_literal() {
    let bits = bits_from_hex("D2FE28").expect("valid test data");
    let mut cursor = BitCursor::new(&bits);
    let packet = decode_packet(&mut cursor).expect("valid packet");
    assert_eq!(
        packet,
        Packet::Literal {
            header: Header {
                version: 6,
                type_id: 4
            },
            value: 2021,
            groups: 3,
        }
    );
    assert_eq!(cursor.position(), 21);
    assert_eq!(binstring(cursor.unread()), "000");
}

#[test]
fn test_decode_operators() {
    assert_eq!(
        decode_hex("38006F45291200"),
        vec![op(
            1,
            Operator::LessThan,
            LengthType::TotalBits,
            vec![lit(6, 10), lit(2, 20)]
        )]
    );
    assert_eq!(
        decode_hex("EE00D40C823060"),
        vec![op(
            7,
            Operator::Maximum,
            LengthType::ChildCount,
            vec![lit(2, 1), lit(4, 2), lit(1, 3)]
        )]
    );
    assert_eq!(
        decode_hex("8A004A801A8002F478"),
        vec![op(
            4,
            Operator::Minimum,
            LengthType::ChildCount,
            vec![op(
                1,
                Operator::Minimum,
                LengthType::ChildCount,
                vec![op(
                    5,
                    Operator::Minimum,
                    LengthType::TotalBits,
                    vec![lit(6, 15)]
                )]
            )]
        )]
    );
    assert_eq!(
        decode_hex("620080001611562C8802118E34"),
        vec![op(
            3,
            Operator::Sum,
            LengthType::ChildCount,
            vec![
                op(
                    0,
                    Operator::Sum,
                    LengthType::TotalBits,
                    vec![lit(0, 10), lit(5, 11)]
                ),
                op(
                    1,
                    Operator::Sum,
                    LengthType::ChildCount,
                    vec![lit(0, 12), lit(3, 13)]
                ),
            ]
        )]
    );
    assert_eq!(
        decode_hex("A0016C880162017C3686B18A3D4780"),
        vec![op(
            5,
            Operator::Sum,
            LengthType::TotalBits,
            vec![op(
                1,
                Operator::Sum,
                LengthType::ChildCount,
                vec![op(
                    3,
                    Operator::Sum,
                    LengthType::ChildCount,
                    vec![lit(7, 6), lit(6, 6), lit(5, 12), lit(2, 15), lit(2, 15)]
                )]
            )]
        )]
    );
}

#[test]
fn test_bits_consumed_match_encoded_len() {
    for (hex, expected_len) in [
        ("D2FE28", 21),
        ("38006F45291200", 49),
        ("EE00D40C823060", 51),
        ("8A004A801A8002F478", 69),
        ("620080001611562C8802118E34", 102),
        ("C0015000016115A2E0802F182340", 106),
        ("A0016C880162017C3686B18A3D4780", 113),
        ("C200B40A82", 40),
        ("9C0141080250320F1802104A08", 102),
    ] {
        let bits = bits_from_hex(hex).expect("valid test data");
        let mut cursor = BitCursor::new(&bits);
        let packet = decode_packet(&mut cursor).expect("valid packet");
        assert_eq!(cursor.position(), expected_len, "bits consumed for {}", hex);
        assert_eq!(packet.encoded_len(), expected_len, "encoded_len for {}", hex);
        assert!(cursor.only_padding_remains());
    }
}

#[test]
fn test_literal_groups() {
    // Two leading zero groups, then 0x1 0x2.
    let bits = from_binstring("010 100 10000 10000 10001 00010");
    let packet = decode_single(&bits).expect("valid packet");
    assert_eq!(
        packet,
        Packet::Literal {
            header: Header {
                version: 2,
                type_id: 4
            },
            value: 0x12,
            groups: 4,
        }
    );
    assert_eq!(packet.encoded_len(), bits.len());
}

#[test]
fn test_literal_overflow() {
    let mut s = String::from("000 100");
    for _ in 0..16 {
        s.push_str(" 11111");
    }
    s.push_str(" 01111");
    assert_eq!(
        decode_single(&from_binstring(&s)),
        Err(FormatError::LiteralOverflow { offset: 6 })
    );

    // Sixteen significant nibbles still fit, even after a zero group.
    let mut s = String::from("000 100 10000");
    for _ in 0..15 {
        s.push_str(" 11111");
    }
    s.push_str(" 01111");
    let packet = decode_single(&from_binstring(&s)).expect("valid packet");
    assert!(matches!(
        packet,
        Packet::Literal {
            value: u64::MAX,
            groups: 17,
            ..
        }
    ));
}

#[test]
fn test_wrong_arity() {
    // LessThan with three operands, delimited by count.
    let bits = from_binstring(
        "000 110 1 00000000011 000 100 00001 000 100 00010 000 100 00011",
    );
    assert_eq!(
        decode_single(&bits),
        Err(FormatError::WrongArity {
            operator: Operator::LessThan,
            found: 3,
        })
    );

    // EqualTo with a single operand, delimited by bit length.
    let bits = from_binstring("000 111 0 000000000001011 000 100 00001");
    assert_eq!(
        decode_single(&bits),
        Err(FormatError::WrongArity {
            operator: Operator::EqualTo,
            found: 1,
        })
    );
}

#[test]
fn test_no_operands() {
    let bits = from_binstring("000 000 0 000000000000000 1");
    assert_eq!(
        decode_single(&bits),
        Err(FormatError::NoOperands {
            operator: Operator::Sum,
            offset: 0
        })
    );
    let bits = from_binstring("000 001 1 00000000000 1");
    assert_eq!(
        decode_single(&bits),
        Err(FormatError::NoOperands {
            operator: Operator::Product,
            offset: 0
        })
    );
}

#[test]
fn test_subpacket_length_exceeded() {
    // Declares 10 bits of subpackets, but the literal takes 11.
    let bits = from_binstring("000 000 0 000000000001010 000 100 00001");
    assert_eq!(
        decode_single(&bits),
        Err(FormatError::SubpacketLengthExceeded {
            offset: 22,
            declared: 10,
            consumed: 11,
        })
    );
}

#[test]
fn test_truncated_input() {
    let bits = bits_from_hex("D2FE").expect("valid test data");
    assert_eq!(
        decode_all(&bits),
        Err(FormatError::Exhausted {
            field: "literal group",
            offset: 16,
            needed: 1,
            available: 0,
        })
    );
    // Count mode promises two children but only one is present.
    let bits = from_binstring("000 000 1 00000000010 000 100 00001");
    assert!(matches!(
        decode_all(&bits),
        Err(FormatError::Exhausted {
            field: "version",
            offset: 29,
            ..
        })
    ));
    // Trailing bits that are not padding must decode as a packet.
    let bits = bits_from_hex("D2FE29").expect("valid test data");
    assert_eq!(
        decode_all(&bits),
        Err(FormatError::Exhausted {
            field: "type id",
            offset: 24,
            needed: 3,
            available: 0,
        })
    );
}

#[test]
fn test_padding_and_top_level_count() {
    assert_eq!(decode_all(&[]), Ok(Vec::new()));
    assert_eq!(decode_all(&[false; 30]), Ok(Vec::new()));
    assert_eq!(decode_single(&[]), Err(FormatError::TopLevelCount(0)));

    let one = "110 100 10111 11110 00101";
    let bits = from_binstring(&format!("{} {} 0000000", one, one));
    let packets = decode_all(&bits).expect("valid packets");
    assert_eq!(packets, vec![lit(6, 2021), lit(6, 2021)]);
    assert_eq!(decode_single(&bits), Err(FormatError::TopLevelCount(2)));
}

#[test]
fn test_max_depth() {
    // Sum(Sum(literal)), each operator delimited by count.
    let bits = from_binstring("000 000 1 00000000001 000 000 1 00000000001 000 100 00001");
    assert_eq!(
        Decoder::new().with_max_depth(1).decode_single(&bits),
        Err(FormatError::TooDeep { limit: 1 })
    );
    let decoder = Decoder::new().with_max_depth(2);
    assert_eq!(decoder.max_depth(), 2);
    assert_eq!(
        decoder.decode_single(&bits),
        Ok(op(
            0,
            Operator::Sum,
            LengthType::ChildCount,
            vec![op(0, Operator::Sum, LengthType::ChildCount, vec![lit(0, 1)])]
        ))
    );
    assert_eq!(Decoder::default().max_depth(), DEFAULT_MAX_DEPTH);
}
