use std::fmt::{self, Display, Formatter};

use crate::error::FormatError;

pub const LITERAL_TYPE_ID: u8 = 4;
pub const HEADER_BITS: usize = 6;
pub const LITERAL_GROUP_BITS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub version: u8,
    pub type_id: u8,
}

impl Header {
    pub fn is_literal(&self) -> bool {
        self.type_id == LITERAL_TYPE_ID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Sum,
    Product,
    Minimum,
    Maximum,
    GreaterThan,
    LessThan,
    EqualTo,
}

impl Operator {
    pub fn type_id(self) -> u8 {
        match self {
            Operator::Sum => 0,
            Operator::Product => 1,
            Operator::Minimum => 2,
            Operator::Maximum => 3,
            Operator::GreaterThan => 5,
            Operator::LessThan => 6,
            Operator::EqualTo => 7,
        }
    }

    /// Comparison operators take exactly two operands; the others
    /// take one or more.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Operator::GreaterThan | Operator::LessThan | Operator::EqualTo
        )
    }
}

impl TryFrom<u8> for Operator {
    type Error = FormatError;
    fn try_from(type_id: u8) -> Result<Operator, FormatError> {
        match type_id {
            0 => Ok(Operator::Sum),
            1 => Ok(Operator::Product),
            2 => Ok(Operator::Minimum),
            3 => Ok(Operator::Maximum),
            5 => Ok(Operator::GreaterThan),
            6 => Ok(Operator::LessThan),
            7 => Ok(Operator::EqualTo),
            other => Err(FormatError::UnknownTypeId(other)),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Sum => "+",
            Operator::Product => "*",
            Operator::Minimum => "min",
            Operator::Maximum => "max",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::EqualTo => "==",
        })
    }
}

#[test]
fn test_operator_type_ids() {
    for type_id in 0..8_u8 {
        match Operator::try_from(type_id) {
            Ok(op) => {
                assert_eq!(op.type_id(), type_id);
            }
            Err(e) => {
                assert_eq!(type_id, LITERAL_TYPE_ID);
                assert_eq!(e, FormatError::UnknownTypeId(4));
            }
        }
    }
    assert!(Operator::try_from(8).is_err());
    assert!(Operator::EqualTo.is_binary());
    assert!(!Operator::Maximum.is_binary());
}

/// How an operator packet's children were delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthType {
    /// A 15-bit count of the bits the children occupy.
    TotalBits,
    /// An 11-bit count of immediate children.
    ChildCount,
}

impl LengthType {
    pub fn from_bit(bit: bool) -> LengthType {
        if bit {
            LengthType::ChildCount
        } else {
            LengthType::TotalBits
        }
    }

    pub fn field_width(self) -> usize {
        match self {
            LengthType::TotalBits => 15,
            LengthType::ChildCount => 11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Literal {
        header: Header,
        value: u64,
        /// Number of 5-bit groups the value was encoded in.  This can
        /// exceed the minimum if the encoder emitted leading zero
        /// groups.
        groups: usize,
    },
    Operator {
        header: Header,
        operator: Operator,
        length_type: LengthType,
        children: Vec<Packet>,
    },
}

/// The number of groups needed to encode `value` without leading
/// zero groups.
pub fn minimal_groups(value: u64) -> usize {
    let significant_bits = (u64::BITS - value.leading_zeros()) as usize;
    std::cmp::max(1, (significant_bits + 3) / 4)
}

#[test]
fn test_minimal_groups() {
    assert_eq!(minimal_groups(0), 1);
    assert_eq!(minimal_groups(0xF), 1);
    assert_eq!(minimal_groups(0x10), 2);
    assert_eq!(minimal_groups(2021), 3);
    assert_eq!(minimal_groups(u64::MAX), 16);
}

impl Packet {
    pub fn header(&self) -> &Header {
        match self {
            Packet::Literal { header, .. } | Packet::Operator { header, .. } => header,
        }
    }

    pub fn version(&self) -> u8 {
        self.header().version
    }

    pub fn children(&self) -> &[Packet] {
        match self {
            Packet::Literal { .. } => &[],
            Packet::Operator { children, .. } => children.as_slice(),
        }
    }

    /// The number of bits this packet and all its descendants occupy
    /// in the encoding.
    pub fn encoded_len(&self) -> usize {
        match self {
            Packet::Literal { groups, .. } => HEADER_BITS + groups * LITERAL_GROUP_BITS,
            Packet::Operator {
                length_type,
                children,
                ..
            } => {
                let them: usize = children.iter().map(Packet::encoded_len).sum();
                HEADER_BITS + 1 + length_type.field_width() + them
            }
        }
    }

    /// Iterates over the headers of this packet and all its
    /// descendants, in the order they appear in the encoding.
    pub fn headers(&self) -> Headers<'_> {
        Headers { stack: vec![self] }
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Literal { value, .. } => write!(f, "{}", value),
            Packet::Operator {
                operator, children, ..
            } => {
                write!(f, "({}", operator)?;
                for child in children {
                    write!(f, " {}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

pub struct Headers<'a> {
    stack: Vec<&'a Packet>,
}

impl<'a> Iterator for Headers<'a> {
    type Item = &'a Header;

    fn next(&mut self) -> Option<&'a Header> {
        let packet = self.stack.pop()?;
        self.stack.extend(packet.children().iter().rev());
        Some(packet.header())
    }
}

#[cfg(test)]
pub(crate) fn lit(version: u8, value: u64) -> Packet {
    Packet::Literal {
        header: Header {
            version,
            type_id: LITERAL_TYPE_ID,
        },
        value,
        groups: minimal_groups(value),
    }
}

#[cfg(test)]
pub(crate) fn op(
    version: u8,
    operator: Operator,
    length_type: LengthType,
    children: Vec<Packet>,
) -> Packet {
    Packet::Operator {
        header: Header {
            version,
            type_id: operator.type_id(),
        },
        operator,
        length_type,
        children,
    }
}

#[test]
fn test_display() {
    let p = op(
        0,
        Operator::EqualTo,
        LengthType::TotalBits,
        vec![
            op(
                1,
                Operator::Sum,
                LengthType::ChildCount,
                vec![lit(2, 1), lit(3, 3)],
            ),
            op(
                4,
                Operator::Product,
                LengthType::TotalBits,
                vec![lit(5, 2), lit(6, 2)],
            ),
        ],
    );
    assert_eq!(p.to_string(), "(== (+ 1 3) (* 2 2))");
    assert_eq!(lit(6, 2021).to_string(), "2021");
}

#[test]
fn test_headers_are_in_encoding_order() {
    let p = op(
        3,
        Operator::Maximum,
        LengthType::ChildCount,
        vec![
            op(1, Operator::Minimum, LengthType::TotalBits, vec![lit(7, 9)]),
            lit(5, 1),
        ],
    );
    let versions: Vec<u8> = p.headers().map(|h| h.version).collect();
    assert_eq!(versions, vec![3, 1, 7, 5]);
    assert_eq!(
        p.headers().filter(|h| h.is_literal()).count(),
        2
    );
}

#[test]
fn test_encoded_len() {
    // "D2FE28": 6 header bits and three groups.
    assert_eq!(lit(6, 2021).encoded_len(), 21);
    // "38006F45291200": 6 + 1 + 15 + 11 + 16.
    let p = op(
        1,
        Operator::LessThan,
        LengthType::TotalBits,
        vec![lit(6, 10), lit(2, 20)],
    );
    assert_eq!(p.encoded_len(), 49);
    let p = op(
        7,
        Operator::Maximum,
        LengthType::ChildCount,
        vec![lit(2, 1), lit(4, 2), lit(1, 3)],
    );
    assert_eq!(p.encoded_len(), 6 + 1 + 11 + 3 * 11);
}
