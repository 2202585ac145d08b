use thiserror::Error;

use crate::packet::Operator;

/// Everything that can go wrong turning nibbles into packets.
///
/// Any of these aborts the whole decode call; no partial packet is
/// ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("nibble value {0} does not fit in 4 bits")]
    InvalidNibble(u8),

    #[error("not a hex digit: {digit:?} at position {position}")]
    InvalidHexDigit { digit: char, position: usize },

    #[error(
        "not enough bits remain for {field} at bit offset {offset}: needed {needed}, we have only {available}"
    )]
    Exhausted {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("literal value starting at bit offset {offset} does not fit in 64 bits")]
    LiteralOverflow { offset: usize },

    #[error(
        "subpacket length exceeded at bit offset {offset}: {declared} bits were declared but the subpackets used {consumed}"
    )]
    SubpacketLengthExceeded {
        offset: usize,
        declared: usize,
        consumed: usize,
    },

    #[error("'{0}' is not a valid operator type id")]
    UnknownTypeId(u8),

    #[error("wrong arity for binary operator {operator}: it needs exactly 2 operands but {found} were found")]
    WrongArity { operator: Operator, found: usize },

    #[error("operator {operator} at bit offset {offset} has no operands")]
    NoOperands { operator: Operator, offset: usize },

    #[error("packets are nested more than {limit} levels deep")]
    TooDeep { limit: usize },

    #[error("expected exactly one top-level packet, found {0}")]
    TopLevelCount(usize),
}

#[test]
fn test_error_messages() {
    assert_eq!(
        FormatError::InvalidNibble(16).to_string(),
        "nibble value 16 does not fit in 4 bits"
    );
    assert_eq!(
        FormatError::WrongArity {
            operator: Operator::LessThan,
            found: 3
        }
        .to_string(),
        "wrong arity for binary operator <: it needs exactly 2 operands but 3 were found"
    );
    assert_eq!(
        FormatError::Exhausted {
            field: "version",
            offset: 4,
            needed: 3,
            available: 1,
        }
        .to_string(),
        "not enough bits remain for version at bit offset 4: needed 3, we have only 1"
    );
}
