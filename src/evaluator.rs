use std::cmp::{max, min};

use crate::packet::{Operator, Packet};

fn comparison(operator: Operator, a: u64, b: u64) -> u64 {
    let holds = match operator {
        Operator::GreaterThan => a > b,
        Operator::LessThan => a < b,
        Operator::EqualTo => a == b,
        _ => unreachable!("{} is not a comparison", operator),
    };
    u64::from(holds)
}

/// Computes the value of the expression `packet` represents.
/// Sums and products wrap on overflow; see `checked_evaluate`.
///
/// # Panics
///
/// Panics on trees the decoder would have rejected: an operator with
/// no children, or a comparison without exactly two.
pub fn evaluate(packet: &Packet) -> u64 {
    match packet {
        Packet::Literal { value, .. } => *value,
        Packet::Operator {
            operator, children, ..
        } => {
            let mut values = children.iter().map(evaluate);
            let first = match values.next() {
                Some(v) => v,
                None => {
                    panic!("operator {} has no operands", operator);
                }
            };
            match operator {
                Operator::Sum => values.fold(first, |acc, v| acc.wrapping_add(v)),
                Operator::Product => values.fold(first, |acc, v| acc.wrapping_mul(v)),
                Operator::Minimum => values.fold(first, min),
                Operator::Maximum => values.fold(first, max),
                Operator::GreaterThan | Operator::LessThan | Operator::EqualTo => {
                    match (values.next(), values.next()) {
                        (Some(second), None) => comparison(*operator, first, second),
                        _ => {
                            panic!(
                                "binary operator {} needs exactly 2 operands, found {}",
                                operator,
                                children.len()
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Like `evaluate`, but returns `None` if a sum or product overflows
/// 64 bits, or if the tree breaks an arity rule.
pub fn checked_evaluate(packet: &Packet) -> Option<u64> {
    match packet {
        Packet::Literal { value, .. } => Some(*value),
        Packet::Operator {
            operator, children, ..
        } => {
            let values: Vec<u64> = children
                .iter()
                .map(checked_evaluate)
                .collect::<Option<Vec<u64>>>()?;
            let (first, rest) = values.split_first()?;
            match operator {
                Operator::Sum => rest.iter().try_fold(*first, |acc, v| acc.checked_add(*v)),
                Operator::Product => rest.iter().try_fold(*first, |acc, v| acc.checked_mul(*v)),
                Operator::Minimum => Some(rest.iter().fold(*first, |acc, v| min(acc, *v))),
                Operator::Maximum => Some(rest.iter().fold(*first, |acc, v| max(acc, *v))),
                Operator::GreaterThan | Operator::LessThan | Operator::EqualTo => match rest {
                    [second] => Some(comparison(*operator, *first, *second)),
                    _ => None,
                },
            }
        }
    }
}

/// Adds up the version of every packet in the tree.
pub fn sum_versions(packet: &Packet) -> u64 {
    let me: u64 = packet.version().into();
    let them: u64 = packet.children().iter().map(sum_versions).sum();
    me + them
}

pub fn sum_versions_all(packets: &[Packet]) -> u64 {
    packets.iter().map(sum_versions).sum()
}

#[cfg(test)]
use crate::decoder::decode_single;
#[cfg(test)]
use crate::hex::bits_from_hex;
#[cfg(test)]
use crate::packet::{lit, op, LengthType};

#[cfg(test)]
fn decode_hex(s: &str) -> Packet {
    let bits = bits_from_hex(s).expect("valid test data");
    match decode_single(&bits) {
        Ok(p) => p,
        Err(e) => {
            panic!("failed to decode {}: {}", s, e);
        }
    }
}

#[test]
fn test_sum_versions() {
    for (hex, expected) in [
        ("D2FE28", 6),
        ("38006F45291200", 9),
        ("EE00D40C823060", 14),
        ("8A004A801A8002F478", 16),
        ("620080001611562C8802118E34", 12),
        ("C0015000016115A2E0802F182340", 23),
        ("A0016C880162017C3686B18A3D4780", 31),
    ] {
        let packet = decode_hex(hex);
        assert_eq!(sum_versions(&packet), expected, "version sum of {}", hex);
        let from_headers: u64 = packet.headers().map(|h| u64::from(h.version)).sum();
        assert_eq!(from_headers, expected);
    }
}

#[test]
fn test_sum_versions_is_additive() {
    let packet = decode_hex("620080001611562C8802118E34");
    let them: u64 = packet.children().iter().map(sum_versions).sum();
    assert_eq!(sum_versions(&packet), u64::from(packet.version()) + them);
    assert_eq!(sum_versions_all(&[packet.clone(), packet]), 24);
    assert_eq!(sum_versions_all(&[]), 0);
}

#[test]
fn test_evaluate() {
    for (hex, expected) in [
        ("D2FE28", 2021),
        ("38006F45291200", 1),
        ("C200B40A82", 3),
        ("04005AC33890", 54),
        ("880086C3E88112", 7),
        ("CE00C43D881120", 9),
        ("D8005AC2A8F0", 1),
        ("F600BC2D8F", 0),
        ("9C005AC2F8F0", 0),
        ("9C0141080250320F1802104A08", 1),
    ] {
        let packet = decode_hex(hex);
        assert_eq!(evaluate(&packet), expected, "value of {}", hex);
        assert_eq!(evaluate(&packet), expected, "second evaluation of {}", hex);
        assert_eq!(checked_evaluate(&packet), Some(expected));
    }
}

#[test]
fn test_overflow() {
    let big = op(
        0,
        Operator::Product,
        LengthType::ChildCount,
        vec![lit(0, 1 << 40), lit(0, 1 << 40)],
    );
    assert_eq!(checked_evaluate(&big), None);
    assert_eq!(evaluate(&big), 0);

    let sum = op(
        0,
        Operator::Sum,
        LengthType::ChildCount,
        vec![lit(0, u64::MAX), lit(0, 2)],
    );
    assert_eq!(checked_evaluate(&sum), None);
    assert_eq!(evaluate(&sum), 1);

    // The comparison only sees the wrapped value.
    let cmp = op(
        0,
        Operator::EqualTo,
        LengthType::ChildCount,
        vec![sum, lit(0, 1)],
    );
    assert_eq!(evaluate(&cmp), 1);
    assert_eq!(checked_evaluate(&cmp), None);
}

#[test]
fn test_checked_evaluate_rejects_bad_arity() {
    let p = op(
        0,
        Operator::GreaterThan,
        LengthType::ChildCount,
        vec![lit(0, 3), lit(0, 2), lit(0, 1)],
    );
    assert_eq!(checked_evaluate(&p), None);
    let p = op(0, Operator::Minimum, LengthType::ChildCount, Vec::new());
    assert_eq!(checked_evaluate(&p), None);
}

#[test]
#[should_panic(expected = "needs exactly 2 operands")]
fn test_evaluate_panics_on_bad_arity() {
    let p = op(
        0,
        Operator::LessThan,
        LengthType::TotalBits,
        vec![lit(0, 3)],
    );
    evaluate(&p);
}
