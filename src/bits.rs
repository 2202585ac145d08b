//! The bit source (nibbles to bits) and the forward-only cursor the
//! decoder reads from.

use crate::error::FormatError;

/// Renders bits as a string of `0` and `1` characters.
pub fn binstring(bits: &[bool]) -> String {
    bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
}

/// Builds a bit vector from a string like `"110 100"`.  Spaces are
/// ignored so that test data can be grouped by field.
#[cfg(test)]
pub(crate) fn from_binstring(s: &str) -> Vec<bool> {
    s.chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| match ch {
            '0' => false,
            '1' => true,
            _ => panic!("not a binary digit: '{}'", ch),
        })
        .collect()
}

/// Expands a single nibble into its 4 bits, most significant first.
pub fn to_bits(nibble: u8) -> Result<[bool; 4], FormatError> {
    if nibble > 0xF {
        return Err(FormatError::InvalidNibble(nibble));
    }
    let mut result = [false; 4];
    for (i, bitpos) in (0..4).rev().enumerate() {
        result[i] = (nibble >> bitpos) & 1 != 0;
    }
    Ok(result)
}

#[test]
fn test_to_bits() {
    assert_eq!(to_bits(0x0), Ok([false, false, false, false]));
    assert_eq!(to_bits(0x5), Ok([false, true, false, true]));
    assert_eq!(to_bits(0xF), Ok([true, true, true, true]));
    assert_eq!(to_bits(0x10), Err(FormatError::InvalidNibble(0x10)));
}

/// Lazily yields the bits of a sequence of nibbles, 4 per nibble, in
/// input order.
#[derive(Debug, Clone)]
pub struct NibbleBits<I> {
    nibbles: I,
    current: [bool; 4],
    taken: usize,
}

impl<I> Iterator for NibbleBits<I>
where
    I: Iterator<Item = u8>,
{
    type Item = Result<bool, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.taken == self.current.len() {
            match to_bits(self.nibbles.next()?) {
                Ok(bits) => {
                    self.current = bits;
                    self.taken = 0;
                }
                Err(e) => {
                    return Some(Err(e));
                }
            }
        }
        let bit = self.current[self.taken];
        self.taken += 1;
        Some(Ok(bit))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.current.len() - self.taken;
        let (lower, upper) = self.nibbles.size_hint();
        (
            buffered + lower.saturating_mul(4),
            upper.and_then(|n| n.checked_mul(4)?.checked_add(buffered)),
        )
    }
}

pub fn nibble_bits<I>(nibbles: I) -> NibbleBits<I::IntoIter>
where
    I: IntoIterator<Item = u8>,
{
    NibbleBits {
        nibbles: nibbles.into_iter(),
        current: [false; 4],
        taken: 4,
    }
}

/// Collects the bits of `nibbles` into a buffer the decoder can read.
pub fn bits_from_nibbles<I>(nibbles: I) -> Result<Vec<bool>, FormatError>
where
    I: IntoIterator<Item = u8>,
{
    nibble_bits(nibbles).collect()
}

#[test]
fn test_bits_from_nibbles() {
    assert_eq!(
        bits_from_nibbles([0xF, 0x0]),
        Ok(vec![true, true, true, true, false, false, false, false])
    );
    assert_eq!(
        bits_from_nibbles(vec![0x5, 0x2]),
        Ok(from_binstring("0101 0010"))
    );
    assert_eq!(bits_from_nibbles(Vec::new()), Ok(Vec::new()));
    assert_eq!(
        bits_from_nibbles([0x1, 0x2F, 0x3]),
        Err(FormatError::InvalidNibble(0x2F))
    );
}

#[test]
fn test_nibble_bits_is_lazy() {
    // Only the first nibble should be looked at.
    let mut bits = nibble_bits([0x8, 0xFF]);
    assert_eq!(bits.next(), Some(Ok(true)));
    assert_eq!(bits.next(), Some(Ok(false)));
    assert_eq!(bits.size_hint(), (6, Some(6)));
    assert_eq!(bits.next(), Some(Ok(false)));
    assert_eq!(bits.next(), Some(Ok(false)));
    assert_eq!(bits.next(), Some(Err(FormatError::InvalidNibble(0xFF))));
    assert_eq!(bits.next(), None);
}

/// A forward-only read position in a buffer of bits.
///
/// The cursor never rewinds; every successful read advances it by
/// exactly the number of bits read, so `position()` is also the
/// number of bits consumed so far.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    bits: &'a [bool],
    pos: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(bits: &'a [bool]) -> BitCursor<'a> {
        BitCursor { bits, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// True when nothing but zero bits is left (including when
    /// nothing at all is left).
    pub fn only_padding_remains(&self) -> bool {
        !self.bits[self.pos..].iter().any(|b| *b)
    }

    pub fn unread(&self) -> &'a [bool] {
        &self.bits[self.pos..]
    }

    pub fn read_bit(&mut self, field: &'static str) -> Result<bool, FormatError> {
        match self.bits.get(self.pos) {
            Some(bit) => {
                self.pos += 1;
                Ok(*bit)
            }
            None => Err(FormatError::Exhausted {
                field,
                offset: self.pos,
                needed: 1,
                available: 0,
            }),
        }
    }

    /// Reads `nbits` bits (at most 64) as an unsigned big-endian
    /// number.  On failure the cursor does not move.
    pub fn read_number(&mut self, field: &'static str, nbits: usize) -> Result<u64, FormatError> {
        debug_assert!(nbits <= 64);
        let available = self.remaining();
        if available < nbits {
            return Err(FormatError::Exhausted {
                field,
                offset: self.pos,
                needed: nbits,
                available,
            });
        }
        let result = self.bits[self.pos..self.pos + nbits]
            .iter()
            .fold(0_u64, |acc, bit| (acc << 1) | u64::from(*bit));
        self.pos += nbits;
        Ok(result)
    }
}

#[test]
fn test_read_number() {
    let bits = from_binstring("101 100 0");
    let mut cursor = BitCursor::new(&bits);
    assert_eq!(cursor.read_number("version", 3), Ok(5));
    assert_eq!(cursor.position(), 3);
    assert_eq!(cursor.remaining(), 4);
    assert_eq!(cursor.read_number("type id", 3), Ok(4));
    assert_eq!(
        cursor.read_number("group", 5),
        Err(FormatError::Exhausted {
            field: "group",
            offset: 6,
            needed: 5,
            available: 1,
        })
    );
    assert_eq!(cursor.position(), 6);
    assert!(cursor.only_padding_remains());
    assert_eq!(cursor.read_bit("pad"), Ok(false));
    assert!(cursor.is_exhausted());
    assert!(matches!(
        cursor.read_bit("pad"),
        Err(FormatError::Exhausted { offset: 7, .. })
    ));
}

#[test]
fn test_read_number_zero_width() {
    let bits = from_binstring("1");
    let mut cursor = BitCursor::new(&bits);
    assert_eq!(cursor.read_number("nothing", 0), Ok(0));
    assert_eq!(cursor.position(), 0);
    assert!(!cursor.only_padding_remains());
    assert_eq!(binstring(cursor.unread()), "1");
}
