//! Decoder and evaluator for the nested binary packet format of
//! Advent of Code 2021, day 16.
//!
//! Hex text becomes nibbles (`hex`), nibbles become bits (`bits`),
//! bits become a tree of packets (`decoder`), and the tree becomes a
//! number (`evaluator`).

pub mod bits;
pub mod decoder;
pub mod error;
pub mod evaluator;
pub mod hex;
pub mod packet;

pub use decoder::{decode_all, decode_packet, decode_single, Decoder};
pub use error::FormatError;
pub use evaluator::{checked_evaluate, evaluate, sum_versions, sum_versions_all};
pub use packet::{Header, LengthType, Operator, Packet};
