//! BEncode Error Module
//!
//! Everything that can go wrong while parsing BEncoded input. A decode error is
//! always fatal for the whole input.

use thiserror::Error;

// == Bencode Error Enum ==
/// Input bytes violate the BEncode grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BencodeError {
    /// Input ended in the middle of a value
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Integer with leading zeros, `-0`, a bad sign or out of i64 range
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// String length prefix is not a canonical decimal number
    #[error("invalid string length")]
    InvalidStringLength,

    /// String declares more bytes than remain in the input
    #[error("string declares {declared} bytes but only {remaining} remain")]
    StringOverflow { declared: usize, remaining: usize },

    /// List or dictionary reached end of input without its `e`
    #[error("unterminated {0}")]
    Unterminated(&'static str),

    /// Dictionary key is not followed by a value
    #[error("missing value for key {0:?}")]
    MissingValue(String),

    /// Dictionary key is not a byte string
    #[error("dictionary key is not a byte string")]
    NonStringKey,

    /// Same key appears twice in one dictionary
    #[error("duplicate dictionary key {0:?}")]
    DuplicateKey(String),

    /// Byte that cannot start a value
    #[error("unexpected byte 0x{byte:02x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    /// Extra bytes after a complete top-level value
    #[error("trailing data at offset {offset}")]
    TrailingData { offset: usize },

    /// Recursion limit exceeded
    #[error("nesting too deep")]
    NestingTooDeep,
}
