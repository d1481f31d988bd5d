//! BEncode Module
//!
//! Encoding and decoding of the BitTorrent wire format.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` |
//! | Byte string | `<length>:<data>` | `4:spam` |
//! | List | `l<items>e` | `l4:spami42ee` |
//! | Dictionary | `d<key><value>...e` | `d3:cow3:mooe` |
//!
//! Dictionary keys are always written in raw-byte order, so two dictionaries
//! holding the same pairs encode to the same bytes.

mod decode;
mod encode;
mod error;
mod value;


// Re-export public types
pub use decode::{decode, decode_prefix, MAX_DEPTH};
pub use encode::{encode, encode_into};
pub use error::BencodeError;
pub use value::Value;
