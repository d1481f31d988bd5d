//! BEncode Decoder
//!
//! Single-pass recursive descent parser. The cursor offset is threaded through
//! every nested call; the only lookahead is the declared length of a string.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use bytes::Bytes;

use super::error::BencodeError;
use super::value::Value;

/// Maximum nesting of lists and dictionaries accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

// == Decode ==
/// Decodes exactly one value spanning the whole input.
///
/// # Errors
/// Any grammar violation, or bytes left over after the value.
///
/// ```
/// use torrent_forge::bencode::{decode, Value};
///
/// assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
/// assert!(decode(b"i42eextra").is_err());
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let (value, consumed) = decode_prefix(data)?;

    if consumed != data.len() {
        return Err(BencodeError::TrailingData { offset: consumed });
    }

    Ok(value)
}

// == Decode Prefix ==
/// Decodes one value from the start of `data`.
///
/// Returns the value and the number of bytes it occupied; anything after that
/// is left untouched.
pub fn decode_prefix(data: &[u8]) -> Result<(Value, usize), BencodeError> {
    let mut cursor = Cursor { data, pos: 0 };
    let value = cursor.value(0)?;
    Ok((value, cursor.pos))
}

// == Cursor ==
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }

        match self.peek() {
            None => Err(BencodeError::UnexpectedEof),
            Some(b'i') => self.integer(),
            Some(b'l') => self.list(depth),
            Some(b'd') => self.dict(depth),
            Some(b'0'..=b'9') => self.bytes().map(Value::Bytes),
            Some(byte) => Err(BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }

    /// Advances past the next `delim` and returns the bytes before it.
    fn take_until(&mut self, delim: u8) -> Result<&'a [u8], BencodeError> {
        let data: &'a [u8] = self.data;
        let rest = &data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == delim)
            .ok_or(BencodeError::UnexpectedEof)?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        self.pos += 1;
        let raw = self.take_until(b'e')?;

        let text = std::str::from_utf8(raw)
            .map_err(|_| BencodeError::InvalidInteger("not ascii".into()))?;
        let digits = text.strip_prefix('-').unwrap_or(text);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BencodeError::InvalidInteger(text.into()));
        }
        if text.starts_with("-0") || (digits.starts_with('0') && digits.len() > 1) {
            return Err(BencodeError::InvalidInteger(format!("{text} (leading zero)")));
        }

        text.parse()
            .map(Value::Integer)
            .map_err(|_| BencodeError::InvalidInteger(text.into()))
    }

    fn bytes(&mut self) -> Result<Bytes, BencodeError> {
        let raw = self.take_until(b':')?;

        if raw.is_empty()
            || !raw.iter().all(u8::is_ascii_digit)
            || (raw[0] == b'0' && raw.len() > 1)
        {
            return Err(BencodeError::InvalidStringLength);
        }

        let declared: usize = std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(BencodeError::InvalidStringLength)?;

        let remaining = self.data.len() - self.pos;
        if declared > remaining {
            return Err(BencodeError::StringOverflow {
                declared,
                remaining,
            });
        }

        let bytes = Bytes::copy_from_slice(&self.data[self.pos..self.pos + declared]);
        self.pos += declared;
        Ok(bytes)
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut list = Vec::new();

        loop {
            match self.peek() {
                None => return Err(BencodeError::Unterminated("list")),
                Some(b'e') => break,
                Some(_) => list.push(self.value(depth + 1)?),
            }
        }

        self.pos += 1;
        Ok(Value::List(list))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.pos += 1;
        let mut dict = BTreeMap::new();

        loop {
            let key = match self.peek() {
                None => return Err(BencodeError::Unterminated("dictionary")),
                Some(b'e') => break,
                Some(b'0'..=b'9') => self.bytes()?,
                Some(_) => return Err(BencodeError::NonStringKey),
            };

            if matches!(self.peek(), None | Some(b'e')) {
                return Err(BencodeError::MissingValue(lossy(&key)));
            }
            let value = self.value(depth + 1)?;

            match dict.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(slot) => {
                    return Err(BencodeError::DuplicateKey(lossy(slot.key())));
                }
            }
        }

        self.pos += 1;
        Ok(Value::Dict(dict))
    }
}

fn lossy(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}
