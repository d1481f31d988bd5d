//! BEncode Encoder
//!
//! Canonical serialization: minimal integers, byte-counted string lengths and
//! dictionary keys in raw-byte order.

use super::value::Value;

// == Encode ==
/// Encodes a value to a new byte vector.
///
/// ```
/// use torrent_forge::bencode::{encode, Value};
///
/// assert_eq!(encode(&Value::Integer(42)), b"i42e");
/// assert_eq!(encode(&Value::string("hello")), b"5:hello");
/// assert_eq!(
///     encode(&Value::List(vec![Value::Integer(1), Value::string("two")])),
///     b"li1e3:twoe"
/// );
/// ```
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf);
    buf
}

// == Encode Into ==
/// Appends the encoding of `value` to `buf`.
pub fn encode_into(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            buf.push(b'i');
            buf.extend_from_slice(i.to_string().as_bytes());
            buf.push(b'e');
        }
        Value::Bytes(b) => write_bytes(b, buf),
        Value::List(l) => {
            buf.push(b'l');
            for item in l {
                encode_into(item, buf);
            }
            buf.push(b'e');
        }
        Value::Dict(d) => {
            // BTreeMap<Bytes, _> iterates in raw-byte key order
            buf.push(b'd');
            for (key, val) in d {
                write_bytes(key, buf);
                encode_into(val, buf);
            }
            buf.push(b'e');
        }
    }
}

fn write_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(bytes.len().to_string().as_bytes());
    buf.push(b':');
    buf.extend_from_slice(bytes);
}
