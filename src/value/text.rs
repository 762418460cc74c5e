//! Byte and text values: raw data, NUL terminated ASCII and plain strings.
use std::fmt;

use super::types::TypeId;

/// Opaque bytes, shown as whitespace separated decimal numbers.
///
/// Used for `BYTE`, `SBYTE` and `UNDEFINED` fields as well as for any type id without a
/// dedicated representation, which is remembered and re-emitted unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataValue {
    type_id: TypeId,
    bytes: Vec<u8>,
}

impl DataValue {
    pub fn new(type_id: TypeId) -> Self {
        DataValue {
            type_id,
            bytes: Vec::new(),
        }
    }

    pub fn with_bytes(type_id: TypeId, bytes: Vec<u8>) -> Self {
        DataValue { type_id, bytes }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn is_signed(&self) -> bool {
        self.type_id == TypeId::SignedByte
    }

    pub fn read(&mut self, bytes: &[u8]) {
        self.bytes = bytes.to_vec();
    }

    pub fn read_str<'a>(&mut self, text: &'a str) -> Result<(), &'a str> {
        let signed = self.is_signed();
        let bytes = text
            .split_whitespace()
            .map(|token| {
                if signed {
                    token.parse::<i8>().map(|b| b as u8)
                } else {
                    token.parse::<u8>()
                }
                .map_err(|_| token)
            })
            .collect::<Result<Vec<u8>, _>>()?;
        self.bytes = bytes;
        Ok(())
    }

    pub fn get(&self, n: usize) -> Option<i64> {
        let b = *self.bytes.get(n)?;
        Some(if self.is_signed() {
            i64::from(b as i8)
        } else {
            i64::from(b)
        })
    }

    pub fn count(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in 0..self.bytes.len() {
            if n > 0 {
                f.write_str(" ")?;
            }
            // In range by construction of the loop.
            write!(f, "{}", self.get(n).unwrap_or_default())?;
        }
        Ok(())
    }
}

/// The text of an `ASCII` field.
///
/// The bytes are kept exactly as read, including the terminating NUL and anything after it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsciiValue {
    bytes: Vec<u8>,
}

impl AsciiValue {
    /// Build from text, appending the terminating NUL.
    pub fn new(text: &str) -> Self {
        let mut value = AsciiValue::default();
        value.read_str(text);
        value
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read(&mut self, bytes: &[u8]) {
        self.bytes = bytes.to_vec();
    }

    pub fn read_str(&mut self, text: &str) {
        self.bytes = text.as_bytes().to_vec();
        if self.bytes.last() != Some(&0) {
            self.bytes.push(0);
        }
    }

    /// The text up to the first NUL.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len());
        String::from_utf8_lossy(&self.bytes[..end])
    }

    pub fn count(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Display for AsciiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Text without terminator, e.g. an IPTC string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringValue {
    bytes: Vec<u8>,
}

impl StringValue {
    pub fn new(text: &str) -> Self {
        StringValue {
            bytes: text.as_bytes().to_vec(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read(&mut self, bytes: &[u8]) {
        self.bytes = bytes.to_vec();
    }

    pub fn read_str(&mut self, text: &str) {
        self.bytes = text.as_bytes().to_vec();
    }

    pub fn count(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_keeps_bytes_verbatim() {
        let mut v = AsciiValue::default();
        v.read(b"Canon\0\0junk");
        assert_eq!(v.to_string(), "Canon");
        assert_eq!(v.bytes(), b"Canon\0\0junk");
        assert_eq!(v.count(), 11);
    }

    #[test]
    fn ascii_text_is_terminated_once() {
        assert_eq!(AsciiValue::new("EOS R5").bytes(), b"EOS R5\0");
        assert_eq!(AsciiValue::new("EOS R5\0").bytes(), b"EOS R5\0");
        assert_eq!(AsciiValue::new("").bytes(), b"\0");
    }

    #[test]
    fn data_text_form() {
        let mut v = DataValue::new(TypeId::Undefined);
        v.read_str("48 50  51 48").unwrap();
        assert_eq!(v.bytes(), b"0230");
        assert_eq!(v.to_string(), "48 50 51 48");
        assert_eq!(v.read_str("1 256"), Err("256"));

        let mut s = DataValue::new(TypeId::SignedByte);
        s.read_str("-1 127").unwrap();
        assert_eq!(s.bytes(), &[0xff, 0x7f]);
        assert_eq!(s.to_string(), "-1 127");
        assert_eq!(s.get(0), Some(-1));
        assert_eq!(s.get(2), None);
    }

    #[test]
    fn string_has_no_terminator() {
        let v = StringValue::new("Caption");
        assert_eq!(v.bytes(), b"Caption");
        assert_eq!(v.to_string(), "Caption");
    }
}
