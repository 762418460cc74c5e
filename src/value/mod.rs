//! Typed metadata values.
//!
//! A [`Value`] is one of a closed set of encodings selected by a [`TypeId`]. Every variant can
//! be read from its binary form (given a byte order) or from its text form, and written back to
//! both.
use std::fmt;

use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::tags::ByteOrder;

mod comment;
mod datetime;
mod numeric;
mod text;
mod types;
pub mod xmp;

pub use self::comment::{CharsetId, CommentValue};
pub use self::datetime::{DateValue, TimeValue};
pub use self::numeric::{Element, Numbers, Rational, URational};
pub use self::text::{AsciiValue, DataValue, StringValue};
pub use self::types::TypeId;
pub use self::xmp::{LangAltValue, XmpArrayType, XmpArrayValue, XmpStructure, XmpTextValue};

use self::Value::{
    Ascii, Comment, Data, Date, Double, Float, Ifd, LangAlt, SignedLong, SignedRational,
    SignedShort, Time, UnsignedLong, UnsignedRational, UnsignedShort, XmpArray, XmpText,
};

/// A metadata value.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// `BYTE`, `SBYTE`, `UNDEFINED` and any type without a dedicated variant.
    Data(DataValue),
    Ascii(AsciiValue),
    String(StringValue),
    UnsignedShort(Numbers<u16>),
    UnsignedLong(Numbers<u32>),
    UnsignedRational(Numbers<URational>),
    SignedShort(Numbers<i16>),
    SignedLong(Numbers<i32>),
    SignedRational(Numbers<Rational>),
    Float(Numbers<f32>),
    Double(Numbers<f64>),
    /// Offsets of directories, type `IFD`.
    Ifd(Numbers<u32>),
    Date(DateValue),
    Time(TimeValue),
    Comment(CommentValue),
    XmpText(XmpTextValue),
    XmpArray(XmpArrayValue),
    LangAlt(LangAltValue),
}

impl Value {
    /// An empty value of the given type.
    ///
    /// Type ids without a dedicated representation produce a data value which remembers the id.
    pub fn new(type_id: TypeId) -> Value {
        match type_id {
            TypeId::AsciiString => Ascii(AsciiValue::default()),
            TypeId::UnsignedShort => UnsignedShort(Numbers::default()),
            TypeId::UnsignedLong => UnsignedLong(Numbers::default()),
            TypeId::UnsignedRational => UnsignedRational(Numbers::default()),
            TypeId::SignedShort => SignedShort(Numbers::default()),
            TypeId::SignedLong => SignedLong(Numbers::default()),
            TypeId::SignedRational => SignedRational(Numbers::default()),
            TypeId::TiffFloat => Float(Numbers::default()),
            TypeId::TiffDouble => Double(Numbers::default()),
            TypeId::TiffIfd => Ifd(Numbers::default()),
            TypeId::String => Value::String(StringValue::default()),
            TypeId::Date => Date(DateValue::default()),
            TypeId::Time => Time(TimeValue::default()),
            TypeId::Comment => Comment(CommentValue::default()),
            TypeId::XmpText => XmpText(XmpTextValue::default()),
            TypeId::XmpAlt => XmpArray(XmpArrayValue::new(XmpArrayType::Alt)),
            TypeId::XmpBag => XmpArray(XmpArrayValue::new(XmpArrayType::Bag)),
            TypeId::XmpSeq => XmpArray(XmpArrayValue::new(XmpArrayType::Seq)),
            TypeId::LangAlt => LangAlt(LangAltValue::default()),
            other => Data(DataValue::new(other)),
        }
    }

    /// Decode a value of type `type_id` from its binary form.
    pub fn from_bytes(type_id: TypeId, bytes: &[u8], byte_order: ByteOrder) -> TiffResult<Value> {
        let mut value = Value::new(type_id);
        value.read(bytes, byte_order)?;
        Ok(value)
    }

    /// Decode a value of type `type_id` from its text form.
    pub fn from_text(type_id: TypeId, text: &str) -> TiffResult<Value> {
        let mut value = Value::new(type_id);
        value.read_str(text)?;
        Ok(value)
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Data(v) => v.type_id(),
            Ascii(_) => TypeId::AsciiString,
            Value::String(_) => TypeId::String,
            UnsignedShort(_) => TypeId::UnsignedShort,
            UnsignedLong(_) => TypeId::UnsignedLong,
            UnsignedRational(_) => TypeId::UnsignedRational,
            SignedShort(_) => TypeId::SignedShort,
            SignedLong(_) => TypeId::SignedLong,
            SignedRational(_) => TypeId::SignedRational,
            Float(_) => TypeId::TiffFloat,
            Double(_) => TypeId::TiffDouble,
            Ifd(_) => TypeId::TiffIfd,
            Date(_) => TypeId::Date,
            Time(_) => TypeId::Time,
            Comment(_) => TypeId::Comment,
            XmpText(_) => TypeId::XmpText,
            XmpArray(v) => match v.kind() {
                XmpArrayType::Alt => TypeId::XmpAlt,
                XmpArrayType::Bag => TypeId::XmpBag,
                XmpArrayType::Seq => TypeId::XmpSeq,
            },
            LangAlt(_) => TypeId::LangAlt,
        }
    }

    /// The byte order a numeric value or comment was decoded with.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        match self {
            UnsignedShort(v) => v.byte_order(),
            UnsignedLong(v) | Ifd(v) => v.byte_order(),
            UnsignedRational(v) => v.byte_order(),
            SignedShort(v) => v.byte_order(),
            SignedLong(v) => v.byte_order(),
            SignedRational(v) => v.byte_order(),
            Float(v) => v.byte_order(),
            Double(v) => v.byte_order(),
            Comment(v) => v.byte_order(),
            _ => None,
        }
    }

    fn invalid(&self, text: &str) -> TiffError {
        TiffError::new(ErrorCode::InvalidValue)
            .arg(self.type_id())
            .arg(text)
    }

    /// Replace the content with the binary form in `bytes`.
    pub fn read(&mut self, bytes: &[u8], byte_order: ByteOrder) -> TiffResult<()> {
        match self {
            Data(v) => v.read(bytes),
            Ascii(v) => v.read(bytes),
            Value::String(v) => v.read(bytes),
            UnsignedShort(v) => v.read(bytes, byte_order),
            UnsignedLong(v) | Ifd(v) => v.read(bytes, byte_order),
            UnsignedRational(v) => v.read(bytes, byte_order),
            SignedShort(v) => v.read(bytes, byte_order),
            SignedLong(v) => v.read(bytes, byte_order),
            SignedRational(v) => v.read(bytes, byte_order),
            Float(v) => v.read(bytes, byte_order),
            Double(v) => v.read(bytes, byte_order),
            Date(v) => v.read(bytes)?,
            Time(v) => v.read(bytes)?,
            Comment(v) => v.read(bytes, byte_order),
            XmpText(_) | XmpArray(_) | LangAlt(_) => {
                let text = std::str::from_utf8(bytes).map_err(|err| {
                    TiffError::new(ErrorCode::TextEncoding)
                        .arg(self.type_id())
                        .arg(err)
                })?;
                self.read_str(text)?;
            }
        }
        Ok(())
    }

    /// Replace the content with the text form in `text`. On error the value is unchanged.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let numbers = match self {
            Data(v) => v.read_str(text),
            Ascii(v) => {
                v.read_str(text);
                Ok(())
            }
            Value::String(v) => {
                v.read_str(text);
                Ok(())
            }
            UnsignedShort(v) => v.read_str(text),
            UnsignedLong(v) | Ifd(v) => v.read_str(text),
            UnsignedRational(v) => v.read_str(text),
            SignedShort(v) => v.read_str(text),
            SignedLong(v) => v.read_str(text),
            SignedRational(v) => v.read_str(text),
            Float(v) => v.read_str(text),
            Double(v) => v.read_str(text),
            Date(v) => return v.read_str(text),
            Time(v) => return v.read_str(text),
            Comment(v) => return v.read_str(text),
            XmpText(v) => return v.read_str(text),
            XmpArray(v) => {
                v.read_str(text);
                Ok(())
            }
            LangAlt(v) => return v.read_str(text),
        };
        numbers.map_err(|token| self.invalid(token))
    }

    /// Append the binary form to `out` and return the number of bytes written.
    ///
    /// XMP values are written in their text form.
    pub fn encode(&self, out: &mut Vec<u8>, byte_order: ByteOrder) -> usize {
        match self {
            Data(v) => extend(out, v.bytes()),
            Ascii(v) => extend(out, v.bytes()),
            Value::String(v) => extend(out, v.bytes()),
            UnsignedShort(v) => v.encode(out, byte_order),
            UnsignedLong(v) | Ifd(v) => v.encode(out, byte_order),
            UnsignedRational(v) => v.encode(out, byte_order),
            SignedShort(v) => v.encode(out, byte_order),
            SignedLong(v) => v.encode(out, byte_order),
            SignedRational(v) => v.encode(out, byte_order),
            Float(v) => v.encode(out, byte_order),
            Double(v) => v.encode(out, byte_order),
            Date(v) => v.encode(out),
            Time(v) => v.encode(out),
            Comment(v) => v.encode(out, byte_order),
            XmpText(_) | XmpArray(_) | LangAlt(_) => extend(out, self.to_string().as_bytes()),
        }
    }

    /// The binary form in a fresh buffer.
    pub fn to_bytes(&self, byte_order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        self.encode(&mut out, byte_order);
        out
    }

    /// The number of components.
    pub fn count(&self) -> usize {
        match self {
            Data(v) => v.count(),
            Ascii(v) => v.count(),
            Value::String(v) => v.count(),
            UnsignedShort(v) => v.count(),
            UnsignedLong(v) | Ifd(v) => v.count(),
            UnsignedRational(v) => v.count(),
            SignedShort(v) => v.count(),
            SignedLong(v) => v.count(),
            SignedRational(v) => v.count(),
            Float(v) => v.count(),
            Double(v) => v.count(),
            Date(_) | Time(_) => 1,
            Comment(v) => v.count(),
            XmpText(v) => v.count(),
            XmpArray(v) => v.count(),
            LangAlt(v) => v.count(),
        }
    }

    /// The size of the binary form in bytes.
    pub fn size(&self) -> usize {
        match self {
            Data(v) => v.count(),
            Ascii(v) => v.count(),
            Value::String(v) => v.count(),
            UnsignedShort(v) => v.size(),
            UnsignedLong(v) | Ifd(v) => v.size(),
            UnsignedRational(v) => v.size(),
            SignedShort(v) => v.size(),
            SignedLong(v) => v.size(),
            SignedRational(v) => v.size(),
            Float(v) => v.size(),
            Double(v) => v.size(),
            Date(_) => 8,
            Time(_) => 11,
            Comment(v) => v.count(),
            XmpText(_) | XmpArray(_) | LangAlt(_) => self.to_string().len(),
        }
    }

    fn conversion_failed(&self, n: usize, target: &str) -> TiffError {
        TiffError::new(ErrorCode::ConversionFailed)
            .arg(n)
            .arg(self.type_id())
            .arg(target)
    }

    /// Component `n` as an integer.
    ///
    /// Rationals are truncated, floats must be finite and in range. Text values convert their
    /// byte `n`, except XMP text which is parsed.
    pub fn to_i64(&self, n: usize) -> TiffResult<i64> {
        let value = match self {
            Data(v) => v.get(n),
            Ascii(v) => v.bytes().get(n).map(|&b| i64::from(b)),
            Value::String(v) => v.bytes().get(n).map(|&b| i64::from(b)),
            Comment(v) => v.bytes().get(n).map(|&b| i64::from(b)),
            UnsignedShort(v) => v.get(n).and_then(Element::to_i64),
            UnsignedLong(v) | Ifd(v) => v.get(n).and_then(Element::to_i64),
            UnsignedRational(v) => v.get(n).and_then(Element::to_i64),
            SignedShort(v) => v.get(n).and_then(Element::to_i64),
            SignedLong(v) => v.get(n).and_then(Element::to_i64),
            SignedRational(v) => v.get(n).and_then(Element::to_i64),
            Float(v) => v.get(n).and_then(Element::to_i64),
            Double(v) => v.get(n).and_then(Element::to_i64),
            Date(v) if n == 0 => return v.to_i64(),
            Time(v) if n == 0 => Some(v.to_i64()),
            Date(_) | Time(_) => None,
            XmpText(v) => v.text().trim().parse().ok(),
            XmpArray(v) => v.items().get(n).and_then(|item| item.trim().parse().ok()),
            LangAlt(v) => v
                .entries()
                .get(n)
                .and_then(|(_, text)| text.trim().parse().ok()),
        };
        value.ok_or_else(|| self.conversion_failed(n, "integer"))
    }

    /// Component `n` as a floating point number.
    pub fn to_f64(&self, n: usize) -> TiffResult<f64> {
        let value = match self {
            UnsignedShort(v) => v.get(n).and_then(Element::to_f64),
            UnsignedLong(v) | Ifd(v) => v.get(n).and_then(Element::to_f64),
            UnsignedRational(v) => v.get(n).and_then(Element::to_f64),
            SignedShort(v) => v.get(n).and_then(Element::to_f64),
            SignedLong(v) => v.get(n).and_then(Element::to_f64),
            SignedRational(v) => v.get(n).and_then(Element::to_f64),
            Float(v) => v.get(n).and_then(Element::to_f64),
            Double(v) => v.get(n).and_then(Element::to_f64),
            XmpText(v) => v.text().trim().parse().ok(),
            // Integers up to 2^53 are exact.
            _ => self.to_i64(n).ok().map(|i| i as f64),
        };
        value.ok_or_else(|| self.conversion_failed(n, "float"))
    }

    /// Component `n` as a signed rational.
    pub fn to_rational(&self, n: usize) -> TiffResult<Rational> {
        let value = match self {
            UnsignedShort(v) => v.get(n).and_then(Element::to_rational),
            UnsignedLong(v) | Ifd(v) => v.get(n).and_then(Element::to_rational),
            UnsignedRational(v) => v.get(n).and_then(Element::to_rational),
            SignedShort(v) => v.get(n).and_then(Element::to_rational),
            SignedLong(v) => v.get(n).and_then(Element::to_rational),
            SignedRational(v) => v.get(n).and_then(Element::to_rational),
            Float(v) => v.get(n).and_then(Element::to_rational),
            Double(v) => v.get(n).and_then(Element::to_rational),
            XmpText(v) => {
                let text = v.text().trim();
                <Rational as Element>::parse(text)
                    .or_else(|| text.parse().ok().and_then(numeric::float_to_rational))
            }
            _ => self
                .to_i64(n)
                .ok()
                .and_then(|i| i32::try_from(i).ok())
                .map(|i| (i, 1)),
        };
        value.ok_or_else(|| self.conversion_failed(n, "rational"))
    }

    /// Decode the binary form of this value as another type.
    ///
    /// Used when the type of an entry is known to differ from the field type on file, e.g. an
    /// `UNDEFINED` user comment which is a comment with a character set.
    pub fn reinterpret(&self, type_id: TypeId, byte_order: ByteOrder) -> TiffResult<Value> {
        if type_id == self.type_id() {
            return Ok(self.clone());
        }
        let order = self.byte_order().unwrap_or(byte_order);
        Value::from_bytes(type_id, &self.to_bytes(order), order)
    }
}

fn extend(out: &mut Vec<u8>, bytes: &[u8]) -> usize {
    out.extend_from_slice(bytes);
    bytes.len()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data(v) => fmt::Display::fmt(v, f),
            Ascii(v) => fmt::Display::fmt(v, f),
            Value::String(v) => fmt::Display::fmt(v, f),
            UnsignedShort(v) => fmt::Display::fmt(v, f),
            UnsignedLong(v) | Ifd(v) => fmt::Display::fmt(v, f),
            UnsignedRational(v) => fmt::Display::fmt(v, f),
            SignedShort(v) => fmt::Display::fmt(v, f),
            SignedLong(v) => fmt::Display::fmt(v, f),
            SignedRational(v) => fmt::Display::fmt(v, f),
            Float(v) => fmt::Display::fmt(v, f),
            Double(v) => fmt::Display::fmt(v, f),
            Date(v) => fmt::Display::fmt(v, f),
            Time(v) => fmt::Display::fmt(v, f),
            Comment(v) => fmt::Display::fmt(v, f),
            XmpText(v) => fmt::Display::fmt(v, f),
            XmpArray(v) => fmt::Display::fmt(v, f),
            LangAlt(v) => fmt::Display::fmt(v, f),
        }
    }
}
