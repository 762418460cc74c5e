//! Exif comments: an 8 byte character set code followed by the text.
use std::fmt;

use encoding::all::{UTF_16BE, UTF_16LE};
use encoding::{DecoderTrap, EncoderTrap, Encoding};

use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::tags::ByteOrder;

const CODE_LEN: usize = 8;

/// Character set of a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharsetId {
    Ascii,
    Jis,
    Unicode,
    Undefined,
}

struct CharsetInfo {
    id: CharsetId,
    name: &'static str,
    code: &'static [u8; CODE_LEN],
}

static CHARSETS: &[CharsetInfo] = &[
    CharsetInfo {
        id: CharsetId::Ascii,
        name: "Ascii",
        code: b"ASCII\0\0\0",
    },
    CharsetInfo {
        id: CharsetId::Jis,
        name: "Jis",
        code: b"JIS\0\0\0\0\0",
    },
    CharsetInfo {
        id: CharsetId::Unicode,
        name: "Unicode",
        code: b"UNICODE\0",
    },
    CharsetInfo {
        id: CharsetId::Undefined,
        name: "Undefined",
        code: b"\0\0\0\0\0\0\0\0",
    },
];

impl CharsetId {
    fn info(self) -> &'static CharsetInfo {
        // Every id has exactly one row.
        match self {
            CharsetId::Ascii => &CHARSETS[0],
            CharsetId::Jis => &CHARSETS[1],
            CharsetId::Unicode => &CHARSETS[2],
            CharsetId::Undefined => &CHARSETS[3],
        }
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// The 8 byte code preceding the comment text.
    pub fn code(self) -> &'static [u8; CODE_LEN] {
        self.info().code
    }

    pub fn from_name(name: &str) -> Option<CharsetId> {
        CHARSETS.iter().find(|c| c.name == name).map(|c| c.id)
    }

    /// Identify the character set of a code. Unrecognized codes are `Undefined`.
    pub fn from_code(code: &[u8]) -> CharsetId {
        CHARSETS
            .iter()
            .find(|c| code.starts_with(c.code))
            .map_or(CharsetId::Undefined, |c| c.id)
    }
}

impl fmt::Display for CharsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An Exif `UserComment` style value.
///
/// The character set code and the payload are kept as raw bytes so that a decoded comment is
/// re-emitted exactly. Unicode payloads are UTF-16 in the byte order the value was decoded with
/// (little endian for comments built from text) unless the payload starts with a BOM.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentValue {
    bytes: Vec<u8>,
    byte_order: Option<ByteOrder>,
}

impl CommentValue {
    /// Build a comment from text in the `charset=Name text` form.
    pub fn new(text: &str) -> TiffResult<Self> {
        let mut value = CommentValue::default();
        value.read_str(text)?;
        Ok(value)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn charset(&self) -> CharsetId {
        if self.bytes.len() < CODE_LEN {
            return CharsetId::Undefined;
        }
        CharsetId::from_code(&self.bytes[..CODE_LEN])
    }

    fn payload(&self) -> &[u8] {
        self.bytes.get(CODE_LEN..).unwrap_or_default()
    }

    pub fn read(&mut self, bytes: &[u8], byte_order: ByteOrder) {
        self.bytes = bytes.to_vec();
        self.byte_order = Some(byte_order);
    }

    /// Read `charset=Name text`; the name may be quoted. Text without the prefix has an
    /// undefined character set.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let (charset, comment) = match text.strip_prefix("charset=") {
            Some(rest) => {
                let (name, comment) = rest.split_once(' ').unwrap_or((rest, ""));
                let name = name.trim_matches('"');
                let charset = CharsetId::from_name(name)
                    .ok_or_else(|| TiffError::new(ErrorCode::InvalidCharset).arg(name))?;
                (charset, comment)
            }
            None => (CharsetId::Undefined, text),
        };

        let mut bytes = charset.code().to_vec();
        match charset {
            CharsetId::Unicode => {
                let payload = UTF_16LE
                    .encode(comment, EncoderTrap::Strict)
                    .map_err(text_error)?;
                bytes.extend_from_slice(&payload);
            }
            CharsetId::Ascii if !comment.is_ascii() => {
                return Err(text_error("non-ASCII characters in an ASCII comment"));
            }
            _ => bytes.extend_from_slice(comment.as_bytes()),
        }

        self.bytes = bytes;
        self.byte_order = None;
        Ok(())
    }

    fn payload_order(&self) -> (ByteOrder, &[u8]) {
        let payload = self.payload();
        match payload {
            [0xff, 0xfe, rest @ ..] => (ByteOrder::LittleEndian, rest),
            [0xfe, 0xff, rest @ ..] => (ByteOrder::BigEndian, rest),
            _ => (
                self.byte_order.unwrap_or(ByteOrder::LittleEndian),
                payload,
            ),
        }
    }

    fn decode(&self, trap: DecoderTrap) -> TiffResult<String> {
        let text = match self.charset() {
            CharsetId::Unicode => {
                let (order, payload) = self.payload_order();
                let decoded = match order {
                    ByteOrder::LittleEndian => UTF_16LE.decode(payload, trap),
                    ByteOrder::BigEndian => UTF_16BE.decode(payload, trap),
                };
                decoded.map_err(text_error)?
            }
            _ => String::from_utf8_lossy(self.payload()).into_owned(),
        };
        Ok(text.trim_end_matches('\0').to_string())
    }

    /// The comment text without the character set.
    pub fn text(&self) -> TiffResult<String> {
        self.decode(DecoderTrap::Strict)
    }

    /// Write the code and the payload. A Unicode payload without BOM is converted to
    /// `byte_order`.
    pub fn encode(&self, out: &mut Vec<u8>, byte_order: ByteOrder) -> usize {
        let start = out.len();
        let source = self.byte_order.unwrap_or(ByteOrder::LittleEndian);
        let has_bom = matches!(self.payload(), [0xff, 0xfe, ..] | [0xfe, 0xff, ..]);

        if self.charset() == CharsetId::Unicode && !has_bom && source != byte_order {
            out.extend_from_slice(&self.bytes[..CODE_LEN]);
            let mut units = self.payload().chunks_exact(2);
            for unit in &mut units {
                out.extend_from_slice(&[unit[1], unit[0]]);
            }
            out.extend_from_slice(units.remainder());
        } else {
            out.extend_from_slice(&self.bytes);
        }

        out.len() - start
    }

    pub fn count(&self) -> usize {
        self.bytes.len()
    }
}

fn text_error(err: impl fmt::Display) -> TiffError {
    TiffError::new(ErrorCode::TextEncoding)
        .arg("Comment")
        .arg(err)
}

impl fmt::Display for CommentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let charset = self.charset();
        if charset != CharsetId::Undefined {
            write!(f, "charset={} ", charset)?;
        }
        // Replacement never fails.
        f.write_str(&self.decode(DecoderTrap::Replace).unwrap_or_default())
    }
}
