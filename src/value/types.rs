//! The closed table of value type identifiers

use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::tags::tags;

tags! {
/// Identifies the encoding of a value.
///
/// The ids `1..=13` are the field types of a TIFF directory entry (a 2 byte field). The ids
/// from `0x10000` are private to this library and describe values which only exist in memory
/// or in other metadata containers (IPTC dates and times, XMP properties).
pub enum TypeId(u32) unknown(
    /// A type id that is not part of the table, e.g. a vendor specific TIFF field type
    unknown
) {
    /// 8-bit unsigned integer
    UnsignedByte = 1,
    /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
    AsciiString = 2,
    /// 16-bit unsigned integer
    UnsignedShort = 3,
    /// 32-bit unsigned integer
    UnsignedLong = 4,
    /// Fraction stored as two 32-bit unsigned integers
    UnsignedRational = 5,
    /// 8-bit signed integer
    SignedByte = 6,
    /// 8-bit byte that may contain anything, depending on the field
    Undefined = 7,
    /// 16-bit signed integer
    SignedShort = 8,
    /// 32-bit signed integer
    SignedLong = 9,
    /// Fraction stored as two 32-bit signed integers
    SignedRational = 10,
    /// 32-bit IEEE floating point
    TiffFloat = 11,
    /// 64-bit IEEE floating point
    TiffDouble = 12,
    /// 32-bit unsigned integer (offset)
    TiffIfd = 13,
    /// Text without terminating NUL.
    String = 0x10000,
    /// IPTC date, `YYYYMMDD`.
    Date = 0x10001,
    /// IPTC time, `HHMMSS±HHMM`.
    Time = 0x10002,
    /// Exif comment with a character set prefix.
    Comment = 0x10003,
    /// An in-memory directory.
    Directory = 0x10004,
    XmpText = 0x10005,
    XmpAlt = 0x10006,
    XmpBag = 0x10007,
    XmpSeq = 0x10008,
    LangAlt = 0x10009,
    Invalid = 0x1fffe,
}
}

struct TypeInfo {
    id: TypeId,
    name: &'static str,
    size: u32,
}

const fn info(id: TypeId, name: &'static str, size: u32) -> TypeInfo {
    TypeInfo { id, name, size }
}

static TYPE_INFO: &[TypeInfo] = &[
    info(TypeId::Invalid, "Invalid", 0),
    info(TypeId::UnsignedByte, "Byte", 1),
    info(TypeId::AsciiString, "Ascii", 1),
    info(TypeId::UnsignedShort, "Short", 2),
    info(TypeId::UnsignedLong, "Long", 4),
    info(TypeId::UnsignedRational, "Rational", 8),
    info(TypeId::SignedByte, "SByte", 1),
    info(TypeId::Undefined, "Undefined", 1),
    info(TypeId::SignedShort, "SShort", 2),
    info(TypeId::SignedLong, "SLong", 4),
    info(TypeId::SignedRational, "SRational", 8),
    info(TypeId::TiffFloat, "Float", 4),
    info(TypeId::TiffDouble, "Double", 8),
    info(TypeId::TiffIfd, "Ifd", 4),
    info(TypeId::String, "String", 1),
    info(TypeId::Date, "Date", 8),
    info(TypeId::Time, "Time", 11),
    info(TypeId::Comment, "Comment", 1),
    info(TypeId::Directory, "Directory", 1),
    info(TypeId::XmpText, "XmpText", 1),
    info(TypeId::XmpAlt, "XmpAlt", 1),
    info(TypeId::XmpBag, "XmpBag", 1),
    info(TypeId::XmpSeq, "XmpSeq", 1),
    info(TypeId::LangAlt, "LangAlt", 1),
];

impl TypeId {
    fn info(self) -> Option<&'static TypeInfo> {
        TYPE_INFO.iter().find(|i| i.id == self)
    }

    /// The type id of a TIFF directory entry type field.
    pub fn from_tiff(ty: u16) -> TypeId {
        TypeId::from_raw_exhaustive(u32::from(ty))
    }

    /// The value of the type field in a TIFF directory entry, if this id can be stored there.
    pub fn to_tiff(self) -> Option<u16> {
        match self {
            TypeId::Unknown(n) => u16::try_from(n).ok(),
            other if other.is_tiff() => u16::try_from(other.to_raw()).ok(),
            _ => None,
        }
    }

    /// Whether this is one of the field types defined by TIFF 6.0.
    pub fn is_tiff(self) -> bool {
        (1..=13).contains(&self.to_raw())
    }

    /// The human readable name, e.g. `"Short"`. Unknown ids have no name.
    pub fn name(self) -> Option<&'static str> {
        self.info().map(|i| i.name)
    }

    /// Look up a type id by its name.
    pub fn from_name(name: &str) -> TiffResult<TypeId> {
        TYPE_INFO
            .iter()
            .find(|i| i.id != TypeId::Invalid && i.name == name)
            .map(|i| i.id)
            .ok_or_else(|| TiffError::new(ErrorCode::InvalidTypeName).arg(name))
    }

    /// The size of one element of this type in bytes, `0` for unknown ids.
    pub fn size(self) -> u32 {
        self.info().map_or(0, |i| i.size)
    }

    /// The byte size of `count` elements, `None` if it overflows.
    pub fn value_bytes(self, count: u32) -> Option<u64> {
        u64::from(count).checked_mul(u64::from(self.size()))
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Type({:#x})", self.to_raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TypeId;

    #[test]
    fn tiff_types_have_fixed_sizes() {
        let sizes: Vec<u32> = (1..=13).map(|t| TypeId::from_tiff(t).size()).collect();
        assert_eq!(sizes, [1, 1, 2, 4, 8, 1, 1, 2, 4, 8, 4, 8, 4]);
    }

    #[test]
    fn names_round_trip() {
        for id in [
            TypeId::UnsignedShort,
            TypeId::SignedRational,
            TypeId::Comment,
            TypeId::LangAlt,
        ] {
            let name = id.name().expect("known type has a name");
            assert_eq!(TypeId::from_name(name).unwrap(), id);
        }
        assert!(TypeId::from_name("Nibble").is_err());
        assert!(TypeId::from_name("Invalid").is_err());
    }

    #[test]
    fn unknown_ids_are_preserved() {
        let id = TypeId::from_tiff(0x00ff);
        assert_eq!(id, TypeId::Unknown(0xff));
        assert_eq!(id.size(), 0);
        assert_eq!(id.to_tiff(), Some(0xff));
        assert_eq!(TypeId::Date.to_tiff(), None);
        assert_eq!(id.to_string(), "Type(0xff)");
    }

    #[test]
    fn value_bytes_detects_overflow() {
        assert_eq!(TypeId::UnsignedRational.value_bytes(3), Some(24));
        assert_eq!(
            TypeId::TiffDouble.value_bytes(u32::MAX),
            Some(u64::from(u32::MAX) * 8)
        );
        assert_eq!(TypeId::Unknown(99).value_bytes(5), Some(0));
    }
}
