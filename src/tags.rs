macro_rules! tags {
    {
        // Permit arbitrary meta items, which include documentation.
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident($ty:tt) $(unknown(#[$unknown_meta:meta] $unknown_doc:ident))* {
            // Each of the `Name = Val,` permitting documentation.
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($(#[$ident_attr])* $tag,)*
            $(
                #[$unknown_meta]
                Unknown($ty),
            )*
        }

        impl $name {
            #[inline(always)]
            const fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
                match n {
                    $( $val => Ok($name::$tag), )*
                    n => Err(n),
                }
            }

            #[inline(always)]
            const fn __to_inner_type(&self) -> $ty {
                match *self {
                    $( $name::$tag => $val, )*
                    $( $name::Unknown($unknown_doc) => { $unknown_doc }, )*
                }
            }

            /// Convert from the raw numeric representation, `None` if the value is not known.
            #[inline(always)]
            pub const fn from_raw(val: $ty) -> Option<Self> {
                match Self::__from_inner_type(val) {
                    Ok(v) => Some(v),
                    Err(_) => None,
                }
            }

            /// The raw numeric representation.
            #[inline(always)]
            pub const fn to_raw(&self) -> $ty {
                Self::__to_inner_type(self)
            }
        }

        tags!($name, $ty, $($unknown_doc)*);
    };
    // With an unknown variant, provide a conversion that never fails.
    ($name:tt, $ty:tt, $unknown_doc:ident) => {
        impl $name {
            #[inline(always)]
            pub const fn from_raw_exhaustive($unknown_doc: $ty) -> Self {
                match Self::__from_inner_type($unknown_doc) {
                    Ok(v) => v,
                    Err(_) => $name::Unknown($unknown_doc),
                }
            }
        }
    };
    ($name:tt, $ty:tt, ) => {};
}

pub(crate) use tags;

// Note: only the tags the codec itself interprets or that are commonly addressed by callers.
// Every other tag is carried by its raw `u16` value.
tags! {
/// Well-known TIFF and Exif tags.
pub enum Tag(u16) unknown(
    /// A private, vendor or extension tag
    unknown
) {
    ImageWidth = 0x0100,
    ImageLength = 0x0101,
    BitsPerSample = 0x0102,
    Compression = 0x0103,
    PhotometricInterpretation = 0x0106,
    ImageDescription = 0x010e,
    Make = 0x010f,
    Model = 0x0110,
    StripOffsets = 0x0111,
    Orientation = 0x0112,
    SamplesPerPixel = 0x0115,
    RowsPerStrip = 0x0116,
    StripByteCounts = 0x0117,
    XResolution = 0x011a,
    YResolution = 0x011b,
    ResolutionUnit = 0x0128,
    Software = 0x0131,
    DateTime = 0x0132,
    Artist = 0x013b,
    SubIfds = 0x014a,
    JpegInterchangeFormat = 0x0201,
    JpegInterchangeFormatLength = 0x0202,
    YCbCrPositioning = 0x0213,
    XmpPacket = 0x02bc,
    Copyright = 0x8298,
    ExposureTime = 0x829a,
    FNumber = 0x829d,
    IptcNaa = 0x83bb,
    ExifIfd = 0x8769,
    IccProfile = 0x8773,
    GpsIfd = 0x8825,
    IsoSpeedRatings = 0x8827,
    ExifVersion = 0x9000,
    DateTimeOriginal = 0x9003,
    DateTimeDigitized = 0x9004,
    MakerNote = 0x927c,
    UserComment = 0x9286,
    InteropIfd = 0xa005,
}
}

impl From<Tag> for u16 {
    fn from(tag: Tag) -> u16 {
        tag.to_raw()
    }
}

/// Tags beyond the 16-bit range, used to address structural positions in the structure table.
pub mod extended {
    /// The root directory of a TIFF structure.
    pub const ROOT: u32 = 0x2_0000;
    /// The next directory of a chain.
    pub const NEXT: u32 = 0x3_0000;
}

tags! {
/// Identifies the directory (namespace) an entry belongs to.
pub enum Group(u16) unknown(
    /// A group registered by a caller, e.g. for an additional maker note vendor
    unknown
) {
    /// Not yet placed in the structure, e.g. the header before the root directory.
    IfdNotSet = 0,
    /// The primary directory chain.
    Ifd0 = 1,
    Exif = 2,
    Gps = 3,
    /// Interoperability directory.
    Iop = 4,
    /// Directories referenced from the `SubIFDs` tag.
    SubImage = 5,
    Canon = 0x10,
    Fuji = 0x11,
    Minolta = 0x12,
    /// Nikon maker note without a header.
    Nikon1 = 0x13,
    /// Nikon maker note with a plain 8 byte header.
    Nikon2 = 0x14,
    /// Nikon maker note with an embedded TIFF header.
    Nikon3 = 0x15,
    NikonPreview = 0x16,
    Olympus = 0x17,
    Olympus2 = 0x18,
    Panasonic = 0x19,
    Pentax = 0x1a,
    Samsung = 0x1b,
    Sigma = 0x1c,
    /// Sony maker note with a `SONY DSC` header.
    Sony1 = 0x1d,
    /// Sony maker note without a header.
    Sony2 = 0x1e,
}
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Group::Unknown(n) => write!(f, "Group({n:#06x})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Byte order of a TIFF structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// little endian byte order, marker `II`
    LittleEndian,
    /// big endian byte order, marker `MM`
    BigEndian,
}

impl ByteOrder {
    /// Interpret a two byte order marker.
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            [b'I', b'I', ..] => Some(ByteOrder::LittleEndian),
            [b'M', b'M', ..] => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    pub const fn marker(self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    #[inline]
    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u16_bytes(self, n: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => n.to_le_bytes(),
            ByteOrder::BigEndian => n.to_be_bytes(),
        }
    }

    #[inline]
    pub fn u32_bytes(self, n: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => n.to_le_bytes(),
            ByteOrder::BigEndian => n.to_be_bytes(),
        }
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let marker = self.marker();
        write!(f, "{}{}", marker[0] as char, marker[1] as char)
    }
}

#[test]
fn tag_conversions() {
    assert_eq!(Tag::from_raw(0x010f), Some(Tag::Make));
    assert_eq!(Tag::from_raw(0x1234), None);
    assert_eq!(Tag::from_raw_exhaustive(0x1234), Tag::Unknown(0x1234));
    assert_eq!(Tag::Unknown(0x1234).to_raw(), 0x1234);
    assert_eq!(u16::from(Tag::ExifIfd), 0x8769);
}

#[test]
fn byte_order_markers() {
    assert_eq!(ByteOrder::from_marker(b"II*\0"), Some(ByteOrder::LittleEndian));
    assert_eq!(ByteOrder::from_marker(b"MM"), Some(ByteOrder::BigEndian));
    assert_eq!(ByteOrder::from_marker(b"IM"), None);
    assert_eq!(ByteOrder::from_marker(b"I"), None);

    for bo in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        assert_eq!(bo.u16_from(bo.u16_bytes(0x1234)), 0x1234);
        assert_eq!(bo.u32_from(bo.u32_bytes(0xdead_beef)), 0xdead_beef);
        assert_eq!(ByteOrder::from_marker(&bo.marker()), Some(bo));
    }
}
