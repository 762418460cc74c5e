//! Bounds checked access to the bytes of a TIFF structure.
use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::tags::ByteOrder;

macro_rules! read_fn {
    ($name:ident, $type:ty) => {
        /// Read a
        #[doc = concat!("`", stringify!($type), "`")]
        /// at an absolute position.
        #[inline(always)]
        pub fn $name(&self, at: usize) -> TiffResult<$type> {
            let mut n = [0u8; std::mem::size_of::<$type>()];
            let len = n.len();
            n.copy_from_slice(self.bytes(at, len)?);
            Ok(match self.byte_order {
                ByteOrder::LittleEndian => <$type>::from_le_bytes(n),
                ByteOrder::BigEndian => <$type>::from_be_bytes(n),
            })
        }
    };
}

/// A byte slice read in a fixed byte order.
#[derive(Clone, Copy, Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    byte_order: ByteOrder,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        SliceReader { data, byte_order }
    }

    /// The same data in another byte order.
    pub fn with_byte_order(self, byte_order: ByteOrder) -> Self {
        SliceReader { byte_order, ..self }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `len` bytes at `at`, failing with `Truncated` past the end.
    pub fn bytes(&self, at: usize, len: usize) -> TiffResult<&'a [u8]> {
        at.checked_add(len)
            .and_then(|end| self.data.get(at..end))
            .ok_or_else(|| {
                TiffError::new(ErrorCode::Truncated)
                    .arg(len)
                    .arg(at)
                    .arg(self.data.len().saturating_sub(at))
            })
    }

    read_fn!(read_u16, u16);
    read_fn!(read_u32, u32);
}

#[test]
fn reads_are_bounds_checked() {
    let data = [0x49, 0x49, 0x2a, 0x00, 0x08, 0x00, 0x00, 0x00];
    let le = SliceReader::new(&data, ByteOrder::LittleEndian);
    assert_eq!(le.read_u16(2).unwrap(), 42);
    assert_eq!(le.read_u32(4).unwrap(), 8);
    assert_eq!(le.with_byte_order(ByteOrder::BigEndian).read_u16(2).unwrap(), 0x2a00);

    let err = le.read_u32(6).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Truncated);
    assert_eq!(err.args(), ["4", "6", "2"]);
    assert!(le.bytes(usize::MAX, 2).is_err());
    assert_eq!(le.bytes(8, 0).unwrap(), &[] as &[u8]);
}
