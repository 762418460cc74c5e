use crate::tags::ByteOrder;

/// An append-only output buffer with patching of already written fields.
#[derive(Debug, Default)]
pub struct TiffWriter {
    buf: Vec<u8>,
}

impl TiffWriter {
    pub fn new() -> Self {
        TiffWriter::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// The position of the next write.
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, byte_order: ByteOrder, n: u16) {
        self.write_bytes(&byte_order.u16_bytes(n));
    }

    pub fn write_header(&mut self, byte_order: ByteOrder) {
        self.write_bytes(&byte_order.marker());
        self.write_u16(byte_order, 42);
    }

    /// Append `len` zero bytes and return their position.
    pub fn reserve(&mut self, len: usize) -> usize {
        let at = self.offset();
        self.buf.resize(at + len, 0);
        at
    }

    /// Overwrite bytes at `at`, which must already have been written.
    pub fn patch(&mut self, at: usize, bytes: &[u8]) {
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn patch_u32(&mut self, at: usize, byte_order: ByteOrder, n: u32) {
        self.patch(at, &byte_order.u32_bytes(n));
    }

    /// Pad to an even position; TIFF values start on a word boundary.
    pub fn pad_word_boundary(&mut self) {
        if self.offset() % 2 != 0 {
            self.buf.push(0);
        }
    }
}

#[test]
fn patching_and_padding() {
    let mut writer = TiffWriter::new();
    writer.write_header(ByteOrder::BigEndian);
    let field = writer.reserve(4);
    writer.write_bytes(b"abc");
    writer.pad_word_boundary();
    assert_eq!(writer.offset(), 12);
    writer.pad_word_boundary();
    assert_eq!(writer.offset(), 12);

    writer.patch_u32(field, ByteOrder::BigEndian, 8);
    assert_eq!(
        writer.into_inner(),
        b"MM\0\x2a\0\0\0\x08abc\0".to_vec()
    );
}
