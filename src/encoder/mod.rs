//! Encoding of a [`MetadataTree`] into a TIFF structure.
//!
//! Every directory is followed by its out-of-line values, then by its sub-directories and
//! finally by the next directory of its chain. Maker notes are written as one out-of-line value:
//! the vendor header as it was read, then the vendor directory in the vendor byte order.
use crate::directory::{Component, Directory, MakerNote, MetadataTree};
use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::makernote::BaseOffset;
use crate::tags::ByteOrder;
use crate::value::{TypeId, Value};

mod writer;

use self::writer::TiffWriter;

#[derive(Clone, Copy, Debug)]
struct Frame {
    byte_order: ByteOrder,
    /// Absolute position that offsets are relative to.
    base: usize,
}

/// The TIFF field type a value is stored with.
fn field_type(tag: u16, type_id: TypeId) -> TiffResult<u16> {
    let stored = match type_id {
        TypeId::Comment => TypeId::Undefined,
        TypeId::String => TypeId::AsciiString,
        other => other,
    };
    stored.to_tiff().ok_or_else(|| {
        TiffError::new(ErrorCode::UnsupportedType)
            .arg(type_id)
            .arg(format_args!("{tag:#06x}"))
    })
}

fn entry_count(count: usize) -> TiffResult<u32> {
    u32::try_from(count).map_err(|_| {
        TiffError::new(ErrorCode::LimitsExceeded).arg(format_args!("{count} components"))
    })
}

/// A deferred part of an entry.
enum Pending<'t> {
    Value(&'t Value),
    MakerNote(&'t MakerNote),
    Raw(&'t [u8]),
    Directories(&'t [Directory]),
}

/// Encoder of TIFF structures
#[derive(Debug)]
pub struct TiffEncoder {
    writer: TiffWriter,
    byte_order: ByteOrder,
}

impl TiffEncoder {
    pub fn new(byte_order: ByteOrder) -> Self {
        TiffEncoder {
            writer: TiffWriter::new(),
            byte_order,
        }
    }

    /// Encode a tree in its own byte order.
    pub fn encode(tree: &MetadataTree) -> TiffResult<Vec<u8>> {
        TiffEncoder::new(tree.byte_order).write_tree(&tree.root)
    }

    /// Write the header, the directory chain starting at `root` and everything it references.
    pub fn write_tree(mut self, root: &Directory) -> TiffResult<Vec<u8>> {
        let frame = Frame {
            byte_order: self.byte_order,
            base: 0,
        };
        self.writer.write_header(frame.byte_order);
        let field = self.writer.reserve(4);
        let first = self.write_chain(root, frame)?;
        self.writer
            .patch_u32(field, frame.byte_order, relative(first, frame)?);
        Ok(self.writer.into_inner())
    }

    /// Write a directory chain and return the position of its first directory.
    fn write_chain(&mut self, root: &Directory, frame: Frame) -> TiffResult<usize> {
        let mut first = None;
        let mut link: Option<usize> = None;
        for dir in root.chain() {
            self.writer.pad_word_boundary();
            let (at, next_field) = self.write_directory(dir, frame)?;
            if let Some(field) = link {
                self.writer
                    .patch_u32(field, frame.byte_order, relative(at, frame)?);
            }
            if first.is_none() {
                first = Some(at);
            }

            link = next_field;
            if link.is_none() && dir.next().is_some() {
                log::warn!("{} directory has no next pointer, chain dropped", dir.group());
                break;
            }
        }
        // `chain` yields at least `root`.
        Ok(first.unwrap_or_default())
    }

    /// Write a directory, its values and sub-directories at the current position.
    ///
    /// Returns the position of the directory and of its next pointer.
    fn write_directory(
        &mut self,
        dir: &Directory,
        frame: Frame,
    ) -> TiffResult<(usize, Option<usize>)> {
        let bo = frame.byte_order;
        let count = u16::try_from(dir.len())
            .map_err(|_| TiffError::new(ErrorCode::EntryCountOverflow).arg(dir.len()))?;

        let at = self.writer.offset();
        self.writer.write_u16(bo, count);
        let entries = self.writer.reserve(12 * dir.len());
        let next_field = dir.has_next().then(|| self.writer.reserve(4));

        let mut pending = Vec::new();
        for (i, component) in dir.iter().enumerate() {
            let field = entries + 12 * i;
            let tag = component.tag();
            let ty = field_type(tag, component.type_id())?;
            let mut head = [0u8; 8];
            head[..2].copy_from_slice(&bo.u16_bytes(tag));
            head[2..4].copy_from_slice(&bo.u16_bytes(ty));

            let (count, deferred) = match component {
                Component::Entry(e) => (e.value.count(), Pending::Value(&e.value)),
                Component::SubDirectory(s) => {
                    (s.directories.len(), Pending::Directories(&s.directories))
                }
                Component::MakerNote(m) => match &m.note {
                    // The size is only known once it is written.
                    Some(note) => (0, Pending::MakerNote(note)),
                    None => (m.raw.len(), Pending::Raw(&m.raw)),
                },
            };
            head[4..].copy_from_slice(&bo.u32_bytes(entry_count(count)?));
            self.writer.patch(field, &head);
            pending.push((field, deferred));
        }

        // Values in entry order, then the directories they reference.
        let mut directories = Vec::new();
        for (field, deferred) in pending {
            match deferred {
                Pending::Value(value) => {
                    let bytes = value.to_bytes(bo);
                    self.write_value(field, &bytes, frame)?;
                }
                Pending::Raw(bytes) => self.write_value(field, bytes, frame)?,
                Pending::MakerNote(note) => {
                    self.writer.pad_word_boundary();
                    let start = self.writer.offset();
                    self.write_maker_note(note, frame)?;
                    let len = self.writer.offset() - start;
                    self.writer.patch_u32(field + 4, bo, entry_count(len)?);
                    self.writer.patch_u32(field + 8, bo, relative(start, frame)?);
                }
                Pending::Directories(dirs) => {
                    // More than one offset does not fit into the entry.
                    let table = if dirs.len() > 1 {
                        self.writer.pad_word_boundary();
                        let table = self.writer.reserve(4 * dirs.len());
                        self.writer.patch_u32(field + 8, bo, relative(table, frame)?);
                        table
                    } else {
                        field + 8
                    };
                    directories.push((table, dirs));
                }
            }
        }

        for (table, dirs) in directories {
            for (i, sub) in dirs.iter().enumerate() {
                let sub_at = self.write_chain(sub, frame)?;
                self.writer
                    .patch_u32(table + 4 * i, bo, relative(sub_at, frame)?);
            }
        }

        Ok((at, next_field))
    }

    /// Store `bytes` in the entry at `field`, inline or out of line.
    fn write_value(&mut self, field: usize, bytes: &[u8], frame: Frame) -> TiffResult<()> {
        if bytes.len() <= 4 {
            self.writer.patch(field + 8, bytes);
            return Ok(());
        }
        self.writer.pad_word_boundary();
        let at = self.writer.offset();
        self.writer.write_bytes(bytes);
        self.writer
            .patch_u32(field + 8, frame.byte_order, relative(at, frame)?);
        Ok(())
    }

    fn write_maker_note(&mut self, note: &MakerNote, parent: Frame) -> TiffResult<()> {
        let start = self.writer.offset();
        let frame = Frame {
            byte_order: note.byte_order(parent.byte_order),
            base: match note.header.base {
                BaseOffset::Parent => parent.base,
                BaseOffset::MakerNote(delta) => start + usize::try_from(delta)?,
            },
        };
        self.writer.write_bytes(&note.header.header);
        // Chained maker note directories are not supported, the next pointer stays zero.
        self.write_directory(&note.directory, frame)?;
        Ok(())
    }
}

/// The offset of `at` in a frame.
fn relative(at: usize, frame: Frame) -> TiffResult<u32> {
    at.checked_sub(frame.base)
        .and_then(|offset| u32::try_from(offset).ok())
        .ok_or_else(|| TiffError::new(ErrorCode::OffsetOverflow).arg(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Entry, SubDirectoryEntry};
    use crate::tags::{Group, Tag};
    use crate::value::{AsciiValue, Numbers, XmpTextValue};

    fn tree() -> MetadataTree {
        let mut tree = MetadataTree::new(ByteOrder::LittleEndian);
        tree.root
            .set_value(Tag::Make, Value::Ascii(AsciiValue::new("Canon")));
        tree.root.set_value(
            Tag::ImageWidth,
            Value::UnsignedShort(Numbers::new(vec![640])),
        );
        tree
    }

    #[test]
    fn layout_of_a_small_tree() {
        let bytes = TiffEncoder::encode(&tree()).unwrap();
        // Header, 2 + 2 * 12 + 4 directory bytes, the out-of-line make.
        assert_eq!(bytes.len(), 8 + 30 + 6);
        assert_eq!(&bytes[..8], b"II\x2a\0\x08\0\0\0");
        assert_eq!(&bytes[8..10], &[2, 0]);
        // Make: ASCII, 6 bytes at offset 38.
        assert_eq!(&bytes[10..22], &[0x0f, 0x01, 2, 0, 6, 0, 0, 0, 38, 0, 0, 0]);
        // ImageWidth inline.
        assert_eq!(&bytes[22..34], &[0x00, 0x01, 3, 0, 1, 0, 0, 0, 0x80, 0x02, 0, 0]);
        assert_eq!(&bytes[34..38], &[0; 4]);
        assert_eq!(&bytes[38..], b"Canon\0");
    }

    #[test]
    fn private_types_are_rejected() {
        let mut tree = tree();
        tree.root
            .set_value(0x1234u16, Value::XmpText(XmpTextValue::default()));
        let err = TiffEncoder::encode(&tree).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedType);
        assert_eq!(err.args(), ["XmpText", "0x1234"]);
    }

    #[test]
    fn several_sub_directories_use_an_offset_table() {
        let mut tree = tree();
        let subs = (0..2)
            .map(|n| {
                let mut dir = Directory::new(Group::SubImage);
                dir.insert(Entry::new(
                    Tag::ImageWidth,
                    Group::SubImage,
                    Value::UnsignedShort(Numbers::new(vec![n])),
                ));
                dir
            })
            .collect();
        tree.root
            .insert(SubDirectoryEntry::new(Tag::SubIfds, Group::Ifd0, subs));

        let bytes = TiffEncoder::encode(&tree).unwrap();
        // The third entry points at a table of two offsets.
        let entry = &bytes[34..46];
        assert_eq!(&entry[..8], &[0x4a, 0x01, 4, 0, 2, 0, 0, 0]);
        let table = u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]) as usize;
        let first = u32::from_le_bytes(bytes[table..table + 4].try_into().unwrap()) as usize;
        let second = u32::from_le_bytes(bytes[table + 4..table + 8].try_into().unwrap()) as usize;
        assert_eq!(first % 2, 0);
        assert_eq!(second, first + 18);
    }
}
