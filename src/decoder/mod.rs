//! Decoding of TIFF structures into a [`MetadataTree`].
use crate::directory::{
    Component, Directory, Entry, MakerNote, MakerNoteEntry, MetadataTree, SubDirectoryEntry,
};
use crate::error::{ErrorCode, TiffError, TiffResult};
use crate::io::ByteStore;
use crate::makernote::{BaseOffset, MakerNoteDescriptor, MakerNoteRegistry};
use crate::tags::{ByteOrder, Group, Tag};
use crate::value::{TypeId, Value};

use self::cycles::VisitedDirectories;
use self::stream::SliceReader;
use self::structure::Structure;

mod cycles;
mod stream;
pub(crate) mod structure;

/// Decoding limits
#[derive(Clone, Debug)]
pub struct Limits {
    /// The maximum nesting of sub-directories below the primary directory, the default is 16.
    pub max_depth: usize,
    /// The maximum number of directories in a structure, including maker notes, the default
    /// is 1024.
    pub max_directories: usize,
    /// The maximum number of entries in one directory, the default is 4096.
    pub max_entries: usize,
    /// The maximum size of any value in bytes, the default is 64MiB.
    pub max_value_size: usize,
    /// The purpose of this is to prevent all the fields of the struct from
    /// being public, as this would make adding new fields a major version
    /// bump.
    _non_exhaustive: (),
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// Cycles are still detected, and every offset is checked against the data.
    pub fn unlimited() -> Limits {
        Limits {
            max_depth: usize::MAX,
            max_directories: usize::MAX,
            max_entries: usize::MAX,
            max_value_size: usize::MAX,
            _non_exhaustive: (),
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            max_depth: 16,
            max_directories: 1024,
            max_entries: 4096,
            max_value_size: 64 * 1024 * 1024,
            _non_exhaustive: (),
        }
    }
}

/// Where offsets of a directory point to and how its numbers are stored.
#[derive(Clone, Copy, Debug)]
struct Frame {
    byte_order: ByteOrder,
    /// Absolute position that offsets are relative to.
    base: usize,
}

/// The representation of a TIFF metadata decoder
///
/// Decodes the primary directory chain with its Exif, GPS, interoperability and sub-image
/// directories. Once the tree is complete, the maker note is matched against the registry by
/// the `Make` and `Model` tags and decoded if a vendor claims it; otherwise it stays opaque.
#[derive(Debug)]
pub struct Decoder<'a> {
    reader: SliceReader<'a>,
    limits: Limits,
    registry: Option<&'a MakerNoteRegistry>,
    visited: VisitedDirectories,
}

impl<'a> Decoder<'a> {
    /// Check the header of the TIFF structure at the start of `data`.
    pub fn new(data: &'a [u8]) -> TiffResult<Decoder<'a>> {
        let byte_order = match data.get(..2).and_then(ByteOrder::from_marker) {
            Some(byte_order) => byte_order,
            None => return Err(TiffError::new(ErrorCode::NotATiff)),
        };
        let reader = SliceReader::new(data, byte_order);
        match reader.read_u16(2)? {
            42 => {}
            43 => return Err(TiffError::new(ErrorCode::BigTiffUnsupported)),
            _ => return Err(TiffError::new(ErrorCode::NotATiff)),
        }

        let limits = Limits::default();
        Ok(Decoder {
            reader,
            visited: VisitedDirectories::new(limits.max_directories),
            limits,
            registry: None,
        })
    }

    pub fn with_limits(mut self, limits: Limits) -> Decoder<'a> {
        self.visited = VisitedDirectories::new(limits.max_directories);
        self.limits = limits;
        self
    }

    /// Resolve maker notes with `registry` instead of [`MakerNoteRegistry::global`].
    pub fn with_registry(mut self, registry: &'a MakerNoteRegistry) -> Decoder<'a> {
        self.registry = Some(registry);
        self
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.reader.byte_order()
    }

    /// Decode the TIFF structure at the position of `store` to its end.
    pub fn from_store(store: &mut ByteStore, limits: Limits) -> TiffResult<MetadataTree> {
        let position = store.position()?;
        let map = store.map()?;
        let start = usize::try_from(position)?.min(map.len());
        Decoder::new(&map[start..])?.with_limits(limits).decode()
    }

    /// Decode the whole structure.
    pub fn decode(mut self) -> TiffResult<MetadataTree> {
        let frame = Frame {
            byte_order: self.byte_order(),
            base: 0,
        };
        let offset = self.reader.read_u32(4)?;
        let group = structure::root_group();
        log::trace!("{}: {group} at {offset}", frame.byte_order);

        let mut tree = MetadataTree {
            byte_order: frame.byte_order,
            root: self.read_chain(offset, group, frame, 0)?,
        };
        self.resolve_maker_notes(&mut tree);
        log::debug!("decoded {} directories", self.visited.len());
        Ok(tree)
    }

    fn position(&self, frame: Frame, offset: u32, tag: u32) -> TiffResult<usize> {
        frame
            .base
            .checked_add(usize::try_from(offset)?)
            .filter(|&at| at < self.reader.len())
            .ok_or_else(|| {
                TiffError::new(ErrorCode::OffsetOutOfBounds)
                    .arg(offset)
                    .arg(format_args!("{tag:#06x}"))
                    .arg(self.reader.len())
            })
    }

    /// Read a directory and the directories chained to it.
    fn read_chain(
        &mut self,
        offset: u32,
        group: Group,
        frame: Frame,
        depth: usize,
    ) -> TiffResult<Directory> {
        let mut chain = Vec::new();
        let mut offset = offset;
        let mut tag = structure_tag(group);
        loop {
            let at = self.position(frame, offset, tag)?;
            let (dir, next) = self.read_directory(at, group, frame, depth, true)?;
            chain.push(dir);
            if next == 0 {
                break;
            }
            offset = next;
            tag = crate::tags::extended::NEXT;
        }

        let mut next = None;
        while let Some(mut dir) = chain.pop() {
            dir.set_next(next);
            next = Some(dir);
        }
        next.ok_or_else(|| TiffError::new(ErrorCode::NotATiff))
    }

    /// Read the directory at `at` and return it with its next-directory offset.
    fn read_directory(
        &mut self,
        at: usize,
        group: Group,
        frame: Frame,
        depth: usize,
        has_next: bool,
    ) -> TiffResult<(Directory, u32)> {
        if depth > self.limits.max_depth {
            return Err(TiffError::new(ErrorCode::LimitsExceeded)
                .arg(format_args!("{group} nested deeper than {}", self.limits.max_depth)));
        }
        self.visited.visit(at)?;

        let reader = self.reader.with_byte_order(frame.byte_order);
        let count = usize::from(reader.read_u16(at)?);
        if count > self.limits.max_entries {
            return Err(TiffError::new(ErrorCode::LimitsExceeded)
                .arg(format_args!("{group} directory with {count} entries")));
        }
        reader.bytes(at + 2, count * 12)?;

        let mut dir = if has_next {
            Directory::new(group)
        } else {
            Directory::without_next(group)
        };
        for i in 0..count {
            let component = self.read_entry(at + 2 + i * 12, group, frame, depth)?;
            dir.push(component);
        }

        let next = if has_next {
            reader.read_u32(at + 2 + count * 12)?
        } else {
            0
        };
        log::trace!("{group} at {at}: {count} entries, next {next}");
        Ok((dir, next))
    }

    fn read_entry(
        &mut self,
        at: usize,
        group: Group,
        frame: Frame,
        depth: usize,
    ) -> TiffResult<Component> {
        let reader = self.reader.with_byte_order(frame.byte_order);
        let tag = reader.read_u16(at)?;
        let raw_type = reader.read_u16(at + 2)?;
        let count = reader.read_u32(at + 4)?;
        let type_id = TypeId::from_tiff(raw_type);

        let mut size = u64::from(count) * u64::from(type_id.size());
        if type_id.size() == 0 {
            log::warn!("{group} tag {tag:#06x}: unknown type {raw_type}, reading {count} bytes");
            size = u64::from(count);
        }
        let size = usize::try_from(size)?;
        if size > self.limits.max_value_size {
            return Err(TiffError::new(ErrorCode::LimitsExceeded)
                .arg(format_args!("value of tag {tag:#06x} with {size} bytes")));
        }

        let (bytes, offset) = if size <= 4 {
            (reader.bytes(at + 8, size)?, None)
        } else {
            let offset = reader.read_u32(at + 8)?;
            let start = self.position(frame, offset, u32::from(tag))?;
            let bytes = reader.bytes(start, size).map_err(|_| {
                TiffError::new(ErrorCode::OffsetOutOfBounds)
                    .arg(offset)
                    .arg(format_args!("{tag:#06x}"))
                    .arg(reader.len())
            })?;
            (bytes, Some(start))
        };

        match structure::lookup(u32::from(tag), group) {
            Some(Structure::SubDirectory(child))
                if matches!(type_id, TypeId::UnsignedLong | TypeId::TiffIfd) && count > 0 =>
            {
                let mut directories = Vec::with_capacity(bytes.len() / 4);
                for chunk in bytes.chunks_exact(4) {
                    let offset = frame
                        .byte_order
                        .u32_from([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    directories.push(self.read_chain(offset, child, frame, depth + 1)?);
                }
                Ok(Component::SubDirectory(SubDirectoryEntry {
                    tag,
                    group,
                    type_id,
                    directories,
                }))
            }
            Some(Structure::SubDirectory(child)) => {
                log::warn!("{group} tag {tag:#06x}: {child} offset of type {type_id} read as a value");
                let value = Value::from_bytes(type_id, bytes, frame.byte_order)?;
                Ok(Component::Entry(Entry::new(tag, group, value)))
            }
            Some(Structure::MakerNote) => Ok(Component::MakerNote(MakerNoteEntry {
                offset,
                ..MakerNoteEntry::opaque(tag, group, type_id, bytes.to_vec())
            })),
            Some(Structure::Directory(_)) | None => {
                let value = Value::from_bytes(type_id, bytes, frame.byte_order)?;
                Ok(Component::Entry(Entry::new(tag, group, value)))
            }
        }
    }

    /// Decode maker notes once `Make` and `Model` are known.
    ///
    /// Maker notes which no vendor claims, or which fail to decode, stay opaque.
    fn resolve_maker_notes(&mut self, tree: &mut MetadataTree) {
        let Some(make) = tree.ifd0_text(Tag::Make) else {
            log::debug!("no Make tag, maker notes are not decoded");
            return;
        };
        let model = tree.ifd0_text(Tag::Model).unwrap_or_default();

        let descriptor = match self.registry {
            Some(registry) => registry.find(&make, &model).cloned(),
            None => MakerNoteRegistry::global()
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .find(&make, &model)
                .cloned(),
        };
        let Some(descriptor) = descriptor else {
            log::debug!("no maker note format for {make:?} {model:?}");
            return;
        };

        let frame = Frame {
            byte_order: tree.byte_order,
            base: 0,
        };
        self.resolve_chain(&mut tree.root, &descriptor, frame, 0);
    }

    fn resolve_chain(
        &mut self,
        dir: &mut Directory,
        descriptor: &MakerNoteDescriptor,
        frame: Frame,
        depth: usize,
    ) {
        let mut current = Some(dir);
        while let Some(dir) = current {
            self.resolve_in(dir, descriptor, frame, depth);
            current = dir.next_mut();
        }
    }

    fn resolve_in(
        &mut self,
        dir: &mut Directory,
        descriptor: &MakerNoteDescriptor,
        frame: Frame,
        depth: usize,
    ) {
        for component in dir.iter_mut() {
            match component {
                Component::MakerNote(entry) if entry.note.is_none() => {
                    match self.read_maker_note(entry, descriptor, frame, depth + 1) {
                        Ok(note) => entry.note = note,
                        Err(err) => log::warn!("{} maker note left undecoded: {err}", entry.group),
                    }
                }
                Component::SubDirectory(sub) => {
                    for child in sub.directories.iter_mut() {
                        self.resolve_chain(child, descriptor, frame, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    fn read_maker_note(
        &mut self,
        entry: &MakerNoteEntry,
        descriptor: &MakerNoteDescriptor,
        parent: Frame,
        depth: usize,
    ) -> TiffResult<Option<MakerNote>> {
        let Some(header) = descriptor.header(&entry.raw) else {
            log::warn!("maker note not recognized as {}", descriptor.group);
            return Ok(None);
        };
        let Some(start) = entry.offset else {
            log::warn!("{} maker note of {} bytes is too short", header.group, entry.raw.len());
            return Ok(None);
        };

        let frame = Frame {
            byte_order: header.byte_order.unwrap_or(parent.byte_order),
            base: match header.base {
                BaseOffset::Parent => parent.base,
                BaseOffset::MakerNote(delta) => start + usize::try_from(delta)?,
            },
        };
        let at = start + header.ifd_start();
        let (directory, next) = self.read_directory(at, header.group, frame, depth, header.has_next)?;
        if next != 0 {
            log::debug!("{} maker note: next directory at {next} ignored", header.group);
        }
        Ok(Some(MakerNote { header, directory }))
    }
}

fn structure_tag(group: Group) -> u32 {
    match group {
        Group::Exif => u32::from(u16::from(Tag::ExifIfd)),
        Group::Gps => u32::from(u16::from(Tag::GpsIfd)),
        Group::Iop => u32::from(u16::from(Tag::InteropIfd)),
        Group::SubImage => u32::from(u16::from(Tag::SubIfds)),
        _ => crate::tags::extended::ROOT,
    }
}
