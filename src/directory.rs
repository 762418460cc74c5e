//! The in-memory metadata tree: directories of components.
use std::collections::HashMap;

use crate::makernote::MakerNoteHeader;
use crate::tags::{ByteOrder, Group, Tag};
use crate::value::{TypeId, Value};

/// A plain directory entry holding a value.
#[derive(Clone, Debug)]
pub struct Entry {
    pub tag: u16,
    pub group: Group,
    pub value: Value,
}

impl Entry {
    pub fn new(tag: impl Into<u16>, group: Group, value: Value) -> Self {
        Entry {
            tag: tag.into(),
            group,
            value,
        }
    }
}

/// Entries are equal when their tag, group, type and value bytes are.
///
/// The byte order a value was decoded with does not matter.
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.group == other.group
            && self.value.type_id() == other.value.type_id()
            && self.value.to_bytes(ByteOrder::LittleEndian)
                == other.value.to_bytes(ByteOrder::LittleEndian)
    }
}

/// An entry whose value points at one or more directories.
#[derive(Clone, Debug, PartialEq)]
pub struct SubDirectoryEntry {
    pub tag: u16,
    /// The group of the directory holding this entry.
    pub group: Group,
    /// `LONG` or `IFD`.
    pub type_id: TypeId,
    pub directories: Vec<Directory>,
}

impl SubDirectoryEntry {
    pub fn new(tag: impl Into<u16>, group: Group, directories: Vec<Directory>) -> Self {
        SubDirectoryEntry {
            tag: tag.into(),
            group,
            type_id: TypeId::UnsignedLong,
            directories,
        }
    }
}

/// A vendor maker note which was recognized and parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct MakerNote {
    pub header: MakerNoteHeader,
    pub directory: Directory,
}

impl MakerNote {
    /// The byte order of the maker note directory, `parent` unless the header overrides it.
    pub fn byte_order(&self, parent: ByteOrder) -> ByteOrder {
        self.header.byte_order.unwrap_or(parent)
    }
}

/// The maker note entry. It stays an opaque blob unless a vendor claimed it.
#[derive(Clone, Debug)]
pub struct MakerNoteEntry {
    pub tag: u16,
    pub group: Group,
    /// The type the entry was stored with, usually `UNDEFINED`.
    pub type_id: TypeId,
    /// The undecoded bytes as found in the file.
    pub raw: Vec<u8>,
    /// The position of `raw` in the decoded data, if it was stored out of line.
    pub offset: Option<usize>,
    pub note: Option<MakerNote>,
}

impl MakerNoteEntry {
    pub fn opaque(tag: impl Into<u16>, group: Group, type_id: TypeId, raw: Vec<u8>) -> Self {
        MakerNoteEntry {
            tag: tag.into(),
            group,
            type_id,
            raw,
            offset: None,
            note: None,
        }
    }
}

/// Parsed maker notes compare by their content; the raw bytes embed offsets of the file they
/// came from. The position in the file is ignored.
impl PartialEq for MakerNoteEntry {
    fn eq(&self, other: &Self) -> bool {
        if self.tag != other.tag || self.group != other.group || self.type_id != other.type_id {
            return false;
        }
        match (&self.note, &other.note) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.raw == other.raw,
            _ => false,
        }
    }
}

/// A node of a directory.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    Entry(Entry),
    SubDirectory(SubDirectoryEntry),
    MakerNote(MakerNoteEntry),
}

impl Component {
    pub fn tag(&self) -> u16 {
        match self {
            Component::Entry(e) => e.tag,
            Component::SubDirectory(s) => s.tag,
            Component::MakerNote(m) => m.tag,
        }
    }

    pub fn group(&self) -> Group {
        match self {
            Component::Entry(e) => e.group,
            Component::SubDirectory(s) => s.group,
            Component::MakerNote(m) => m.group,
        }
    }

    pub fn type_id(&self) -> TypeId {
        match self {
            Component::Entry(e) => e.value.type_id(),
            Component::SubDirectory(s) => s.type_id,
            Component::MakerNote(m) => m.type_id,
        }
    }

    /// The value of a plain entry.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Component::Entry(e) => Some(&e.value),
            _ => None,
        }
    }

    /// Directories owned by this component, in order.
    pub fn directories(&self) -> impl Iterator<Item = &Directory> + '_ {
        let (subs, note) = match self {
            Component::Entry(_) => ([].as_slice(), None),
            Component::SubDirectory(s) => (s.directories.as_slice(), None),
            Component::MakerNote(m) => ([].as_slice(), m.note.as_ref().map(|n| &n.directory)),
        };
        subs.iter().chain(note)
    }
}

impl From<Entry> for Component {
    fn from(entry: Entry) -> Self {
        Component::Entry(entry)
    }
}

impl From<SubDirectoryEntry> for Component {
    fn from(entry: SubDirectoryEntry) -> Self {
        Component::SubDirectory(entry)
    }
}

impl From<MakerNoteEntry> for Component {
    fn from(entry: MakerNoteEntry) -> Self {
        Component::MakerNote(entry)
    }
}

/// An Image File Directory (IFD).
///
/// Components keep the order they were read or inserted in. A tag appears at most once when
/// the directory is built through [`insert`](Self::insert); decoded directories keep
/// duplicates, and lookups return the first.
#[doc(alias = "IFD")]
#[derive(Clone, Debug)]
pub struct Directory {
    group: Group,
    components: Vec<Component>,
    index: HashMap<u16, usize>,
    /// Whether the directory is stored with a next-directory pointer.
    has_next: bool,
    next: Option<Box<Directory>>,
}

impl Directory {
    pub fn new(group: Group) -> Self {
        Directory {
            group,
            components: Vec::new(),
            index: HashMap::new(),
            has_next: true,
            next: None,
        }
    }

    /// A directory stored without a next-directory pointer.
    pub fn without_next(group: Group) -> Self {
        Directory {
            has_next: false,
            ..Directory::new(group)
        }
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Component> {
        self.components.iter_mut()
    }

    pub fn contains(&self, tag: impl Into<u16>) -> bool {
        self.index.contains_key(&tag.into())
    }

    pub fn get(&self, tag: impl Into<u16>) -> Option<&Component> {
        self.index
            .get(&tag.into())
            .map(|&i| &self.components[i])
    }

    pub fn get_mut(&mut self, tag: impl Into<u16>) -> Option<&mut Component> {
        self.index
            .get(&tag.into())
            .map(|&i| &mut self.components[i])
    }

    /// The plain entry for `tag`, if the tag is present and not a structural component.
    pub fn entry(&self, tag: impl Into<u16>) -> Option<&Entry> {
        match self.get(tag) {
            Some(Component::Entry(e)) => Some(e),
            _ => None,
        }
    }

    pub fn value(&self, tag: impl Into<u16>) -> Option<&Value> {
        self.entry(tag).map(|e| &e.value)
    }

    /// Append a decoded component, keeping an earlier component with the same tag.
    pub(crate) fn push(&mut self, component: Component) {
        self.index
            .entry(component.tag())
            .or_insert(self.components.len());
        self.components.push(component);
    }

    /// Insert a component, replacing the one with the same tag in place.
    ///
    /// Returns the replaced component.
    pub fn insert(&mut self, component: impl Into<Component>) -> Option<Component> {
        let component = component.into();
        match self.index.get(&component.tag()) {
            Some(&i) => Some(std::mem::replace(&mut self.components[i], component)),
            None => {
                self.push(component);
                None
            }
        }
    }

    /// Set the value of `tag`.
    ///
    /// An existing plain entry keeps its place and group. Any other component with that tag is
    /// replaced by a plain entry.
    pub fn set_value(&mut self, tag: impl Into<u16>, value: Value) -> Option<Component> {
        let tag = tag.into();
        if let Some(Component::Entry(entry)) = self.get_mut(tag) {
            let old = std::mem::replace(&mut entry.value, value);
            return Some(Component::Entry(Entry::new(tag, entry.group, old)));
        }
        self.insert(Entry::new(tag, self.group, value))
    }

    /// Remove the first component with `tag`.
    pub fn remove(&mut self, tag: impl Into<u16>) -> Option<Component> {
        let i = self.index.remove(&tag.into())?;
        let removed = self.components.remove(i);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, c) in self.components.iter().enumerate() {
            self.index.entry(c.tag()).or_insert(i);
        }
    }

    pub fn next(&self) -> Option<&Directory> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut Directory> {
        self.next.as_deref_mut()
    }

    /// Replace the next directory of the chain and return the previous one.
    pub fn set_next(&mut self, next: Option<Directory>) -> Option<Directory> {
        if next.is_some() {
            self.has_next = true;
        }
        std::mem::replace(&mut self.next, next.map(Box::new)).map(|b| *b)
    }

    /// This directory followed by its chain of next directories.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Find the first directory of `group` in this subtree, depth first.
    pub fn find_directory(&self, group: Group) -> Option<&Directory> {
        for dir in self.chain() {
            if dir.group == group {
                return Some(dir);
            }
            let found = dir
                .components
                .iter()
                .flat_map(Component::directories)
                .find_map(|d| d.find_directory(group));
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Find the first component with `tag` in a directory of `group`, including chained
    /// directories of the same group.
    pub fn find(&self, group: Group, tag: impl Into<u16>) -> Option<&Component> {
        let tag = tag.into();
        self.find_directory(group)?
            .chain()
            .filter(|d| d.group == group)
            .find_map(|d| d.get(tag))
    }
}

/// Directories compare by group, components in order and their chain.
impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.has_next == other.has_next
            && self.components == other.components
            && self.next == other.next
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a directory chain, see [`Directory::chain`].
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    next: Option<&'a Directory>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Directory;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}

/// A decoded TIFF structure.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataTree {
    pub byte_order: ByteOrder,
    /// The first directory of the primary chain, group `Ifd0`.
    pub root: Directory,
}

impl MetadataTree {
    pub fn new(byte_order: ByteOrder) -> Self {
        MetadataTree {
            byte_order,
            root: Directory::new(Group::Ifd0),
        }
    }

    pub fn find(&self, group: Group, tag: impl Into<u16>) -> Option<&Component> {
        self.root.find(group, tag)
    }

    /// The text of the ASCII entry `tag` of the primary directory.
    pub(crate) fn ifd0_text(&self, tag: Tag) -> Option<String> {
        match self.root.value(tag)? {
            Value::Ascii(v) => Some(v.text().into_owned()),
            _ => None,
        }
    }

    /// The maker note, if one was found and recognized.
    pub fn maker_note(&self) -> Option<&MakerNote> {
        match self.find(Group::Exif, Tag::MakerNote)? {
            Component::MakerNote(m) => m.note.as_ref(),
            _ => None,
        }
    }
}
