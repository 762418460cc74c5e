//! Which entries open a directory, and which group that directory belongs to.
use crate::tags::{extended, Group, Tag};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Structure {
    /// The entry is the start of a directory chain of the group.
    Directory(Group),
    /// The entry holds offsets of directories of the group.
    SubDirectory(Group),
    /// The entry holds a vendor maker note.
    MakerNote,
}

struct StructureRule {
    /// A tag, or one of the [`extended`] positions.
    tag: u32,
    /// The group of the directory containing the tag.
    parent: Group,
    structure: Structure,
}

const fn rule(tag: u32, parent: Group, structure: Structure) -> StructureRule {
    StructureRule {
        tag,
        parent,
        structure,
    }
}

const fn tag(tag: Tag) -> u32 {
    tag.to_raw() as u32
}

static RULES: &[StructureRule] = &[
    rule(extended::ROOT, Group::IfdNotSet, Structure::Directory(Group::Ifd0)),
    rule(tag(Tag::ExifIfd), Group::Ifd0, Structure::SubDirectory(Group::Exif)),
    rule(tag(Tag::GpsIfd), Group::Ifd0, Structure::SubDirectory(Group::Gps)),
    rule(tag(Tag::SubIfds), Group::Ifd0, Structure::SubDirectory(Group::SubImage)),
    rule(tag(Tag::InteropIfd), Group::Exif, Structure::SubDirectory(Group::Iop)),
    rule(tag(Tag::MakerNote), Group::Exif, Structure::MakerNote),
    // Nikon preview image directory.
    rule(0x0011, Group::Nikon3, Structure::SubDirectory(Group::NikonPreview)),
];

/// The structural meaning of `tag` in a directory of `group`, `None` for a plain entry.
pub fn lookup(tag: u32, group: Group) -> Option<Structure> {
    RULES
        .iter()
        .find(|r| r.tag == tag && r.parent == group)
        .map(|r| r.structure)
}

/// The group of the primary directory chain.
pub fn root_group() -> Group {
    match lookup(extended::ROOT, Group::IfdNotSet) {
        Some(Structure::Directory(group)) => group,
        _ => Group::Ifd0,
    }
}

#[test]
fn lookups() {
    assert_eq!(root_group(), Group::Ifd0);
    assert_eq!(
        lookup(0x8769, Group::Ifd0),
        Some(Structure::SubDirectory(Group::Exif))
    );
    assert_eq!(lookup(0x927c, Group::Exif), Some(Structure::MakerNote));
    // Tags are structural only in their parent group.
    assert_eq!(lookup(0x8769, Group::Exif), None);
    assert_eq!(lookup(0x927c, Group::Ifd0), None);
    assert_eq!(lookup(0x010f, Group::Ifd0), None);
}
