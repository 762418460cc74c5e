mod fixtures;
use fixtures::*;

use tiff_meta::{
    decoder::Decoder,
    makernote::{BaseOffset, MakerNoteHeader, MakerNoteRegistry},
    tags::{ByteOrder, Group, Tag},
    value::{AsciiValue, DataValue, Numbers, TypeId, Value},
    Component, Directory, MakerNote, MakerNoteEntry, MetadataTree, SubDirectoryEntry,
};

fn ascii(text: &str) -> Value {
    Value::Ascii(AsciiValue::new(text))
}

fn undefined(bytes: &[u8]) -> Value {
    Value::Data(DataValue::with_bytes(TypeId::Undefined, bytes.to_vec()))
}

fn resolved(header: MakerNoteHeader, directory: Directory) -> MakerNoteEntry {
    MakerNoteEntry {
        note: Some(MakerNote { header, directory }),
        ..opaque(Vec::new())
    }
}

fn opaque(raw: Vec<u8>) -> MakerNoteEntry {
    MakerNoteEntry::opaque(Tag::MakerNote, Group::Exif, TypeId::Undefined, raw)
}

fn camera(byte_order: ByteOrder, make: &str, model: &str, note: MakerNoteEntry) -> MetadataTree {
    let mut exif = Directory::new(Group::Exif);
    exif.set_value(
        Tag::FNumber,
        Value::UnsignedRational(Numbers::new(vec![(28, 10)])),
    );
    exif.insert(note);

    let mut tree = MetadataTree::new(byte_order);
    tree.root.set_value(Tag::Make, ascii(make));
    tree.root.set_value(Tag::Model, ascii(model));
    tree.root
        .insert(SubDirectoryEntry::new(Tag::ExifIfd, Group::Ifd0, vec![exif]));
    tree
}

fn canon_directory() -> Directory {
    let mut dir = Directory::new(Group::Canon);
    dir.set_value(0x0001u16, Value::UnsignedShort(Numbers::new(vec![92, 2, 0, 4])));
    dir.set_value(0x0006u16, ascii("Canon EOS R5"));
    dir
}

fn round_trip(tree: &MetadataTree) -> MetadataTree {
    let bytes = tiff_meta::encode(tree).unwrap();
    tiff_meta::decode(&bytes).unwrap()
}

fn maker_note_entry(tree: &MetadataTree) -> &MakerNoteEntry {
    match tree.find(Group::Exif, Tag::MakerNote) {
        Some(Component::MakerNote(entry)) => entry,
        other => panic!("no maker note entry: {other:?}"),
    }
}

#[test]
fn canon_maker_note_is_decoded() {
    let note = resolved(MakerNoteHeader::plain(Group::Canon), canon_directory());
    let tree = camera(ByteOrder::LittleEndian, "Canon", "Canon EOS R5", note);

    let decoded = round_trip(&tree);
    assert_eq!(decoded, tree);

    let note = decoded.maker_note().expect("Canon maker note");
    assert_eq!(note.header.group, Group::Canon);
    assert_eq!(note.directory.value(0x0006u16), Some(&ascii("Canon EOS R5")));
}

#[test]
fn most_specific_model_pattern_wins() {
    fn claim(_: &[u8], group: Group) -> Option<MakerNoteHeader> {
        Some(MakerNoteHeader::plain(group))
    }
    let eos = Group::Unknown(0x100);
    let mut registry = MakerNoteRegistry::new();
    registry.register("Canon", "*", claim, Group::Canon);
    registry.register("Canon", "EOS *", claim, eos);

    let note = resolved(MakerNoteHeader::plain(Group::Canon), canon_directory());
    let bytes = tiff_meta::encode(&camera(ByteOrder::BigEndian, "Canon", "EOS R5", note)).unwrap();

    for _ in 0..3 {
        let tree = Decoder::new(&bytes)
            .unwrap()
            .with_registry(&registry)
            .decode()
            .unwrap();
        let note = tree.maker_note().unwrap();
        assert_eq!(note.header.group, eos);
        assert_eq!(note.directory.group(), eos);
    }
}

#[test]
fn unknown_make_keeps_the_maker_note_opaque() {
    ensure_env_logger_initialized();
    let raw = b"ACME\0\x01\x02\x03\x04\x05\x06\x07".to_vec();
    let tree = camera(ByteOrder::LittleEndian, "Acme Optical", "One", opaque(raw.clone()));

    let bytes = tiff_meta::encode(&tree).unwrap();
    let decoded = tiff_meta::decode(&bytes).unwrap();
    assert_eq!(decoded, tree);
    assert!(decoded.maker_note().is_none());

    let entry = maker_note_entry(&decoded);
    assert_eq!(entry.raw, raw);
    assert!(entry.offset.is_some());
}

#[test]
fn wrong_signature_keeps_the_maker_note_opaque() {
    ensure_env_logger_initialized();
    let raw = b"not an olympus maker note".to_vec();
    let tree = camera(ByteOrder::BigEndian, "OLYMPUS IMAGING CORP.", "E-M1", opaque(raw.clone()));

    let decoded = round_trip(&tree);
    assert!(decoded.maker_note().is_none());
    assert_eq!(maker_note_entry(&decoded).raw, raw);
}

#[test]
fn malformed_vendor_directory_keeps_the_maker_note_opaque() {
    ensure_env_logger_initialized();
    // A directory claiming 65535 entries.
    let raw = vec![0xff; 16];
    let tree = camera(ByteOrder::LittleEndian, "Canon", "Canon EOS R5", opaque(raw.clone()));

    let decoded = round_trip(&tree);
    assert_eq!(decoded, tree);
    assert!(decoded.maker_note().is_none());
}

#[test]
fn nikon3_keeps_its_own_byte_order() {
    let mut header = b"Nikon\0\x02\x10\0\0".to_vec();
    header.extend_from_slice(b"MM\0\x2a\0\0\0\x08");
    let header = MakerNoteHeader {
        group: Group::Nikon3,
        header,
        byte_order: Some(ByteOrder::BigEndian),
        base: BaseOffset::MakerNote(10),
        has_next: true,
    };

    let mut preview = Directory::new(Group::NikonPreview);
    preview.set_value(0x0201u16, Value::UnsignedLong(Numbers::new(vec![1234])));
    let mut dir = Directory::new(Group::Nikon3);
    dir.set_value(0x0001u16, undefined(b"0210"));
    dir.set_value(0x0004u16, ascii("FINE  "));
    dir.insert(SubDirectoryEntry::new(0x0011u16, Group::Nikon3, vec![preview]));

    let tree = camera(ByteOrder::LittleEndian, "NIKON CORPORATION", "NIKON D850", resolved(header, dir));
    let bytes = tiff_meta::encode(&tree).unwrap();
    let decoded = tiff_meta::decode(&bytes).unwrap();
    assert_eq!(decoded, tree);

    let entry = maker_note_entry(&decoded);
    assert!(entry.raw.starts_with(b"Nikon\0\x02\x10\0\0MM"));
    // The entry count of the vendor directory is big endian.
    assert_eq!(&entry.raw[18..20], &[0, 3]);

    let note = entry.note.as_ref().unwrap();
    assert_eq!(note.byte_order(decoded.byte_order), ByteOrder::BigEndian);
    assert!(note.directory.find_directory(Group::NikonPreview).is_some());
}

#[test]
fn fuji_offsets_are_relative_to_the_maker_note() {
    let header = MakerNoteHeader {
        group: Group::Fuji,
        header: b"FUJIFILM\x0c\0\0\0".to_vec(),
        byte_order: Some(ByteOrder::LittleEndian),
        base: BaseOffset::MakerNote(0),
        has_next: true,
    };
    let mut dir = Directory::new(Group::Fuji);
    dir.set_value(0x0000u16, undefined(b"0130"));
    dir.set_value(0x1000u16, ascii("NORMAL "));

    let tree = camera(ByteOrder::BigEndian, "FUJIFILM", "X-T5", resolved(header, dir));
    let decoded = round_trip(&tree);
    assert_eq!(decoded, tree);

    let entry = maker_note_entry(&decoded);
    // Quality is stored after the directory, 12 + 2 + 2 * 12 + 4 bytes into the maker note.
    assert_eq!(&entry.raw[42..50], b"NORMAL \0");
    assert_eq!(&entry.raw[14 + 12 + 8..14 + 12 + 12], &[42, 0, 0, 0]);
}

#[test]
fn panasonic_directory_has_no_next_pointer() {
    let header = MakerNoteHeader {
        has_next: false,
        ..MakerNoteHeader::with_header(Group::Panasonic, b"Panasonic\0\0\0")
    };
    let mut dir = Directory::without_next(Group::Panasonic);
    dir.set_value(0x0001u16, undefined(b"0100"));

    let tree = camera(ByteOrder::LittleEndian, "Panasonic", "DC-S5", resolved(header, dir));
    let decoded = round_trip(&tree);
    assert_eq!(decoded, tree);

    let entry = maker_note_entry(&decoded);
    assert_eq!(entry.raw.len(), 12 + 2 + 12);
    assert!(!decoded.maker_note().unwrap().directory.has_next());
}

#[test]
fn global_registry_resolves_builtin_vendors() {
    let registry = MakerNoteRegistry::global().read().unwrap();
    for (make, group) in [
        ("Canon", Group::Canon),
        ("FUJIFILM", Group::Fuji),
        ("KONICA MINOLTA", Group::Minolta),
        ("NIKON CORPORATION", Group::Nikon3),
        ("OLYMPUS IMAGING CORP.", Group::Olympus),
        ("PENTAX Corporation", Group::Pentax),
        ("SAMSUNG", Group::Samsung),
        ("SIGMA", Group::Sigma),
        ("SONY", Group::Sony1),
    ] {
        assert_eq!(registry.find(make, "any").map(|d| d.group), Some(group), "{make}");
    }
    assert!(registry.find("Leica Camera AG", "M11").is_none());
}
