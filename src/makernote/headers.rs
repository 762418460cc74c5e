//! Header parsers of the built-in vendors.
use super::{BaseOffset, MakerNoteHeader};
use crate::tags::{ByteOrder, Group};

pub fn canon(_: &[u8], group: Group) -> Option<MakerNoteHeader> {
    Some(MakerNoteHeader::plain(group))
}

pub fn minolta(_: &[u8], group: Group) -> Option<MakerNoteHeader> {
    Some(MakerNoteHeader::plain(group))
}

/// Offsets are relative to the start of the maker note.
pub fn samsung(_: &[u8], group: Group) -> Option<MakerNoteHeader> {
    Some(MakerNoteHeader {
        base: BaseOffset::MakerNote(0),
        ..MakerNoteHeader::plain(group)
    })
}

/// Three formats, told apart by the signature:
///
/// * no signature, a plain directory (`Nikon1`),
/// * `Nikon\0\x01\0` followed by a directory (`Nikon2`),
/// * `Nikon\0\x02` and a 10 byte header followed by a complete TIFF header, which sets the
///   byte order and the origin of all offsets (`Nikon3`).
pub fn nikon(bytes: &[u8], _: Group) -> Option<MakerNoteHeader> {
    const NIKON2: &[u8] = b"Nikon\0\x01\0";
    const NIKON3: &[u8] = b"Nikon\0\x02";

    if bytes.starts_with(NIKON2) {
        return Some(MakerNoteHeader::with_header(Group::Nikon2, &bytes[..NIKON2.len()]));
    }
    if !bytes.starts_with(NIKON3) {
        return Some(MakerNoteHeader::plain(Group::Nikon1));
    }

    let tiff = bytes.get(10..18)?;
    let byte_order = ByteOrder::from_marker(tiff)?;
    if byte_order.u16_from([tiff[2], tiff[3]]) != 42 {
        log::debug!("Nikon maker note: bad TIFF header");
        return None;
    }
    let offset = byte_order.u32_from([tiff[4], tiff[5], tiff[6], tiff[7]]);
    let start = usize::try_from(offset).ok()?.checked_add(10)?;
    if start < 18 || start > bytes.len() {
        log::debug!("Nikon maker note: directory offset {offset} out of range");
        return None;
    }

    Some(MakerNoteHeader {
        group: Group::Nikon3,
        header: bytes[..start].to_vec(),
        byte_order: Some(byte_order),
        base: BaseOffset::MakerNote(10),
        has_next: true,
    })
}

/// `OLYMP\0` with an 8 byte header, or `OLYMPUS\0` with a byte order marker and offsets from
/// the start of the maker note.
pub fn olympus(bytes: &[u8], _: Group) -> Option<MakerNoteHeader> {
    if bytes.starts_with(b"OLYMPUS\0") {
        let byte_order = ByteOrder::from_marker(bytes.get(8..10)?)?;
        let header = bytes.get(..12)?;
        return Some(MakerNoteHeader {
            byte_order: Some(byte_order),
            base: BaseOffset::MakerNote(0),
            ..MakerNoteHeader::with_header(Group::Olympus2, header)
        });
    }
    if bytes.starts_with(b"OLYMP\0") {
        return Some(MakerNoteHeader::with_header(Group::Olympus, bytes.get(..8)?));
    }
    None
}

/// `FUJIFILM` and the little endian offset of the directory. Always little endian.
pub fn fuji(bytes: &[u8], group: Group) -> Option<MakerNoteHeader> {
    if !bytes.starts_with(b"FUJIFILM") {
        return None;
    }
    let offset = bytes.get(8..12)?;
    let start = ByteOrder::LittleEndian.u32_from([offset[0], offset[1], offset[2], offset[3]]);
    let start = usize::try_from(start).ok()?;
    if start < 12 || start > bytes.len() {
        log::debug!("Fujifilm maker note: directory offset {start} out of range");
        return None;
    }
    Some(MakerNoteHeader {
        byte_order: Some(ByteOrder::LittleEndian),
        base: BaseOffset::MakerNote(0),
        ..MakerNoteHeader::with_header(group, &bytes[..start])
    })
}

/// The directory has no next pointer.
pub fn panasonic(bytes: &[u8], group: Group) -> Option<MakerNoteHeader> {
    const SIGNATURE: &[u8] = b"Panasonic\0\0\0";
    if !bytes.starts_with(SIGNATURE) {
        return None;
    }
    Some(MakerNoteHeader {
        has_next: false,
        ..MakerNoteHeader::with_header(group, SIGNATURE)
    })
}

/// `AOC\0` and a byte order marker. Some models store two spaces instead of a marker, their
/// directory has the byte order of the file.
pub fn pentax(bytes: &[u8], group: Group) -> Option<MakerNoteHeader> {
    if !bytes.starts_with(b"AOC\0") {
        return None;
    }
    let header = bytes.get(..6)?;
    Some(MakerNoteHeader {
        byte_order: ByteOrder::from_marker(&header[4..]),
        ..MakerNoteHeader::with_header(group, header)
    })
}

pub fn sigma(bytes: &[u8], group: Group) -> Option<MakerNoteHeader> {
    if !(bytes.starts_with(b"SIGMA\0\0\0") || bytes.starts_with(b"FOVEON\0\0")) {
        return None;
    }
    Some(MakerNoteHeader::with_header(group, bytes.get(..10)?))
}

/// `SONY DSC \0\0\0` with a 12 byte header (`Sony1`), or a plain directory (`Sony2`).
pub fn sony(bytes: &[u8], _: Group) -> Option<MakerNoteHeader> {
    const SIGNATURE: &[u8] = b"SONY DSC \0\0\0";
    if bytes.starts_with(SIGNATURE) {
        Some(MakerNoteHeader::with_header(Group::Sony1, SIGNATURE))
    } else {
        Some(MakerNoteHeader::plain(Group::Sony2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nikon_variants() {
        let plain = nikon(&[0; 20], Group::Nikon3).unwrap();
        assert_eq!(plain.group, Group::Nikon1);
        assert_eq!(plain.ifd_start(), 0);

        let v2 = nikon(b"Nikon\0\x01\0\0\x01", Group::Nikon3).unwrap();
        assert_eq!(v2.group, Group::Nikon2);
        assert_eq!(v2.ifd_start(), 8);
        assert_eq!(v2.base, BaseOffset::Parent);

        let mut v3 = b"Nikon\0\x02\x10\0\0MM\0\x2a\0\0\0\x08".to_vec();
        v3.extend_from_slice(&[0, 0]);
        let v3 = nikon(&v3, Group::Nikon3).unwrap();
        assert_eq!(v3.group, Group::Nikon3);
        assert_eq!(v3.ifd_start(), 18);
        assert_eq!(v3.byte_order, Some(ByteOrder::BigEndian));
        assert_eq!(v3.base, BaseOffset::MakerNote(10));
    }

    #[test]
    fn nikon3_rejects_bad_embedded_header() {
        assert!(nikon(b"Nikon\0\x02\x10\0\0XX\0\x2a\0\0\0\x08", Group::Nikon3).is_none());
        assert!(nikon(b"Nikon\0\x02\x10\0\0II\x2a\0\xff\0\0\0", Group::Nikon3).is_none());
        assert!(nikon(b"Nikon\0\x02\x10", Group::Nikon3).is_none());
    }

    #[test]
    fn olympus_variants() {
        let old = olympus(b"OLYMP\0\x01\0\0\0", Group::Olympus).unwrap();
        assert_eq!((old.group, old.ifd_start()), (Group::Olympus, 8));

        let new = olympus(b"OLYMPUS\0II\x03\0\0\0", Group::Olympus).unwrap();
        assert_eq!((new.group, new.ifd_start()), (Group::Olympus2, 12));
        assert_eq!(new.byte_order, Some(ByteOrder::LittleEndian));
        assert_eq!(new.base, BaseOffset::MakerNote(0));

        assert!(olympus(b"OLYMPIA", Group::Olympus).is_none());
    }

    #[test]
    fn fuji_offset() {
        let mut bytes = b"FUJIFILM\x0c\0\0\0".to_vec();
        bytes.extend_from_slice(&[0; 6]);
        let header = fuji(&bytes, Group::Fuji).unwrap();
        assert_eq!(header.ifd_start(), 12);
        assert_eq!(header.byte_order, Some(ByteOrder::LittleEndian));

        bytes[8] = 0xff;
        assert!(fuji(&bytes, Group::Fuji).is_none());
    }

    #[test]
    fn signatures() {
        assert!(!panasonic(b"Panasonic\0\0\0\0\0", Group::Panasonic).unwrap().has_next);
        assert!(panasonic(b"Leica", Group::Panasonic).is_none());
        assert_eq!(
            pentax(b"AOC\0MM\0\0", Group::Pentax).unwrap().byte_order,
            Some(ByteOrder::BigEndian)
        );
        assert_eq!(pentax(b"AOC\0  \0\0", Group::Pentax).unwrap().byte_order, None);
        assert_eq!(sigma(b"FOVEON\0\0\x01\0\0\0", Group::Sigma).unwrap().ifd_start(), 10);
        assert_eq!(sony(b"SONY DSC \0\0\0\0\0", Group::Sony1).unwrap().group, Group::Sony1);
        assert_eq!(sony(&[1, 0], Group::Sony1).unwrap().group, Group::Sony2);
    }
}
