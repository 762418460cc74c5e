//! Reading and Rewriting of TIFF and Exif Metadata
//!
//! A TIFF structure (a TIFF file, the Exif block of a JPEG, the metadata of many raw formats)
//! is decoded into a [`MetadataTree`] of directories holding typed [`Value`](value::Value)s.
//! Exif, GPS, interoperability and sub-image directories become nested directories; a camera
//! maker note is decoded as a vendor directory when a registered vendor recognizes it. The tree
//! can be changed and encoded again, in the byte order it was read with.
//!
//! ```
//! use tiff_meta::tags::{ByteOrder, Tag};
//! use tiff_meta::value::{AsciiValue, Value};
//! use tiff_meta::MetadataTree;
//!
//! let mut tree = MetadataTree::new(ByteOrder::BigEndian);
//! tree.root.set_value(Tag::Make, Value::Ascii(AsciiValue::new("Canon")));
//!
//! let bytes = tiff_meta::encode(&tree)?;
//! assert_eq!(tiff_meta::decode(&bytes)?, tree);
//! # Ok::<(), tiff_meta::TiffError>(())
//! ```
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification
//! * <https://www.cipa.jp/std/documents/e/DC-008-2012_E.pdf> - The Exif specification

pub mod decoder;
mod directory;
pub mod encoder;
mod error;
pub mod io;
pub mod makernote;
pub mod tags;
pub mod value;

pub use self::directory::{
    Chain, Component, Directory, Entry, MakerNote, MakerNoteEntry, MetadataTree,
    SubDirectoryEntry,
};
pub use self::error::{DefaultCatalog, ErrorCode, MessageCatalog, TiffError, TiffResult};

/// Decode the TIFF structure at the start of `data` with the default limits.
pub fn decode(data: &[u8]) -> TiffResult<MetadataTree> {
    decoder::Decoder::new(data)?.decode()
}

/// Encode a tree into a TIFF structure in the byte order of the tree.
pub fn encode(tree: &MetadataTree) -> TiffResult<Vec<u8>> {
    encoder::TiffEncoder::encode(tree)
}
