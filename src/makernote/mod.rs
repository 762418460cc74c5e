//! Vendor maker notes: the registry mapping camera make and model to a header parser.
//!
//! A maker note is an opaque `UNDEFINED` value in the Exif directory. Most vendors store an IFD
//! in it, optionally after a signature, sometimes in a byte order of their own and with offsets
//! relative to some position inside the maker note. The registry picks the parser by the `Make`
//! and `Model` tags; the parser then checks the signature and describes the layout.
use std::sync::{OnceLock, RwLock};

use crate::tags::{ByteOrder, Group};

mod headers;

pub use self::headers::{
    canon, fuji, minolta, nikon, olympus, panasonic, pentax, samsung, sigma, sony,
};

/// What the offsets in a maker note directory are relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseOffset {
    /// The TIFF header of the enclosing structure.
    Parent,
    /// The start of the maker note plus a delta.
    MakerNote(u32),
}

/// The layout of a maker note, as decided by a vendor header parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MakerNoteHeader {
    pub group: Group,
    /// All bytes in front of the directory. They are written back verbatim.
    pub header: Vec<u8>,
    /// A byte order different from the enclosing structure.
    pub byte_order: Option<ByteOrder>,
    pub base: BaseOffset,
    /// Whether the directory ends with a next-directory pointer.
    pub has_next: bool,
}

impl MakerNoteHeader {
    /// A directory at the start of the maker note, sharing the offsets of the enclosing file.
    pub fn plain(group: Group) -> Self {
        MakerNoteHeader {
            group,
            header: Vec::new(),
            byte_order: None,
            base: BaseOffset::Parent,
            has_next: true,
        }
    }

    /// A directory after `header`.
    pub fn with_header(group: Group, header: &[u8]) -> Self {
        MakerNoteHeader {
            header: header.to_vec(),
            ..MakerNoteHeader::plain(group)
        }
    }

    /// The position of the directory relative to the start of the maker note.
    pub fn ifd_start(&self) -> usize {
        self.header.len()
    }
}

/// Check the signature of a maker note and describe its layout.
///
/// Receives the maker note bytes and the group the parser was registered with. Returns `None`
/// if the bytes do not belong to the vendor.
pub type Constructor = fn(&[u8], Group) -> Option<MakerNoteHeader>;

#[derive(Clone, Debug)]
pub struct MakerNoteDescriptor {
    pub model: String,
    pub constructor: Constructor,
    pub group: Group,
}

impl MakerNoteDescriptor {
    /// Run the constructor on the maker note bytes.
    pub fn header(&self, bytes: &[u8]) -> Option<MakerNoteHeader> {
        (self.constructor)(bytes, self.group)
    }
}

/// Maker note parsers by make and model pattern.
///
/// Patterns are matched case sensitively; `*` matches any run of characters. Lookups pick the
/// best make pattern, then the best model pattern registered under it; on a tie the first
/// registration wins.
#[derive(Clone, Debug, Default)]
pub struct MakerNoteRegistry {
    makes: Vec<(String, Vec<MakerNoteDescriptor>)>,
}

impl MakerNoteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        MakerNoteRegistry::default()
    }

    /// A registry with the built-in vendors.
    pub fn with_builtin() -> Self {
        let mut registry = MakerNoteRegistry::new();
        registry.register("Canon", "*", canon, Group::Canon);
        registry.register("FUJIFILM", "*", fuji, Group::Fuji);
        registry.register("KONICA MINOLTA*", "*", minolta, Group::Minolta);
        registry.register("Minolta*", "*", minolta, Group::Minolta);
        registry.register("NIKON*", "*", nikon, Group::Nikon3);
        registry.register("OLYMPUS*", "*", olympus, Group::Olympus);
        registry.register("Panasonic", "*", panasonic, Group::Panasonic);
        registry.register("PENTAX*", "*", pentax, Group::Pentax);
        registry.register("SAMSUNG*", "*", samsung, Group::Samsung);
        registry.register("SIGMA*", "*", sigma, Group::Sigma);
        registry.register("FOVEON*", "*", sigma, Group::Sigma);
        registry.register("SONY*", "*", sony, Group::Sony1);
        registry
    }

    /// The process wide registry, populated with the built-in vendors on first use.
    pub fn global() -> &'static RwLock<MakerNoteRegistry> {
        static GLOBAL: OnceLock<RwLock<MakerNoteRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| RwLock::new(MakerNoteRegistry::with_builtin()))
    }

    /// Add a parser for a make and model pattern, after all existing ones.
    pub fn register(&mut self, make: &str, model: &str, constructor: Constructor, group: Group) {
        let descriptor = MakerNoteDescriptor {
            model: model.to_owned(),
            constructor,
            group,
        };
        match self.makes.iter_mut().find(|(m, _)| m == make) {
            Some((_, models)) => models.push(descriptor),
            None => self.makes.push((make.to_owned(), vec![descriptor])),
        }
    }

    /// The parser for a camera, or `None` if no pattern matches.
    ///
    /// Trailing spaces and NULs of `make` and `model` are ignored.
    pub fn find(&self, make: &str, model: &str) -> Option<&MakerNoteDescriptor> {
        let make = trim_field(make);
        let model = trim_field(model);

        let (_, models) = best(&self.makes, |(pattern, _)| pattern, make)?;
        let descriptor = best(models, |d| &d.model, model)?;
        log::trace!("maker note for {make:?} {model:?}: {:?}", descriptor.group);
        Some(descriptor)
    }

    pub fn is_empty(&self) -> bool {
        self.makes.is_empty()
    }
}

fn trim_field(s: &str) -> &str {
    s.trim_end_matches([' ', '\0'])
}

/// The first item with the highest non-zero score.
fn best<'a, T>(items: &'a [T], pattern: impl Fn(&T) -> &String, key: &str) -> Option<&'a T> {
    let mut found = None;
    let mut best_score = 0;
    for item in items {
        let score = match_score(pattern(item), key);
        if score > best_score {
            best_score = score;
            found = Some(item);
        }
    }
    found
}

/// How well `key` matches `pattern`, `0` if it does not.
///
/// An exact match scores the length of the key plus two. A pattern with wildcards scores one
/// plus the length of its literal segments, so a bare `*` scores one and any exact match scores
/// higher than a wildcard match of the same key.
pub fn match_score(pattern: &str, key: &str) -> usize {
    if !pattern.contains('*') {
        return if pattern == key { key.len() + 2 } else { 0 };
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return 0,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return 0,
    };

    if !key.starts_with(first) {
        return 0;
    }
    let mut remaining = &key[first.len()..];
    if remaining.len() < last.len() || !remaining.ends_with(last) {
        return 0;
    }
    remaining = &remaining[..remaining.len() - last.len()];

    let mut score = 1 + first.len() + last.len();
    for segment in middle.iter().filter(|s| !s.is_empty()) {
        match remaining.find(segment) {
            Some(at) => {
                remaining = &remaining[at + segment.len()..];
                score += segment.len();
            }
            None => return 0,
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(_: &[u8], group: Group) -> Option<MakerNoteHeader> {
        Some(MakerNoteHeader::plain(group))
    }

    #[test]
    fn scores() {
        assert_eq!(match_score("Canon", "Canon"), 7);
        assert_eq!(match_score("Canon", "Canon EOS"), 0);
        assert_eq!(match_score("*", "anything"), 1);
        assert_eq!(match_score("*", ""), 1);
        assert_eq!(match_score("EOS *", "EOS R5"), 5);
        assert_eq!(match_score("EOS *", "PowerShot"), 0);
        assert_eq!(match_score("*D", "D850"), 0);
        assert_eq!(match_score("*D", "ND"), 2);
        assert_eq!(match_score("N*K*N", "NIKON"), 4);
        assert_eq!(match_score("N*K*N", "NIXON"), 0);
        // The prefix and suffix may not overlap.
        assert_eq!(match_score("AB*BC", "ABC"), 0);
        assert_eq!(match_score("canon", "Canon"), 0);
    }

    #[test]
    fn specific_model_beats_wildcard() {
        let mut registry = MakerNoteRegistry::new();
        registry.register("Canon", "*", dummy, Group::Canon);
        registry.register("Canon", "EOS *", dummy, Group::Unknown(0x100));

        let found = registry.find("Canon", "EOS R5").unwrap();
        assert_eq!(found.group, Group::Unknown(0x100));
        let found = registry.find("Canon", "PowerShot G7").unwrap();
        assert_eq!(found.group, Group::Canon);
    }

    #[test]
    fn ties_keep_first_registration() {
        let mut registry = MakerNoteRegistry::new();
        registry.register("ACME", "*", dummy, Group::Unknown(1));
        registry.register("ACME", "*", dummy, Group::Unknown(2));
        assert_eq!(registry.find("ACME", "X").unwrap().group, Group::Unknown(1));
    }

    #[test]
    fn make_is_matched_before_model() {
        let mut registry = MakerNoteRegistry::new();
        registry.register("NIKON*", "*", dummy, Group::Nikon3);
        registry.register("NIKON CORPORATION", "D1", dummy, Group::Nikon1);

        // The exact make wins, but has no model matching `D850`.
        assert!(registry.find("NIKON CORPORATION", "D850").is_none());
        assert_eq!(
            registry.find("NIKON", "D850").map(|d| d.group),
            Some(Group::Nikon3)
        );
    }

    #[test]
    fn fields_are_trimmed() {
        let registry = MakerNoteRegistry::with_builtin();
        let found = registry.find("Canon\0", "Canon EOS 5D  ").unwrap();
        assert_eq!(found.group, Group::Canon);
        assert!(registry.find("Leica", "M").is_none());
        assert!(registry.find("canon", "x").is_none());
    }

    #[test]
    fn global_registry_is_extensible() {
        let group = Group::Unknown(0x7f01);
        MakerNoteRegistry::global()
            .write()
            .unwrap()
            .register("Test Vendor", "Model 1", dummy, group);
        let registry = MakerNoteRegistry::global().read().unwrap();
        assert_eq!(registry.find("Test Vendor", "Model 1").unwrap().group, group);
        assert!(registry.find("Canon", "x").is_some());
    }
}
