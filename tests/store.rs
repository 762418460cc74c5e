use std::io::SeekFrom;

use tiff_meta::{
    decoder::{Decoder, Limits},
    io::{ByteStore, FileStore, OpenMode},
    tags::{ByteOrder, Tag},
    value::{AsciiValue, Value},
    ErrorCode, MetadataTree,
};

fn sample() -> (MetadataTree, Vec<u8>) {
    let mut tree = MetadataTree::new(ByteOrder::LittleEndian);
    tree.root
        .set_value(Tag::Software, Value::Ascii(AsciiValue::new("store test")));
    let bytes = tiff_meta::encode(&tree).unwrap();
    (tree, bytes)
}

#[test]
fn decode_from_a_positioned_memory_store() {
    let (tree, bytes) = sample();
    // A container with a six byte prefix in front of the TIFF structure.
    let mut data = b"Exif\0\0".to_vec();
    data.extend_from_slice(&bytes);

    let mut store = ByteStore::memory(data);
    store.seek(SeekFrom::Start(6)).unwrap();
    let decoded = Decoder::from_store(&mut store, Limits::default()).unwrap();
    assert_eq!(decoded, tree);
}

#[test]
fn decode_from_a_file_store() {
    let (tree, bytes) = sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.tif");
    std::fs::write(&path, &bytes).unwrap();

    let mut store = ByteStore::file(&path);
    store.open(OpenMode::Read).unwrap();
    let decoded = Decoder::from_store(&mut store, Limits::default()).unwrap();
    assert_eq!(decoded, tree);
}

#[test]
fn closed_file_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ByteStore::file(dir.path().join("missing.tif"));
    let err = Decoder::from_store(&mut store, Limits::default()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotOpen);
}

#[test]
fn rewrite_through_a_temporary_file() {
    let (mut tree, bytes) = sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.tif");
    std::fs::write(&path, &bytes).unwrap();

    tree.root
        .set_value(Tag::Artist, Value::Ascii(AsciiValue::new("someone")));
    let encoded = tiff_meta::encode(&tree).unwrap();

    let mut scratch = FileStore::temporary_for(&path).unwrap();
    scratch.write(&encoded).unwrap();
    let scratch_path = scratch.path().to_path_buf();

    let mut target = ByteStore::file(&path);
    target.open(OpenMode::Read).unwrap();
    ByteStore::File(scratch).transfer_into(&mut target).unwrap();

    assert!(!scratch_path.exists());
    assert!(target.is_open());
    target.seek(SeekFrom::Start(0)).unwrap();
    let decoded = Decoder::from_store(&mut target, Limits::default()).unwrap();
    assert_eq!(decoded, tree);
}

#[test]
fn memory_into_file_replaces_the_content() {
    let (tree, bytes) = sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.tif");
    std::fs::write(&path, b"old").unwrap();

    let mut target = ByteStore::file(&path);
    ByteStore::memory(bytes.clone())
        .transfer_into(&mut target)
        .unwrap();
    assert!(!target.is_open());
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
    assert_eq!(tiff_meta::decode(&std::fs::read(&path).unwrap()).unwrap(), tree);

    // No scratch files are left behind.
    let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn file_into_memory_reads_the_file() {
    let (_, bytes) = sample();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in.tif");
    std::fs::write(&path, &bytes).unwrap();

    let mut target = ByteStore::memory(Vec::new());
    ByteStore::file(&path).transfer_into(&mut target).unwrap();
    assert_eq!(&*target.map().unwrap(), &bytes[..]);
    // The source was not temporary and still exists.
    assert!(path.exists());
}
