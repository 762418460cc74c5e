use tiff_meta::{
    makernote::{nikon, MakerNoteRegistry},
    tags::{ByteOrder, Group, Tag},
    value::{CharsetId, CommentValue, DateValue, TypeId, Value},
    ErrorCode,
};

#[test]
fn make_entry_renders_as_text() {
    #[rustfmt::skip]
    let bytes = [
        b'I', b'I', 42, 0, 8, 0, 0, 0,
        1, 0,
        0x0f, 0x01, 2, 0, 6, 0, 0, 0, 26, 0, 0, 0,
        0, 0, 0, 0,
        b'C', b'a', b'n', b'o', b'n', 0,
    ];
    let tree = tiff_meta::decode(&bytes).unwrap();
    assert_eq!(tree.root.len(), 1);

    let value = tree.root.value(Tag::Make).unwrap();
    assert_eq!(value.type_id(), TypeId::AsciiString);
    assert_eq!(value.count(), 6);
    assert_eq!(value.to_string(), "Canon");
}

#[test]
fn unmatched_make_has_no_maker_note() {
    let mut registry = MakerNoteRegistry::new();
    registry.register("Nikon", "*", nikon, Group::Nikon3);
    assert!(registry.find("Canon", "Canon EOS R5").is_none());
    assert!(registry.find("Nikon", "Z 8").is_some());
}

#[test]
fn dates_are_validated() {
    let value = Value::from_text(TypeId::Date, "2021:01:05").unwrap();
    match &value {
        Value::Date(date) => {
            assert_eq!((date.year(), date.month(), date.day()), (2021, 1, 5));
        }
        other => panic!("unexpected value {other:?}"),
    }
    assert_eq!(value.to_string(), "2021-01-05");

    let err = Value::from_text(TypeId::Date, "2021-13-99").unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidDate);

    let mut date = DateValue::new(2020, 2, 29).unwrap();
    assert!(date.read_str("2021-02-29").is_err());
    assert_eq!((date.year(), date.month(), date.day()), (2020, 2, 29));
}

#[test]
fn unicode_comments_keep_code_and_text() {
    let text = "charset=Unicode Grüße aus Köln ✓";
    let comment = CommentValue::new(text).unwrap();
    assert_eq!(&comment.bytes()[..8], b"UNICODE\0");
    assert_eq!(comment.charset(), CharsetId::Unicode);

    for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let value = Value::Comment(comment.clone());
        let bytes = value.to_bytes(byte_order);
        assert_eq!(&bytes[..8], b"UNICODE\0");

        let decoded = Value::from_bytes(TypeId::Comment, &bytes, byte_order).unwrap();
        assert_eq!(decoded.to_string(), text);
        match decoded {
            Value::Comment(c) => assert_eq!(c.text().unwrap(), "Grüße aus Köln ✓"),
            other => panic!("unexpected value {other:?}"),
        }
    }
}

#[test]
fn user_comment_survives_the_tree() {
    let comment = CommentValue::new("charset=Ascii hello").unwrap();
    let mut tree = tiff_meta::MetadataTree::new(ByteOrder::BigEndian);
    tree.root
        .set_value(Tag::UserComment, Value::Comment(comment.clone()));

    let decoded = tiff_meta::decode(&tiff_meta::encode(&tree).unwrap()).unwrap();
    let stored = decoded.root.value(Tag::UserComment).unwrap();
    assert_eq!(stored.type_id(), TypeId::Undefined);

    let reread = stored
        .reinterpret(TypeId::Comment, decoded.byte_order)
        .unwrap();
    assert_eq!(
        reread.to_bytes(decoded.byte_order),
        Value::Comment(comment).to_bytes(decoded.byte_order)
    );
    assert_eq!(reread.to_string(), "charset=Ascii hello");
}

#[test]
fn text_and_binary_forms_agree() {
    for (type_id, text) in [
        (TypeId::UnsignedShort, "1 2 65535"),
        (TypeId::SignedLong, "-5 7"),
        (TypeId::UnsignedRational, "72/1 300/2"),
        (TypeId::SignedRational, "-1/3"),
        (TypeId::TiffDouble, "0.5 -2.25"),
        (TypeId::AsciiString, "text"),
        (TypeId::Time, "10:20:30+02:00"),
    ] {
        let value = Value::from_text(type_id, text).unwrap();
        for byte_order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let bytes = value.to_bytes(byte_order);
            assert_eq!(bytes.len(), value.size(), "{type_id}");
            let decoded = Value::from_bytes(type_id, &bytes, byte_order).unwrap();
            assert_eq!(decoded.to_string(), value.to_string(), "{type_id}");
        }
    }
}

#[test]
fn conversions() {
    let value = Value::from_text(TypeId::UnsignedRational, "7/2 1/0").unwrap();
    assert_eq!(value.to_i64(0).unwrap(), 3);
    assert_eq!(value.to_f64(0).unwrap(), 3.5);
    assert_eq!(value.to_rational(0).unwrap(), (7, 2));
    assert_eq!(value.to_f64(1).unwrap_err().code(), ErrorCode::ConversionFailed);
    assert_eq!(value.to_i64(2).unwrap_err().code(), ErrorCode::ConversionFailed);

    let invalid = Value::from_text(TypeId::UnsignedShort, "1 x").unwrap_err();
    assert_eq!(invalid.code(), ErrorCode::InvalidValue);
    assert_eq!(invalid.args(), ["Short", "x"]);
}
