//! XMP property values and the boundary to an external XMP toolkit.
//!
//! The toolkit parses and serializes packets. This module only consumes and produces the
//! ordered list of properties the toolkit exchanges, grouping array items and language
//! qualifiers into typed values.
use std::fmt;

use bitflags::bitflags;

use super::Value;
use crate::error::{ErrorCode, TiffError, TiffResult};

/// Container type of an XMP array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XmpArrayType {
    Alt,
    Bag,
    Seq,
}

impl XmpArrayType {
    pub fn name(self) -> &'static str {
        match self {
            XmpArrayType::Alt => "Alt",
            XmpArrayType::Bag => "Bag",
            XmpArrayType::Seq => "Seq",
        }
    }

    fn options(self) -> XmpOptions {
        match self {
            XmpArrayType::Alt => {
                XmpOptions::ARRAY | XmpOptions::ARRAY_ORDERED | XmpOptions::ARRAY_ALTERNATE
            }
            XmpArrayType::Bag => XmpOptions::ARRAY,
            XmpArrayType::Seq => XmpOptions::ARRAY | XmpOptions::ARRAY_ORDERED,
        }
    }

    fn from_options(options: XmpOptions) -> Option<Self> {
        if !options.contains(XmpOptions::ARRAY) {
            None
        } else if options.contains(XmpOptions::ARRAY_ALTERNATE) {
            Some(XmpArrayType::Alt)
        } else if options.contains(XmpOptions::ARRAY_ORDERED) {
            Some(XmpArrayType::Seq)
        } else {
            Some(XmpArrayType::Bag)
        }
    }
}

/// Structural attribute of a text property, given as a `type=` prefix in the text form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XmpStructure {
    Array(XmpArrayType),
    Struct,
}

/// A simple XMP property value, optionally marking the property as an (empty) container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmpTextValue {
    text: String,
    structure: Option<XmpStructure>,
}

impl XmpTextValue {
    pub fn new(text: &str) -> Self {
        XmpTextValue {
            text: text.to_string(),
            structure: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn structure(&self) -> Option<XmpStructure> {
        self.structure
    }

    /// Read `[type=Alt|Bag|Seq|Struct ]text`. The type name may be quoted.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let (structure, text) = match text.strip_prefix("type=") {
            Some(rest) => {
                let (name, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let structure = match name.trim_matches('"') {
                    "Alt" => XmpStructure::Array(XmpArrayType::Alt),
                    "Bag" => XmpStructure::Array(XmpArrayType::Bag),
                    "Seq" => XmpStructure::Array(XmpArrayType::Seq),
                    "Struct" => XmpStructure::Struct,
                    other => {
                        return Err(TiffError::new(ErrorCode::InvalidValue)
                            .arg("XmpText")
                            .arg(format_args!("type={other}")))
                    }
                };
                (Some(structure), text)
            }
            None => (None, text),
        };
        self.structure = structure;
        self.text = text.to_string();
        Ok(())
    }

    pub fn count(&self) -> usize {
        usize::from(!self.text.is_empty())
    }
}

impl fmt::Display for XmpTextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.structure {
            Some(XmpStructure::Array(kind)) => write!(f, "type=\"{}\" ", kind.name())?,
            Some(XmpStructure::Struct) => f.write_str("type=\"Struct\" ")?,
            None => {}
        }
        f.write_str(&self.text)
    }
}

/// The items of an XMP `Alt`, `Bag` or `Seq` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmpArrayValue {
    kind: XmpArrayType,
    items: Vec<String>,
}

impl XmpArrayValue {
    pub fn new(kind: XmpArrayType) -> Self {
        XmpArrayValue {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> XmpArrayType {
        self.kind
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Append one item.
    pub fn read_str(&mut self, text: &str) {
        self.items.push(text.to_string());
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

impl fmt::Display for XmpArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.items.join(", "))
    }
}

pub const X_DEFAULT: &str = "x-default";

/// Alternative texts keyed by language, `x-default` first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LangAltValue {
    entries: Vec<(String, String)>,
}

impl LangAltValue {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == lang)
            .map(|(_, text)| text.as_str())
    }

    /// Set the text of a language, replacing an existing entry.
    pub fn set(&mut self, lang: &str, text: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(l, _)| l == lang) {
            entry.1 = text.to_string();
        } else if lang == X_DEFAULT {
            self.entries.insert(0, (lang.to_string(), text.to_string()));
        } else {
            self.entries.push((lang.to_string(), text.to_string()));
        }
    }

    /// Read `[lang="x" ]text`. Without a language, the text is the `x-default` entry.
    pub fn read_str(&mut self, text: &str) -> TiffResult<()> {
        let invalid = || {
            TiffError::new(ErrorCode::InvalidValue)
                .arg("LangAlt")
                .arg(text)
        };

        match text.strip_prefix("lang=") {
            Some(rest) => {
                let (lang, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let lang = lang.trim_matches('"');
                let valid = !lang.is_empty()
                    && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
                if !valid {
                    return Err(invalid());
                }
                self.set(lang, text);
            }
            None => self.set(X_DEFAULT, text),
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for LangAltValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (lang, text)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "lang=\"{lang}\" {text}")?;
        }
        Ok(())
    }
}

bitflags! {
    /// Property options as reported by the XMP toolkit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct XmpOptions: u32 {
        /// The value is a URI.
        const URI = 0x0000_0002;
        const HAS_QUALIFIERS = 0x0000_0010;
        /// The property is a qualifier of the preceding node.
        const IS_QUALIFIER = 0x0000_0020;
        /// The property has an `xml:lang` qualifier.
        const HAS_LANG = 0x0000_0040;
        const HAS_TYPE = 0x0000_0080;
        const STRUCT = 0x0000_0100;
        const ARRAY = 0x0000_0200;
        const ARRAY_ORDERED = 0x0000_0400;
        const ARRAY_ALTERNATE = 0x0000_0800;
        /// An alternative array of language tagged texts.
        const ARRAY_ALT_TEXT = 0x0000_1000;
    }
}

/// One node of an XMP packet, in the order the toolkit visits them.
///
/// Array items use the path of their array with a 1-based index, e.g. `dc:subject[2]`;
/// language qualifiers are `dc:title[1]/?xml:lang`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmpProperty {
    pub namespace: String,
    pub path: String,
    pub value: String,
    pub options: XmpOptions,
}

impl XmpProperty {
    pub fn new(namespace: &str, path: &str, value: &str, options: XmpOptions) -> Self {
        XmpProperty {
            namespace: namespace.to_string(),
            path: path.to_string(),
            value: value.to_string(),
            options,
        }
    }
}

/// Parser and serializer of XMP packets.
pub trait XmpToolkit {
    fn decode(&self, packet: &str) -> TiffResult<Vec<XmpProperty>>;

    fn encode(&self, properties: &[XmpProperty]) -> TiffResult<String>;
}

/// A typed XMP property.
#[derive(Clone, Debug, PartialEq)]
pub struct XmpDatum {
    pub namespace: String,
    pub path: String,
    pub value: Value,
}

const LANG_QUALIFIER: &str = "/?xml:lang";

fn item_path(array: &str, index: usize) -> String {
    format!("{array}[{index}]")
}

fn invalid_property(path: &str, reason: &str) -> TiffError {
    TiffError::new(ErrorCode::XmpPropertyInvalid)
        .arg(path)
        .arg(reason)
}

/// Parse a packet with `toolkit` and group its properties into typed data.
pub fn decode_packet(toolkit: &dyn XmpToolkit, packet: &str) -> TiffResult<Vec<XmpDatum>> {
    let properties = toolkit.decode(packet)?;
    group_properties(&properties)
}

/// Group an ordered property list into typed data.
///
/// Arrays whose items are simple texts become `XmpArray` or `LangAlt` values. Arrays with
/// nested containers are kept as an empty container marker followed by their nodes.
pub fn group_properties(properties: &[XmpProperty]) -> TiffResult<Vec<XmpDatum>> {
    let mut data = Vec::new();
    let mut rest = properties;

    while let Some((head, tail)) = rest.split_first() {
        rest = tail;

        if head.options.contains(XmpOptions::IS_QUALIFIER) {
            log::debug!("Ignoring XMP qualifier {}", head.path);
            continue;
        }

        let kind = XmpArrayType::from_options(head.options);
        let value = match kind {
            Some(kind) => {
                let members = rest
                    .iter()
                    .take_while(|p| p.path.starts_with(&format!("{}[", head.path)))
                    .count();
                let (items, after) = rest.split_at(members);

                match collect_items(head, kind, items)? {
                    Some(value) => {
                        rest = after;
                        value
                    }
                    None => {
                        let mut marker = XmpTextValue::default();
                        marker.structure = Some(XmpStructure::Array(kind));
                        Value::XmpText(marker)
                    }
                }
            }
            None => {
                let mut text = XmpTextValue::new(&head.value);
                if head.options.contains(XmpOptions::STRUCT) {
                    text.structure = Some(XmpStructure::Struct);
                }
                Value::XmpText(text)
            }
        };

        data.push(XmpDatum {
            namespace: head.namespace.clone(),
            path: head.path.clone(),
            value,
        });
    }

    Ok(data)
}

/// Collect the items of a simple array, `None` if an item is a container itself.
fn collect_items(
    head: &XmpProperty,
    kind: XmpArrayType,
    items: &[XmpProperty],
) -> TiffResult<Option<Value>> {
    let alt_text = head.options.contains(XmpOptions::ARRAY_ALT_TEXT);
    let mut array = XmpArrayValue::new(kind);
    let mut lang_alt = LangAltValue::default();
    let mut index = 0;
    let mut iter = items.iter().peekable();

    while let Some(item) = iter.next() {
        if item
            .options
            .intersects(XmpOptions::STRUCT | XmpOptions::ARRAY)
        {
            return Ok(None);
        }
        if item.options.contains(XmpOptions::IS_QUALIFIER) {
            return Err(invalid_property(&item.path, "qualifier without an array item"));
        }

        index += 1;
        if item.path != item_path(&head.path, index) {
            // Item paths of nested nodes, e.g. `a[1]/b:c`, also end up here.
            if item.path.starts_with(&item_path(&head.path, index)) {
                return Ok(None);
            }
            return Err(invalid_property(&item.path, "array items out of order"));
        }

        let mut lang = None;
        while let Some(qualifier) =
            iter.next_if(|p| p.options.contains(XmpOptions::IS_QUALIFIER))
        {
            if qualifier.path == format!("{}{LANG_QUALIFIER}", item.path) {
                lang = Some(qualifier.value.as_str());
            } else {
                log::debug!("Ignoring XMP qualifier {}", qualifier.path);
            }
        }

        if alt_text {
            lang_alt.set(lang.unwrap_or(X_DEFAULT), &item.value);
        } else {
            array.read_str(&item.value);
        }
    }

    Ok(Some(if alt_text {
        Value::LangAlt(lang_alt)
    } else {
        Value::XmpArray(array)
    }))
}

/// Flatten typed data into the property list of a packet.
pub fn flatten_data(data: &[XmpDatum]) -> Vec<XmpProperty> {
    let mut properties = Vec::new();

    for datum in data {
        let ns = datum.namespace.as_str();
        let path = datum.path.as_str();

        match &datum.value {
            Value::XmpArray(array) => {
                properties.push(XmpProperty::new(ns, path, "", array.kind().options()));
                for (i, item) in array.items().iter().enumerate() {
                    let item_path = item_path(path, i + 1);
                    properties.push(XmpProperty::new(ns, &item_path, item, XmpOptions::empty()));
                }
            }
            Value::LangAlt(alt) => {
                let options = XmpArrayType::Alt.options() | XmpOptions::ARRAY_ALT_TEXT;
                properties.push(XmpProperty::new(ns, path, "", options));
                for (i, (lang, text)) in alt.entries().iter().enumerate() {
                    let item_path = item_path(path, i + 1);
                    let item_options = XmpOptions::HAS_QUALIFIERS | XmpOptions::HAS_LANG;
                    properties.push(XmpProperty::new(ns, &item_path, text, item_options));
                    properties.push(XmpProperty::new(
                        ns,
                        &format!("{item_path}{LANG_QUALIFIER}"),
                        lang,
                        XmpOptions::IS_QUALIFIER,
                    ));
                }
            }
            Value::XmpText(text) => {
                let options = match text.structure() {
                    Some(XmpStructure::Array(kind)) => kind.options(),
                    Some(XmpStructure::Struct) => XmpOptions::STRUCT,
                    None => XmpOptions::empty(),
                };
                properties.push(XmpProperty::new(ns, path, text.text(), options));
            }
            other => {
                let text = other.to_string();
                properties.push(XmpProperty::new(ns, path, &text, XmpOptions::empty()));
            }
        }
    }

    properties
}

/// Serialize typed data with `toolkit`.
pub fn encode_packet(toolkit: &dyn XmpToolkit, data: &[XmpDatum]) -> TiffResult<String> {
    toolkit.encode(&flatten_data(data))
}
