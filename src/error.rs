use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
use std::num::TryFromIntError;

macro_rules! error_codes {
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident {
            $($(#[$ident_attr:meta])* $code:ident = $template:literal,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
        #[non_exhaustive]
        $vis enum $name {
            $($(#[$ident_attr])* $code,)*
        }

        impl $name {
            /// All codes, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$code,)*];

            /// The default (English) message template of this code.
            ///
            /// Placeholders `%1`, `%2` and `%3` are replaced by the positional arguments of the
            /// error.
            pub const fn template(self) -> &'static str {
                match self {
                    $( $name::$code => $template, )*
                }
            }
        }
    };
}

error_codes! {
/// Stable identifiers of every failure the codec reports.
pub enum ErrorCode {
    /// An I/O error without more specific context.
    Io = "I/O error: %1",
    OpenFailed = "%1: Failed to open the data source in %2 mode: %3",
    NotOpen = "%1: The data source is not open",
    ReadFailed = "%1: Failed to read from the data source: %2",
    WriteFailed = "%1: Failed to write to the data source: %2",
    SeekFailed = "%1: Failed to seek to position %2: %3",
    MapFailed = "%1: Failed to map the data source into memory: %2",
    TransferFailed = "%1: Failed to transfer the data to %2: %3",
    TemporaryFailed = "%1: Failed to create a temporary file: %2",

    NotATiff = "The data does not start with a TIFF header",
    BigTiffUnsupported = "BigTIFF data is not supported",
    Truncated = "Truncated data: %1 bytes required at offset %2, only %3 bytes available",
    OffsetOutOfBounds = "Offset %1 of tag %2 points outside of the data (%3 bytes)",
    CycleInOffsets = "Directory at offset %1 is referenced more than once",
    LimitsExceeded = "Decoding limit exceeded: %1",
    EntryCountOverflow = "A directory can hold at most 65535 entries, found %1",
    OffsetOverflow = "Offset %1 does not fit into a 32-bit TIFF offset",
    UnsupportedType = "Type %1 of tag %2 cannot be written to a TIFF directory",

    InvalidValue = "Invalid value for type %1: %2",
    InvalidTypeName = "Invalid type name: %1",
    InvalidDate = "Invalid date: %1",
    InvalidTime = "Invalid time: %1",
    InvalidCharset = "Invalid character set: %1",
    TextEncoding = "Cannot encode the text of a %1 value: %2",
    ConversionFailed = "Cannot convert component %1 of a %2 value to %3",
    ValueOutOfRange = "Value %1 of type %2 is outside of the representable range",

    XmpToolkit = "XMP toolkit error: %1",
    XmpPropertyInvalid = "Invalid XMP property %1: %2",
}
}

/// A source of message templates, used to render errors in another language.
pub trait MessageCatalog {
    /// The template for `code`, or `None` to fall back to the default template.
    fn template(&self, code: ErrorCode) -> Option<&str>;
}

/// The built-in English templates.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCatalog;

impl MessageCatalog for DefaultCatalog {
    fn template(&self, code: ErrorCode) -> Option<&str> {
        Some(code.template())
    }
}

impl MessageCatalog for HashMap<ErrorCode, String> {
    fn template(&self, code: ErrorCode) -> Option<&str> {
        self.get(&code).map(String::as_str)
    }
}

/// The maximum number of positional arguments an error carries.
pub const MAX_ARGS: usize = 3;

/// An error of the metadata codec.
///
/// Consists of a stable [`ErrorCode`] and up to three positional string arguments which are
/// substituted into the code's message template when the error is displayed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiffError {
    code: ErrorCode,
    args: Vec<String>,
}

impl TiffError {
    pub fn new(code: ErrorCode) -> Self {
        TiffError {
            code,
            args: Vec::new(),
        }
    }

    /// Append a positional argument. Arguments beyond the third are dropped.
    pub fn arg(mut self, arg: impl fmt::Display) -> Self {
        debug_assert!(self.args.len() < MAX_ARGS, "too many error arguments");
        if self.args.len() < MAX_ARGS {
            self.args.push(arg.to_string());
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Render the message through `catalog`, falling back to the default template when the
    /// catalog has no entry for this code.
    pub fn render(&self, catalog: &dyn MessageCatalog) -> String {
        let template = catalog
            .template(self.code)
            .unwrap_or_else(|| self.code.template());
        substitute(template, &self.args)
    }
}

fn substitute(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            if let Some(&d) = chars.peek() {
                if let Some(n) = d.to_digit(10).filter(|n| (1..=MAX_ARGS as u32).contains(n)) {
                    chars.next();
                    if let Some(arg) = args.get(n as usize - 1) {
                        out.push_str(arg);
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }

    out
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.render(&DefaultCatalog))
    }
}

impl Error for TiffError {}

impl From<io::Error> for TiffError {
    fn from(err: io::Error) -> TiffError {
        TiffError::new(ErrorCode::Io).arg(err)
    }
}

impl From<TryFromIntError> for TiffError {
    fn from(err: TryFromIntError) -> TiffError {
        TiffError::new(ErrorCode::LimitsExceeded).arg(err)
    }
}

/// Result of a metadata decoding, encoding or I/O operation
pub type TiffResult<T> = Result<T, TiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_positional_arguments() {
        let err = TiffError::new(ErrorCode::Truncated)
            .arg(12)
            .arg(0x40)
            .arg(8);
        assert_eq!(
            err.to_string(),
            "Truncated data: 12 bytes required at offset 64, only 8 bytes available"
        );
    }

    #[test]
    fn missing_arguments_render_empty() {
        let err = TiffError::new(ErrorCode::InvalidDate);
        assert_eq!(err.to_string(), "Invalid date: ");
    }

    #[test]
    fn localized_catalog_with_fallback() {
        let mut catalog = HashMap::new();
        catalog.insert(ErrorCode::InvalidDate, "Ungültiges Datum: %1".to_string());

        let err = TiffError::new(ErrorCode::InvalidDate).arg("2021-13-99");
        assert_eq!(err.render(&catalog), "Ungültiges Datum: 2021-13-99");

        let other = TiffError::new(ErrorCode::InvalidTime).arg("25:00:00");
        assert_eq!(other.render(&catalog), "Invalid time: 25:00:00");
    }

    #[test]
    fn equality_is_structural() {
        let a = TiffError::new(ErrorCode::CycleInOffsets).arg(8);
        let b = TiffError::new(ErrorCode::CycleInOffsets).arg("8");
        assert_eq!(a, b);
        assert_ne!(a, TiffError::new(ErrorCode::CycleInOffsets).arg(10));
    }

    #[test]
    fn every_code_has_a_template() {
        for code in ErrorCode::ALL {
            assert!(!code.template().is_empty());
        }
    }
}
