use alloc::string::String;

use crate::abi::Endianness;
use crate::scalar::decode_unsigned;

/// How the user asked for a node to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DisplayFormat {
    /// Whatever the decoder considers best. Strings are shown as UTF-8.
    Automatic,
    /// Narrow string, one byte per character.
    Latin1String,
    /// Like `Latin1String`, plus a `text` child holding the full contents.
    SeparateLatin1String,
    /// Narrow string decoded as UTF-8.
    Utf8String,
    /// Like `Utf8String`, plus a `text` child holding the full contents.
    SeparateUtf8String,
    /// Wide string shown inline.
    Simple,
    /// Wide string, plus a `text` child holding the full contents.
    Separate,
    /// Show contiguous elements as one array descriptor instead of children.
    ArrayPlot,
    /// Show map elements as `key: value` leaves.
    CompactMap,
}

pub(crate) const STRING_FORMATS: &[DisplayFormat] = &[
    DisplayFormat::Latin1String,
    DisplayFormat::SeparateLatin1String,
    DisplayFormat::Utf8String,
    DisplayFormat::SeparateUtf8String,
];

pub(crate) const WSTRING_FORMATS: &[DisplayFormat] =
    &[DisplayFormat::Simple, DisplayFormat::Separate];

pub(crate) const ARRAY_FORMATS: &[DisplayFormat] = &[DisplayFormat::ArrayPlot];

pub(crate) const MAP_FORMATS: &[DisplayFormat] = &[DisplayFormat::CompactMap];

impl DisplayFormat {
    /// Whether the format asks for the full contents in a separate child.
    pub fn is_separate(self) -> bool {
        matches!(
            self,
            DisplayFormat::SeparateLatin1String
                | DisplayFormat::SeparateUtf8String
                | DisplayFormat::Separate
        )
    }

    fn is_latin1(self) -> bool {
        matches!(
            self,
            DisplayFormat::Latin1String | DisplayFormat::SeparateLatin1String
        )
    }
}

/// Turn raw character data into text.
///
/// `char_size` selects the code unit width: 1 byte (Latin-1 or UTF-8,
/// depending on `format`), 2 bytes (UTF-16) or 4 bytes (UTF-32). Invalid
/// sequences are replaced by U+FFFD. When `elided` is set, `...` is appended.
pub(crate) fn render_chars(
    bytes: &[u8],
    char_size: usize,
    endian: Endianness,
    format: DisplayFormat,
    elided: bool,
) -> String {
    let mut out = match char_size {
        1 if format.is_latin1() => bytes.iter().map(|&b| b as char).collect(),
        1 => String::from_utf8_lossy(bytes).into_owned(),
        2 => {
            let units = bytes
                .chunks_exact(2)
                .filter_map(|c| decode_unsigned(c, endian))
                .map(|u| u as u16);
            core::char::decode_utf16(units)
                .map(|c| c.unwrap_or(core::char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => bytes
            .chunks_exact(char_size.max(1))
            .filter_map(|c| decode_unsigned(c, endian))
            .map(|u| core::char::from_u32(u as u32).unwrap_or(core::char::REPLACEMENT_CHARACTER))
            .collect(),
    };

    if elided {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_encodings() {
        let bytes = "h\u{e9}".as_bytes();
        assert_eq!(
            render_chars(bytes, 1, Endianness::Little, DisplayFormat::Automatic, false),
            "h\u{e9}"
        );
        assert_eq!(
            render_chars(bytes, 1, Endianness::Little, DisplayFormat::Latin1String, false),
            "h\u{c3}\u{a9}"
        );
    }

    #[test]
    fn wide_encodings() {
        let utf16: alloc::vec::Vec<u8> = "hi".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(
            render_chars(&utf16, 2, Endianness::Little, DisplayFormat::Simple, true),
            "hi..."
        );

        let utf32: alloc::vec::Vec<u8> = "ok".chars().flat_map(|c| (c as u32).to_be_bytes()).collect();
        assert_eq!(
            render_chars(&utf32, 4, Endianness::Big, DisplayFormat::Simple, false),
            "ok"
        );
    }
}
