//! TIFF/Exif Image File Directory engine
//!
//! TIFF Structure:
//! - Header: byte order (II/MM), magic (0x002A), IFD offset
//! - IFD (Image File Directory): tag count, tags (12 bytes each), next IFD offset
//! - Tags: tag ID (2), type (2), count (4), value/offset (4)
//!
//! Values larger than four bytes live in an overflow area and the record holds
//! their offset, relative to the start of the TIFF header. Exif, GPS and
//! interoperability data are nested directories reached through pointer tags,
//! and maker notes are vendor dialects of the same layout.

mod entry;
mod makernote;
mod reader;
mod renderer;
mod structure;
mod tag;
pub mod tags;

pub use entry::{
    decode_user_comment, encode_user_comment, Entry, EntryValue, Rational, RenderedEntry,
    SRational,
};
pub use makernote::{MakerNote, MakerNoteBase, VendorKind};
pub use reader::{IfdReader, ReadScope, ReaderOptions, MAX_IFD_TAGS, MAX_VALUE_SIZE};
pub use renderer::IfdRenderer;
pub use structure::{IfdDirectory, IfdStructure};
pub use tag::IfdTag;

use byteorder::ByteOrder as _;

/// Size of one fixed directory record
pub const ENTRY_SIZE: usize = 12;

/// Byte order for reading and writing multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// "II", Intel
    LittleEndian,
    /// "MM", Motorola
    BigEndian,
}

impl ByteOrder {
    /// Parse the two-byte TIFF byte order marker
    pub fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker.get(..2)? {
            b"II" => Some(Self::LittleEndian),
            b"MM" => Some(Self::BigEndian),
            _ => None,
        }
    }

    /// The two-byte TIFF byte order marker
    pub fn marker(&self) -> &'static [u8; 2] {
        match self {
            Self::LittleEndian => b"II",
            Self::BigEndian => b"MM",
        }
    }

    pub fn read_u16(&self, data: &[u8]) -> u16 {
        match self {
            Self::LittleEndian => byteorder::LittleEndian::read_u16(data),
            Self::BigEndian => byteorder::BigEndian::read_u16(data),
        }
    }

    pub fn read_i16(&self, data: &[u8]) -> i16 {
        self.read_u16(data) as i16
    }

    pub fn read_u32(&self, data: &[u8]) -> u32 {
        match self {
            Self::LittleEndian => byteorder::LittleEndian::read_u32(data),
            Self::BigEndian => byteorder::BigEndian::read_u32(data),
        }
    }

    pub fn read_i32(&self, data: &[u8]) -> i32 {
        self.read_u32(data) as i32
    }

    pub fn push_u16(&self, out: &mut Vec<u8>, value: u16) {
        let mut buf = [0u8; 2];
        match self {
            Self::LittleEndian => byteorder::LittleEndian::write_u16(&mut buf, value),
            Self::BigEndian => byteorder::BigEndian::write_u16(&mut buf, value),
        }
        out.extend_from_slice(&buf);
    }

    pub fn push_u32(&self, out: &mut Vec<u8>, value: u32) {
        let mut buf = [0u8; 4];
        match self {
            Self::LittleEndian => byteorder::LittleEndian::write_u32(&mut buf, value),
            Self::BigEndian => byteorder::BigEndian::write_u32(&mut buf, value),
        }
        out.extend_from_slice(&buf);
    }

    /// Overwrite four bytes at `pos` with `value`
    pub(crate) fn patch_u32(&self, out: &mut [u8], pos: usize, value: u32) {
        match self {
            Self::LittleEndian => byteorder::LittleEndian::write_u32(&mut out[pos..pos + 4], value),
            Self::BigEndian => byteorder::BigEndian::write_u32(&mut out[pos..pos + 4], value),
        }
    }
}

/// TIFF field types
///
/// Codes 1..=10 are baseline TIFF; 11..=13 are recognised so their records
/// can be sized and kept byte-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
    SByte = 6,
    Undefined = 7,
    SShort = 8,
    SLong = 9,
    SRational = 10,
    Float = 11,
    Double = 12,
    Ifd = 13,
}

impl FieldType {
    /// Look up a field type by its on-disk code
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Byte,
            2 => Self::Ascii,
            3 => Self::Short,
            4 => Self::Long,
            5 => Self::Rational,
            6 => Self::SByte,
            7 => Self::Undefined,
            8 => Self::SShort,
            9 => Self::SLong,
            10 => Self::SRational,
            11 => Self::Float,
            12 => Self::Double,
            13 => Self::Ifd,
            _ => return None,
        })
    }

    /// On-disk code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Size in bytes of one element
    pub fn size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii | Self::SByte | Self::Undefined => 1,
            Self::Short | Self::SShort => 2,
            Self::Long | Self::SLong | Self::Float | Self::Ifd => 4,
            Self::Rational | Self::SRational | Self::Double => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order() {
        let be = ByteOrder::BigEndian;
        let le = ByteOrder::LittleEndian;

        assert_eq!(be.read_u16(&[0x12, 0x34]), 0x1234);
        assert_eq!(le.read_u16(&[0x34, 0x12]), 0x1234);

        assert_eq!(be.read_u32(&[0x12, 0x34, 0x56, 0x78]), 0x12345678);
        assert_eq!(le.read_u32(&[0x78, 0x56, 0x34, 0x12]), 0x12345678);

        let mut out = Vec::new();
        be.push_u16(&mut out, 0x1234);
        le.push_u32(&mut out, 0x12345678);
        assert_eq!(out, [0x12, 0x34, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_markers() {
        assert_eq!(ByteOrder::from_marker(b"II*\0"), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_marker(b"MM"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_marker(b"IM"), None);
        assert_eq!(ByteOrder::from_marker(b"I"), None);
    }

    #[test]
    fn test_field_type_codes() {
        for code in 1..=13u16 {
            assert_eq!(FieldType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(FieldType::from_code(0), None);
        assert_eq!(FieldType::from_code(14), None);
        assert_eq!(FieldType::Rational.size(), 8);
        assert_eq!(FieldType::Short.size(), 2);
    }
}
