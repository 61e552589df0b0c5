//! Typed directory entries and their binary rendering

use super::{renderer::IfdRenderer, ByteOrder, FieldType, IfdStructure, MakerNote};
use crate::error::{Error, Result};

/// Charset prefixes of the Exif UserComment field
const USER_COMMENT_ASCII: &[u8; 8] = b"ASCII\0\0\0";
const USER_COMMENT_UNICODE: &[u8; 8] = b"UNICODE\0";
const USER_COMMENT_UNDEFINED: &[u8; 8] = &[0u8; 8];

/// Unsigned TIFF rational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float, `None` when the denominator is zero
    pub fn to_f64(&self) -> Option<f64> {
        (self.denominator != 0).then(|| self.numerator as f64 / self.denominator as f64)
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Signed TIFF rational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SRational {
    pub numerator: i32,
    pub denominator: i32,
}

impl SRational {
    pub fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        (self.denominator != 0).then(|| self.numerator as f64 / self.denominator as f64)
    }
}

impl std::fmt::Display for SRational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// The value held by a directory entry
///
/// Values are not validated against their tag: whatever the caller stores is
/// what gets rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Byte(u8),
    SByte(i8),
    Short(u16),
    SShort(i16),
    Long(u32),
    SLong(i32),
    Rational(Rational),
    SRational(SRational),
    ByteArray(Vec<u8>),
    SByteArray(Vec<i8>),
    ShortArray(Vec<u16>),
    SShortArray(Vec<i16>),
    LongArray(Vec<u32>),
    SLongArray(Vec<i32>),
    RationalArray(Vec<Rational>),
    SRationalArray(Vec<SRational>),
    /// NUL-terminated text; the terminator is added on render
    Ascii(String),
    /// Opaque bytes
    Undefined(Vec<u8>),
    /// Exif UserComment with an ASCII or UNICODE charset prefix
    UserComment(String),
    /// Values kept byte-exact in their original type (floats, doubles, IFD offsets)
    Raw {
        field_type: FieldType,
        count: u32,
        data: Vec<u8>,
    },
    /// Pointer to a nested directory chain
    SubIfd {
        field_type: FieldType,
        count: u32,
        structure: IfdStructure,
    },
    /// Array of pointers to nested directory chains (TIFF SubIFDs)
    SubIfdArray {
        field_type: FieldType,
        structures: Vec<IfdStructure>,
    },
    /// JPEG thumbnail referenced by JPEGInterchangeFormat
    ThumbnailData(Vec<u8>),
    /// Strip payloads referenced by StripOffsets, always rendered as LONG offsets
    StripOffsets(Vec<Vec<u8>>),
    MakerNote(MakerNote),
}

impl EntryValue {
    /// Integer value of a BYTE, SHORT or LONG scalar
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Byte(v) => Some(*v as u32),
            Self::Short(v) => Some(*v as u32),
            Self::Long(v) => Some(*v),
            Self::ByteArray(v) if v.len() == 1 => Some(v[0] as u32),
            Self::ShortArray(v) if v.len() == 1 => Some(v[0] as u32),
            Self::LongArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Ascii(s) | Self::UserComment(s) => Some(s),
            Self::Raw {
                field_type: FieldType::Ascii,
                data,
                ..
            } => {
                let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
                std::str::from_utf8(&data[..end]).ok()
            }
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<Rational> {
        match self {
            Self::Rational(r) => Some(*r),
            Self::RationalArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_rationals(&self) -> Option<&[Rational]> {
        match self {
            Self::Rational(r) => Some(std::slice::from_ref(r)),
            Self::RationalArray(v) => Some(v),
            _ => None,
        }
    }

    /// Nested structure of a sub-IFD or maker note
    pub fn as_structure(&self) -> Option<&IfdStructure> {
        match self {
            Self::SubIfd { structure, .. } => Some(structure),
            Self::MakerNote(note) => Some(&note.structure),
            _ => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut IfdStructure> {
        match self {
            Self::SubIfd { structure, .. } => Some(structure),
            Self::MakerNote(note) => Some(&mut note.structure),
            _ => None,
        }
    }
}

/// A tagged directory entry
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub tag: u16,
    pub value: EntryValue,
}

/// The fixed record fields of a rendered entry plus its overflow payload
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEntry {
    pub field_type: u16,
    pub count: u32,
    /// The record's four value bytes (inline data or an offset)
    pub value: [u8; 4],
    /// Bytes to place at the offset handed to [`Entry::render`]
    pub overflow: Vec<u8>,
}

impl RenderedEntry {
    /// Inline when the payload fits four bytes, otherwise point at `offset`
    fn place(field_type: FieldType, count: u32, order: ByteOrder, offset: u32, payload: Vec<u8>) -> Self {
        if payload.len() <= 4 {
            let mut value = [0u8; 4];
            value[..payload.len()].copy_from_slice(&payload);
            Self {
                field_type: field_type.code(),
                count,
                value,
                overflow: Vec::new(),
            }
        } else {
            Self::pointer(field_type, count, order, offset, payload)
        }
    }

    fn pointer(field_type: FieldType, count: u32, order: ByteOrder, offset: u32, overflow: Vec<u8>) -> Self {
        let mut value = [0u8; 4];
        order.patch_u32(&mut value, 0, offset);
        Self {
            field_type: field_type.code(),
            count,
            value,
            overflow,
        }
    }
}

impl Entry {
    pub fn new(tag: u16, value: EntryValue) -> Self {
        Self { tag, value }
    }

    /// Render the entry for a record whose overflow would start at `offset`
    ///
    /// `offset` is relative to the TIFF header the surrounding directory is
    /// read against. Nested structures are laid out starting at `offset`.
    pub fn render(&self, order: ByteOrder, offset: u32) -> Result<RenderedEntry> {
        use EntryValue as V;

        let (field_type, count, payload) = match &self.value {
            V::Byte(v) => (FieldType::Byte, 1, vec![*v]),
            V::SByte(v) => (FieldType::SByte, 1, vec![*v as u8]),
            V::Short(v) => (FieldType::Short, 1, shorts(order, [*v])),
            V::SShort(v) => (FieldType::SShort, 1, shorts(order, [*v as u16])),
            V::Long(v) => (FieldType::Long, 1, longs(order, [*v])),
            V::SLong(v) => (FieldType::SLong, 1, longs(order, [*v as u32])),
            V::Rational(r) => (
                FieldType::Rational,
                1,
                longs(order, [r.numerator, r.denominator]),
            ),
            V::SRational(r) => (
                FieldType::SRational,
                1,
                longs(order, [r.numerator as u32, r.denominator as u32]),
            ),
            V::ByteArray(v) => (FieldType::Byte, v.len(), v.clone()),
            V::SByteArray(v) => (FieldType::SByte, v.len(), v.iter().map(|b| *b as u8).collect()),
            V::ShortArray(v) => (FieldType::Short, v.len(), shorts(order, v.iter().copied())),
            V::SShortArray(v) => (
                FieldType::SShort,
                v.len(),
                shorts(order, v.iter().map(|s| *s as u16)),
            ),
            V::LongArray(v) => (FieldType::Long, v.len(), longs(order, v.iter().copied())),
            V::SLongArray(v) => (
                FieldType::SLong,
                v.len(),
                longs(order, v.iter().map(|l| *l as u32)),
            ),
            V::RationalArray(v) => (
                FieldType::Rational,
                v.len(),
                longs(order, v.iter().flat_map(|r| [r.numerator, r.denominator])),
            ),
            V::SRationalArray(v) => (
                FieldType::SRational,
                v.len(),
                longs(
                    order,
                    v.iter()
                        .flat_map(|r| [r.numerator as u32, r.denominator as u32]),
                ),
            ),
            V::Ascii(s) => {
                let mut data = s.as_bytes().to_vec();
                data.push(0);
                (FieldType::Ascii, data.len(), data)
            }
            V::Undefined(data) => (FieldType::Undefined, data.len(), data.clone()),
            V::UserComment(text) => {
                let data = encode_user_comment(order, text);
                (FieldType::Undefined, data.len(), data)
            }
            V::Raw {
                field_type,
                count,
                data,
            } => {
                return Ok(RenderedEntry::place(*field_type, *count, order, offset, data.clone()));
            }
            V::ThumbnailData(data) => {
                return Ok(RenderedEntry::pointer(
                    FieldType::Long,
                    1,
                    order,
                    offset,
                    data.clone(),
                ));
            }
            V::SubIfd {
                field_type,
                count,
                structure,
            } => {
                let nested = IfdRenderer::new(order).render(structure, offset)?;
                // An UNDEFINED sub-directory counts its bytes
                let count = if *field_type == FieldType::Undefined {
                    nested.len() as u32
                } else {
                    *count
                };
                return Ok(RenderedEntry::pointer(*field_type, count, order, offset, nested));
            }
            V::SubIfdArray {
                field_type,
                structures,
            } => return render_sub_ifd_array(*field_type, structures, order, offset),
            V::StripOffsets(strips) => return render_strips(strips, order, offset),
            V::MakerNote(note) => {
                let data = note.render(offset)?;
                return Ok(RenderedEntry::pointer(
                    FieldType::Undefined,
                    data.len() as u32,
                    order,
                    offset,
                    data,
                ));
            }
        };

        Ok(RenderedEntry::place(field_type, count as u32, order, offset, payload))
    }
}

fn shorts(order: ByteOrder, values: impl IntoIterator<Item = u16>) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        order.push_u16(&mut out, v);
    }
    out
}

fn longs(order: ByteOrder, values: impl IntoIterator<Item = u32>) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        order.push_u32(&mut out, v);
    }
    out
}

/// `base + add` as a TIFF offset
pub(crate) fn checked_offset(base: u32, add: usize) -> Result<u32> {
    let end = base as u64 + add as u64;
    u32::try_from(end).map_err(|_| Error::DataTooLarge {
        size: end,
        max: u32::MAX as u64,
    })
}

fn render_sub_ifd_array(
    field_type: FieldType,
    structures: &[IfdStructure],
    order: ByteOrder,
    offset: u32,
) -> Result<RenderedEntry> {
    let renderer = IfdRenderer::new(order);
    if structures.len() == 1 {
        let nested = renderer.render(&structures[0], offset)?;
        return Ok(RenderedEntry::pointer(field_type, 1, order, offset, nested));
    }

    // Offset table first, then each chain word-aligned
    let table_len = structures.len() * 4;
    let mut cursor = checked_offset(offset, table_len)?;
    let mut table = Vec::with_capacity(table_len);
    let mut body = Vec::new();
    for structure in structures {
        order.push_u32(&mut table, cursor);
        let mut nested = renderer.render(structure, cursor)?;
        if nested.len() % 2 != 0 {
            nested.push(0);
        }
        cursor = checked_offset(cursor, nested.len())?;
        body.extend_from_slice(&nested);
    }
    table.extend_from_slice(&body);
    Ok(RenderedEntry::place(
        field_type,
        structures.len() as u32,
        order,
        offset,
        table,
    ))
}

fn render_strips(strips: &[Vec<u8>], order: ByteOrder, offset: u32) -> Result<RenderedEntry> {
    let count = strips.len() as u32;
    let table_len = strips.len() * 4;
    let inline = table_len <= 4;

    let mut cursor = if inline {
        offset
    } else {
        checked_offset(offset, table_len)?
    };
    let mut table = Vec::with_capacity(table_len);
    let mut data = Vec::new();
    for strip in strips {
        order.push_u32(&mut table, cursor);
        cursor = checked_offset(cursor, strip.len())?;
        data.extend_from_slice(strip);
    }

    if inline {
        let mut value = [0u8; 4];
        value[..table.len()].copy_from_slice(&table);
        Ok(RenderedEntry {
            field_type: FieldType::Long.code(),
            count,
            value,
            overflow: data,
        })
    } else {
        table.extend_from_slice(&data);
        Ok(RenderedEntry::pointer(FieldType::Long, count, order, offset, table))
    }
}

/// Decode an Exif UserComment payload (8-byte charset prefix + text)
///
/// An all-zero prefix means "undefined" and is read as ASCII.
pub fn decode_user_comment(order: ByteOrder, data: &[u8]) -> Result<String> {
    if data.len() < 8 {
        return Err(Error::corrupt(0, "UserComment shorter than its charset prefix"));
    }
    let (prefix, text) = data.split_at(8);

    if prefix == USER_COMMENT_ASCII || prefix == USER_COMMENT_UNDEFINED {
        let text = String::from_utf8_lossy(text);
        Ok(text.trim_end_matches('\0').to_string())
    } else if prefix == USER_COMMENT_UNICODE {
        let units: Vec<u16> = text.chunks_exact(2).map(|c| order.read_u16(c)).collect();
        let text = String::from_utf16_lossy(&units);
        Ok(text.trim_end_matches('\0').to_string())
    } else {
        let name = String::from_utf8_lossy(prefix);
        Err(Error::UnsupportedEncoding(format!(
            "UserComment charset {:?}",
            name.trim_end_matches('\0')
        )))
    }
}

/// Encode a UserComment, ASCII when possible and UTF-16 otherwise
pub fn encode_user_comment(order: ByteOrder, text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + text.len() * 2);
    if text.is_ascii() {
        out.extend_from_slice(USER_COMMENT_ASCII);
        out.extend_from_slice(text.as_bytes());
    } else {
        out.extend_from_slice(USER_COMMENT_UNICODE);
        for unit in text.encode_utf16() {
            order.push_u16(&mut out, unit);
        }
    }
    out
}

/// Whether a UserComment payload uses a charset [`EntryValue::UserComment`] models
pub(crate) fn is_typed_user_comment(data: &[u8]) -> bool {
    data.len() >= 8 && (&data[..8] == USER_COMMENT_ASCII || &data[..8] == USER_COMMENT_UNICODE)
}
