//! Maker note dialects
//!
//! A maker note is an Exif UNDEFINED blob that most vendors fill with an
//! IFD-like directory. Dialects differ in the header that precedes the
//! directory, in what their value offsets are relative to, and sometimes in
//! byte order. None of this is standardised, so any parse failure degrades the
//! note back to opaque bytes (see the reader).

use super::{entry::checked_offset, ByteOrder, IfdRenderer, IfdStructure};
use crate::error::{Error, Result};

/// Entry-parsing strategy for a directory
///
/// `Exif` handles the Exif-family pointer tags (Exif, GPS, interoperability,
/// maker note, thumbnail, strips); `Generic` decodes every record plainly; the
/// rest are maker note dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorKind {
    Exif,
    Canon,
    Nikon1,
    Nikon2,
    Nikon3,
    Sony,
    Panasonic,
    Olympus1,
    Olympus2,
    Pentax,
    Generic,
}

/// What the value offsets inside a maker note are relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakerNoteBase {
    /// The enclosing TIFF header
    Tiff,
    /// The first byte of the maker note
    Note,
    /// A TIFF header embedded at this position inside the note
    Embedded(u32),
}

/// A parsed maker note
#[derive(Debug, Clone, PartialEq)]
pub struct MakerNote {
    pub vendor: VendorKind,
    /// Every byte of the note that precedes its directory
    pub header: Vec<u8>,
    pub order: ByteOrder,
    pub base: MakerNoteBase,
    pub structure: IfdStructure,
}

/// Where a dialect's directory sits and how it is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MakerNoteLayout {
    pub header_len: usize,
    pub base: MakerNoteBase,
    /// Byte order carried by the note itself
    pub order: Option<ByteOrder>,
}

impl VendorKind {
    /// Identify the maker note dialect from its leading bytes and the camera make
    ///
    /// Canon and type-2 Nikon notes carry no signature and are recognised by
    /// make alone. Returns `None` for notes we do not parse.
    pub fn detect(note: &[u8], make: Option<&str>) -> Option<Self> {
        if note.starts_with(b"Nikon\0\x02") {
            Some(Self::Nikon3)
        } else if note.starts_with(b"Nikon\0\x01") {
            Some(Self::Nikon1)
        } else if note.starts_with(b"SONY DSC \0\0\0") || note.starts_with(b"SONY CAM \0\0\0") {
            Some(Self::Sony)
        } else if note.starts_with(b"Panasonic\0\0\0") {
            Some(Self::Panasonic)
        } else if note.starts_with(b"OLYMPUS\0") {
            Some(Self::Olympus2)
        } else if note.starts_with(b"OLYMP\0") {
            Some(Self::Olympus1)
        } else if note.starts_with(b"AOC\0") {
            Some(Self::Pentax)
        } else {
            let make = make?.trim();
            if make.starts_with("Canon") {
                Some(Self::Canon)
            } else if make.to_ascii_uppercase().starts_with("NIKON") {
                Some(Self::Nikon2)
            } else {
                None
            }
        }
    }

    /// Maker note directories are single and carry no usable next pointer
    pub fn is_maker_note(&self) -> bool {
        !matches!(self, Self::Exif | Self::Generic)
    }

    pub(crate) fn layout(&self, note: &[u8]) -> Result<MakerNoteLayout> {
        let plain = |header_len| MakerNoteLayout {
            header_len,
            base: MakerNoteBase::Tiff,
            order: None,
        };

        let layout = match self {
            Self::Exif | Self::Generic | Self::Canon | Self::Nikon2 => plain(0),
            Self::Nikon1 | Self::Olympus1 => plain(8),
            Self::Sony | Self::Panasonic => plain(12),
            Self::Olympus2 => {
                let order = note
                    .get(8..10)
                    .and_then(ByteOrder::from_marker)
                    .ok_or_else(|| Error::corrupt(8, "Olympus maker note without byte order"))?;
                MakerNoteLayout {
                    header_len: 12,
                    base: MakerNoteBase::Note,
                    order: Some(order),
                }
            }
            Self::Pentax => MakerNoteLayout {
                header_len: 6,
                base: MakerNoteBase::Note,
                order: note.get(4..6).and_then(ByteOrder::from_marker),
            },
            Self::Nikon3 => {
                if note.len() < 18 {
                    return Err(Error::corrupt(0, "Nikon maker note header truncated"));
                }
                let order = ByteOrder::from_marker(&note[10..12])
                    .ok_or_else(|| Error::corrupt(10, "Nikon maker note without byte order"))?;
                if order.read_u16(&note[12..14]) != 0x002A {
                    return Err(Error::corrupt(12, "Nikon maker note TIFF magic mismatch"));
                }
                let ifd_offset = order.read_u32(&note[14..18]) as usize;
                MakerNoteLayout {
                    header_len: 10 + ifd_offset,
                    base: MakerNoteBase::Embedded(10),
                    order: Some(order),
                }
            }
        };

        if layout.header_len > note.len() {
            return Err(Error::corrupt(
                layout.header_len as u64,
                format!("{:?} maker note directory starts past its end", self),
            ));
        }
        Ok(layout)
    }
}

impl MakerNote {
    /// Render header and directory for a note placed at `offset`
    pub fn render(&self, offset: u32) -> Result<Vec<u8>> {
        let header_len = self.header.len();
        let ifd_offset = match self.base {
            MakerNoteBase::Tiff => checked_offset(offset, header_len)?,
            MakerNoteBase::Note => checked_offset(0, header_len)?,
            MakerNoteBase::Embedded(pos) => checked_offset(0, header_len)?
                .checked_sub(pos)
                .ok_or_else(|| {
                    Error::InvalidFormat("embedded maker note header longer than note header".into())
                })?,
        };

        let nested = IfdRenderer::new(self.order).render(&self.structure, ifd_offset)?;
        let mut out = Vec::with_capacity(header_len + nested.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&nested);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_signature() {
        assert_eq!(
            VendorKind::detect(b"Nikon\0\x02\x10\0\0MM\0*", None),
            Some(VendorKind::Nikon3)
        );
        assert_eq!(
            VendorKind::detect(b"SONY DSC \0\0\0....", Some("SONY")),
            Some(VendorKind::Sony)
        );
        assert_eq!(
            VendorKind::detect(b"OLYMPUS\0II\x03\0", None),
            Some(VendorKind::Olympus2)
        );
        assert_eq!(VendorKind::detect(b"OLYMP\0\x01\0", None), Some(VendorKind::Olympus1));
        assert_eq!(VendorKind::detect(b"AOC\0MM", None), Some(VendorKind::Pentax));
        assert_eq!(
            VendorKind::detect(b"Panasonic\0\0\0", None),
            Some(VendorKind::Panasonic)
        );
    }

    #[test]
    fn test_detect_by_make() {
        assert_eq!(VendorKind::detect(&[0, 5], Some("Canon")), Some(VendorKind::Canon));
        assert_eq!(
            VendorKind::detect(&[0, 5], Some("NIKON CORPORATION")),
            Some(VendorKind::Nikon2)
        );
        assert_eq!(VendorKind::detect(&[0, 5], Some("Acme")), None);
        assert_eq!(VendorKind::detect(&[0, 5], None), None);
    }

    #[test]
    fn test_nikon3_layout() {
        let note = b"Nikon\0\x02\x10\0\0MM\0\x2a\0\0\0\x08\0\0";
        let layout = VendorKind::Nikon3.layout(note).unwrap();
        assert_eq!(layout.header_len, 18);
        assert_eq!(layout.base, MakerNoteBase::Embedded(10));
        assert_eq!(layout.order, Some(ByteOrder::BigEndian));
    }

    #[test]
    fn test_layout_rejects_truncated_notes() {
        assert!(VendorKind::Nikon3.layout(b"Nikon\0\x02").is_err());
        assert!(VendorKind::Sony.layout(b"SONY DSC").is_err());
        assert!(VendorKind::Olympus2.layout(b"OLYMPUS\0XX\x03\0").is_err());
    }

    #[test]
    fn test_render_relative_to_note() {
        let note = MakerNote {
            vendor: VendorKind::Olympus2,
            header: b"OLYMPUS\0II\x03\0".to_vec(),
            order: ByteOrder::LittleEndian,
            base: MakerNoteBase::Note,
            structure: IfdStructure::new(),
        };
        // The note's own offsets do not depend on where it lands
        let a = note.render(100).unwrap();
        let b = note.render(5000).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[..12], b"OLYMPUS\0II\x03\0");
        assert_eq!(a.len(), 12 + 6);
    }
}
