//! Directory chain serialisation
//!
//! Layout of a rendered chain placed at `offset`:
//!
//! ```text
//! [dir 0 table][dir 1 table]...[dir n table][overflow area]
//! ```
//!
//! Each table is `count(2) + 12 * entries + next(4)`. Entries are written in
//! ascending tag order and every overflow block starts on a word boundary.
//! Nested structures (sub-IFDs, maker notes) are rendered recursively into the
//! overflow area, so they always follow the tables that point at them.

use super::{entry::checked_offset, ByteOrder, IfdDirectory, IfdStructure, ENTRY_SIZE};
use crate::error::{Error, Result};

/// Renders [`IfdStructure`]s in a fixed byte order
#[derive(Debug, Clone, Copy)]
pub struct IfdRenderer {
    order: ByteOrder,
}

impl IfdRenderer {
    pub fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Serialise `structure` for placement at `offset` (relative to the TIFF header)
    ///
    /// A structure without directories still renders one empty directory.
    pub fn render(&self, structure: &IfdStructure, offset: u32) -> Result<Vec<u8>> {
        let empty = [IfdDirectory::new()];
        let directories = match structure.directories() {
            [] => &empty[..],
            dirs => dirs,
        };

        let mut table_offsets = Vec::with_capacity(directories.len());
        let mut cursor = offset;
        for dir in directories {
            if dir.len() > u16::MAX as usize {
                return Err(Error::DataTooLarge {
                    size: dir.len() as u64,
                    max: u16::MAX as u64,
                });
            }
            table_offsets.push(cursor);
            cursor = checked_offset(cursor, table_size(dir))?;
        }
        let overflow_start = cursor;

        let mut tables = Vec::with_capacity((overflow_start - offset) as usize);
        let mut overflow = Vec::new();
        for (index, dir) in directories.iter().enumerate() {
            self.order.push_u16(&mut tables, dir.len() as u16);
            for entry in dir.iter() {
                let data_offset = checked_offset(overflow_start, overflow.len())?;
                let rendered = entry.render(self.order, data_offset)?;

                self.order.push_u16(&mut tables, entry.tag);
                self.order.push_u16(&mut tables, rendered.field_type);
                self.order.push_u32(&mut tables, rendered.count);
                tables.extend_from_slice(&rendered.value);

                overflow.extend_from_slice(&rendered.overflow);
                if overflow.len() % 2 != 0 {
                    overflow.push(0);
                }
            }
            let next = table_offsets.get(index + 1).copied().unwrap_or(0);
            self.order.push_u32(&mut tables, next);
        }

        tables.extend_from_slice(&overflow);
        Ok(tables)
    }
}

/// Bytes taken by a directory's fixed table
pub fn table_size(directory: &IfdDirectory) -> usize {
    2 + directory.len() * ENTRY_SIZE + 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifd::{tags, Entry, EntryValue, FieldType};

    const LE: ByteOrder = ByteOrder::LittleEndian;

    #[test]
    fn test_empty_structure_is_one_empty_directory() {
        let out = IfdRenderer::new(LE).render(&IfdStructure::new(), 8).unwrap();
        assert_eq!(out, [0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_single_short_directory() {
        let mut s = IfdStructure::new();
        s.set_short_value(0, tags::ORIENTATION, 1);
        let out = IfdRenderer::new(LE).render(&s, 8).unwrap();
        assert_eq!(out.len(), 18);
        assert_eq!(&out[..2], [1, 0]);
        assert_eq!(&out[2..4], [0x12, 0x01]);
        assert_eq!(&out[14..], [0, 0, 0, 0]);
    }

    #[test]
    fn test_chain_next_pointers() {
        let mut s = IfdStructure::new();
        s.set_short_value(0, tags::ORIENTATION, 1);
        s.set_short_value(1, tags::ORIENTATION, 3);
        let out = IfdRenderer::new(LE).render(&s, 8).unwrap();
        assert_eq!(out.len(), 36);
        // first next pointer is the second directory's offset, the last is zero
        assert_eq!(LE.read_u32(&out[14..18]), 8 + 18);
        assert_eq!(LE.read_u32(&out[32..36]), 0);
    }

    #[test]
    fn test_overflow_is_word_aligned() {
        let mut s = IfdStructure::new();
        s.set_string_value(0, tags::MAKE, Some("Acme")); // 5 bytes with NUL
        s.set_string_value(0, tags::MODEL, Some("X-1000")); // 7 bytes with NUL
        let out = IfdRenderer::new(LE).render(&s, 0).unwrap();

        let table = table_size(s.directory(0).unwrap());
        assert_eq!(table, 30);
        let make_offset = LE.read_u32(&out[10..14]);
        let model_offset = LE.read_u32(&out[22..26]);
        assert_eq!(make_offset, 30);
        assert_eq!(model_offset, 36);
        assert_eq!(&out[30..35], b"Acme\0");
        assert_eq!(&out[36..43], b"X-1000\0");
        assert_eq!(out.len() % 2, 0);
    }

    #[test]
    fn test_sub_ifd_follows_parent_table() {
        let mut s = IfdStructure::new();
        s.sub_structure_mut(0, tags::EXIF_IFD_POINTER)
            .set_short_value(0, tags::ISO_SPEED, 200);
        let out = IfdRenderer::new(LE).render(&s, 8).unwrap();

        // parent table is 18 bytes at 8, so the nested directory lands at 26
        assert_eq!(LE.read_u16(&out[4..6]), FieldType::Long.code());
        assert_eq!(LE.read_u32(&out[10..14]), 26);
        assert_eq!(LE.read_u16(&out[18..20]), 1);
        assert_eq!(LE.read_u16(&out[20..22]), tags::ISO_SPEED);
        assert_eq!(out.len(), 36);
    }

    #[test]
    fn test_entry_count_must_fit_table_header() {
        let mut dir = IfdDirectory::new();
        for tag in 0..=u16::MAX {
            dir.insert(Entry::new(tag, EntryValue::Byte(0)));
        }
        assert_eq!(dir.len(), 65536);
        let mut s = IfdStructure::new();
        s.push_directory(dir);

        let err = IfdRenderer::new(LE).render(&s, 8).unwrap_err();
        assert!(
            matches!(err, Error::DataTooLarge { size: 65536, max: 65535 }),
            "{}",
            err
        );
    }

    #[test]
    fn test_entries_written_in_tag_order() {
        let mut s = IfdStructure::new();
        s.set_entry(0, Entry::new(0x0200, EntryValue::Byte(1)));
        s.set_entry(0, Entry::new(0x0100, EntryValue::Byte(2)));
        let out = IfdRenderer::new(ByteOrder::BigEndian).render(&s, 0).unwrap();
        assert_eq!(&out[2..4], [0x01, 0x00]);
        assert_eq!(&out[14..16], [0x02, 0x00]);
    }
}
