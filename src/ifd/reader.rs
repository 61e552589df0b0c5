//! IFD chain reader
//!
//! Reads a directory chain into an [`IfdStructure`]:
//! count, fixed records, overflow values, then the next-IFD pointer, repeated
//! until the pointer is zero. Special tags are offered to the [`VendorKind`]
//! strategy of the current scope before the default decode; this is where
//! nested Exif/GPS/interoperability directories, maker notes, thumbnails and
//! strips are discovered.

use super::{
    encode_user_comment, entry::is_typed_user_comment, makernote::MakerNoteLayout, tags, Entry,
    EntryValue, FieldType, IfdDirectory, IfdStructure, MakerNote, MakerNoteBase, Rational, SRational, VendorKind,
    ByteOrder, ENTRY_SIZE,
};
use crate::{
    error::{Error, Result},
    stream::ByteStream,
};
use log::{debug, warn};
use std::collections::HashSet;

/// Maximum number of entries in one directory (prevents DOS attacks)
pub const MAX_IFD_TAGS: u16 = 1000;

/// Maximum size of a single entry value (256 MB)
pub const MAX_VALUE_SIZE: u64 = 256 * 1024 * 1024;

/// Limits and switches for reading directory chains
///
/// Use the builder methods to change the defaults.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Deepest allowed nesting of sub-IFDs and maker notes
    pub max_depth: usize,
    /// Longest allowed next-IFD chain
    pub max_directories: usize,
    /// Most entries accepted in one directory
    pub max_entries: u16,
    /// Largest value (or strip) read for one entry
    pub max_value_size: u64,
    /// Parse maker notes into structures instead of keeping them opaque
    pub parse_maker_notes: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_depth: 16,
            max_directories: 32,
            max_entries: MAX_IFD_TAGS,
            max_value_size: MAX_VALUE_SIZE,
            parse_maker_notes: true,
        }
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_directories(mut self, count: usize) -> Self {
        self.max_directories = count;
        self
    }

    pub fn max_entries(mut self, count: u16) -> Self {
        self.max_entries = count;
        self
    }

    pub fn max_value_size(mut self, size: u64) -> Self {
        self.max_value_size = size;
        self
    }

    pub fn parse_maker_notes(mut self, parse: bool) -> Self {
        self.parse_maker_notes = parse;
        self
    }
}

/// How the directories of one chain are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadScope {
    pub order: ByteOrder,
    pub vendor: VendorKind,
    /// Absolute stream position that value offsets are relative to
    pub base_offset: u64,
}

impl ReadScope {
    pub fn new(order: ByteOrder, vendor: VendorKind, base_offset: u64) -> Self {
        Self {
            order,
            vendor,
            base_offset,
        }
    }

    fn with_vendor(self, vendor: VendorKind) -> Self {
        Self { vendor, ..self }
    }
}

/// One fixed 12-byte directory record
#[derive(Debug, Clone, Copy)]
struct RawRecord {
    tag: u16,
    type_code: u16,
    count: u32,
    value: [u8; 4],
}

impl RawRecord {
    fn field_type(&self) -> Option<FieldType> {
        FieldType::from_code(self.type_code)
    }

    fn offset(&self, order: ByteOrder) -> u32 {
        order.read_u32(&self.value)
    }
}

/// Reads directory chains from a stream
///
/// One reader is used for a whole read pass; it remembers every directory it
/// has visited so a cyclic offset graph is reported instead of followed.
pub struct IfdReader<'a, S: ByteStream + ?Sized> {
    stream: &'a mut S,
    options: ReaderOptions,
    length: u64,
    visited: HashSet<(u64, u64)>,
    depth: usize,
    make: Option<String>,
}

impl<'a, S: ByteStream + ?Sized> IfdReader<'a, S> {
    pub fn new(stream: &'a mut S, options: ReaderOptions) -> Result<Self> {
        let length = stream.length()?;
        Ok(Self {
            stream,
            options,
            length,
            visited: HashSet::new(),
            depth: 0,
            make: None,
        })
    }

    /// Read the chain starting at `ifd_offset` (relative to the scope base)
    pub fn read(&mut self, scope: ReadScope, ifd_offset: u32) -> Result<IfdStructure> {
        let mut structure = IfdStructure::new();
        let mut offset = ifd_offset;
        loop {
            if structure.directory_count() >= self.options.max_directories {
                return Err(Error::corrupt(
                    scope.base_offset + offset as u64,
                    format!(
                        "directory chain longer than {}",
                        self.options.max_directories
                    ),
                ));
            }
            let next = self.read_directory(scope, offset, &mut structure)?;
            if next == 0 {
                break;
            }
            offset = next;
        }
        Ok(structure)
    }

    /// Read one directory into the next slot of `structure`, returning the next-IFD offset
    ///
    /// Maker note directories have no next pointer we trust, so zero is returned for them.
    pub fn read_directory(
        &mut self,
        scope: ReadScope,
        ifd_offset: u32,
        structure: &mut IfdStructure,
    ) -> Result<u32> {
        let position = scope.base_offset + ifd_offset as u64;
        if !self.visited.insert((scope.base_offset, ifd_offset as u64)) {
            return Err(Error::corrupt(position, "directory visited twice"));
        }
        self.check_range(position, 2)?;

        // Count
        let count_bytes = self.read_exact_at(position, 2)?;
        let entry_count = scope.order.read_u16(&count_bytes);
        if entry_count > self.options.max_entries {
            return Err(Error::corrupt(
                position,
                format!("{} entries exceeds limit of {}", entry_count, self.options.max_entries),
            ));
        }

        // Entries
        let table_len = entry_count as usize * ENTRY_SIZE;
        let table = self.read_exact_at(position + 2, table_len)?;
        let records: Vec<RawRecord> = table
            .chunks_exact(ENTRY_SIZE)
            .map(|r| RawRecord {
                tag: scope.order.read_u16(&r[0..2]),
                type_code: scope.order.read_u16(&r[2..4]),
                count: scope.order.read_u32(&r[4..8]),
                value: [r[8], r[9], r[10], r[11]],
            })
            .collect();

        let next = if scope.vendor.is_maker_note() {
            0
        } else {
            let next_bytes = self.read_exact_at(position + 2 + table_len as u64, 4)?;
            scope.order.read_u32(&next_bytes)
        };

        debug!(
            "IFD at {} ({:?}): {} entries, next {}",
            position, scope.vendor, entry_count, next
        );

        // Maker note detection needs the IFD0 make before any sub-IFD is followed
        if self.make.is_none() && self.depth == 0 && scope.vendor == VendorKind::Exif {
            if let Some(record) = records
                .iter()
                .find(|r| r.tag == tags::MAKE && r.field_type() == Some(FieldType::Ascii))
            {
                let data = self.read_value_bytes(scope, record, FieldType::Ascii)?;
                self.make = decode_value(scope.order, FieldType::Ascii, record.count, data)
                    .as_str()
                    .map(str::to_string);
            }
        }

        // Overflow
        let mut directory = IfdDirectory::new();
        for record in &records {
            if let Some(value) = self.try_parse_special_entry(scope, record, &records)? {
                directory.insert(Entry::new(record.tag, value));
                continue;
            }
            if let Some(value) = self.read_plain_value(scope, record)? {
                directory.insert(Entry::new(record.tag, value));
            }
        }

        structure.push_directory(directory);
        Ok(next)
    }

    /// Strategy hook consulted before the default decode
    fn try_parse_special_entry(
        &mut self,
        scope: ReadScope,
        record: &RawRecord,
        siblings: &[RawRecord],
    ) -> Result<Option<EntryValue>> {
        match scope.vendor {
            VendorKind::Exif => self.parse_exif_entry(scope, record, siblings),
            VendorKind::Nikon3 if record.tag == tags::NIKON3_PREVIEW_IFD => {
                Ok(self.parse_vendor_sub_ifd(scope, record))
            }
            VendorKind::Olympus2 if tags::is_olympus_sub_ifd(record.tag) => {
                Ok(self.parse_vendor_sub_ifd(scope, record))
            }
            _ => Ok(None),
        }
    }

    fn parse_exif_entry(
        &mut self,
        scope: ReadScope,
        record: &RawRecord,
        siblings: &[RawRecord],
    ) -> Result<Option<EntryValue>> {
        let field_type = record.field_type();
        let is_offset_type = matches!(field_type, Some(FieldType::Long | FieldType::Ifd));

        match record.tag {
            tag if tags::is_sub_ifd_pointer(tag) && is_offset_type && record.count == 1 => {
                let structure = self.read_nested(scope, record.offset(scope.order))?;
                Ok(Some(EntryValue::SubIfd {
                    field_type: field_type.unwrap_or(FieldType::Long),
                    count: record.count,
                    structure,
                }))
            }
            tags::SUB_IFDS if is_offset_type && record.count > 0 => {
                let data = self.read_value_bytes(scope, record, FieldType::Long)?;
                let mut structures = Vec::with_capacity(record.count as usize);
                for chunk in data.chunks_exact(4) {
                    structures.push(self.read_nested(scope, scope.order.read_u32(chunk))?);
                }
                Ok(Some(EntryValue::SubIfdArray {
                    field_type: field_type.unwrap_or(FieldType::Long),
                    structures,
                }))
            }
            tags::MAKER_NOTE if field_type == Some(FieldType::Undefined) => {
                let data = self.read_value_bytes(scope, record, FieldType::Undefined)?;
                if !self.options.parse_maker_notes {
                    return Ok(Some(EntryValue::Undefined(data)));
                }
                Ok(Some(self.parse_maker_note(scope, record, data)))
            }
            tags::USER_COMMENT if field_type == Some(FieldType::Undefined) => {
                let data = self.read_value_bytes(scope, record, FieldType::Undefined)?;
                if is_typed_user_comment(&data) {
                    if let Ok(text) = super::decode_user_comment(scope.order, &data) {
                        // promote only when re-encoding gives back the same bytes
                        if encode_user_comment(scope.order, &text) == data {
                            return Ok(Some(EntryValue::UserComment(text)));
                        }
                    }
                }
                Ok(Some(EntryValue::Undefined(data)))
            }
            tags::JPEG_INTERCHANGE_FORMAT if is_offset_type && record.count == 1 => {
                let Some(length) = find_scalar(scope.order, siblings, tags::JPEG_INTERCHANGE_FORMAT_LENGTH)
                else {
                    return Ok(None);
                };
                let start = scope.base_offset + record.offset(scope.order) as u64;
                let data = self.read_region(start, length as u64)?;
                Ok(Some(EntryValue::ThumbnailData(data)))
            }
            tags::STRIP_OFFSETS
                if matches!(field_type, Some(FieldType::Short | FieldType::Long)) =>
            {
                let Some(counts_record) = siblings.iter().find(|r| r.tag == tags::STRIP_BYTE_COUNTS)
                else {
                    return Ok(None);
                };
                let offsets = self.read_uints(scope, record)?;
                let counts = self.read_uints(scope, counts_record)?;
                if offsets.len() != counts.len() {
                    return Err(Error::corrupt(
                        scope.base_offset + record.offset(scope.order) as u64,
                        format!(
                            "{} strip offsets but {} strip byte counts",
                            offsets.len(),
                            counts.len()
                        ),
                    ));
                }
                let mut strips = Vec::with_capacity(offsets.len());
                for (offset, count) in offsets.into_iter().zip(counts) {
                    strips.push(self.read_region(scope.base_offset + offset as u64, count as u64)?);
                }
                Ok(Some(EntryValue::StripOffsets(strips)))
            }
            _ => Ok(None),
        }
    }

    /// Structured maker note parse, degrading to opaque bytes on any failure
    fn parse_maker_note(&mut self, scope: ReadScope, record: &RawRecord, data: Vec<u8>) -> EntryValue {
        let Some(vendor) = VendorKind::detect(&data, self.make.as_deref()) else {
            debug!("maker note not recognised, keeping {} bytes opaque", data.len());
            return EntryValue::Undefined(data);
        };

        let note_start = scope.base_offset + record.offset(scope.order) as u64;
        let parsed = vendor.layout(&data).and_then(|layout| {
            self.read_maker_note(scope, vendor, note_start, &data, layout)
        });

        match parsed {
            Ok(note) => EntryValue::MakerNote(note),
            Err(err) => {
                warn!("{:?} maker note kept opaque: {}", vendor, err);
                EntryValue::Undefined(data)
            }
        }
    }

    fn read_maker_note(
        &mut self,
        scope: ReadScope,
        vendor: VendorKind,
        note_start: u64,
        data: &[u8],
        layout: MakerNoteLayout,
    ) -> Result<MakerNote> {
        let order = layout.order.unwrap_or(scope.order);
        let base_offset = match layout.base {
            MakerNoteBase::Tiff => scope.base_offset,
            MakerNoteBase::Note => note_start,
            MakerNoteBase::Embedded(pos) => note_start + pos as u64,
        };
        let ifd_position = note_start + layout.header_len as u64;
        let ifd_offset = u32::try_from(ifd_position - base_offset)
            .map_err(|_| Error::corrupt(ifd_position, "maker note directory out of range"))?;

        let nested = ReadScope::new(order, vendor, base_offset);
        let structure = self.read_nested(nested, ifd_offset)?;
        Ok(MakerNote {
            vendor,
            header: data[..layout.header_len].to_vec(),
            order,
            base: layout.base,
            structure,
        })
    }

    /// Nested directory inside a maker note; opaque on failure
    fn parse_vendor_sub_ifd(&mut self, scope: ReadScope, record: &RawRecord) -> Option<EntryValue> {
        let field_type = record.field_type()?;
        if record.count == 0 {
            return None;
        }
        match field_type {
            FieldType::Long | FieldType::Ifd if record.count == 1 => {}
            // Olympus also stores sub-directories as UNDEFINED blobs
            FieldType::Undefined if record.count > 4 => {}
            _ => return None,
        }

        let nested = scope.with_vendor(VendorKind::Generic);
        match self.read_nested(nested, record.offset(scope.order)) {
            Ok(structure) => Some(EntryValue::SubIfd {
                field_type,
                count: record.count,
                structure,
            }),
            Err(err) => {
                warn!(
                    "{:?} sub-directory {:#06x} kept opaque: {}",
                    scope.vendor, record.tag, err
                );
                None
            }
        }
    }

    /// Read a nested chain one level deeper
    fn read_nested(&mut self, scope: ReadScope, ifd_offset: u32) -> Result<IfdStructure> {
        if self.depth >= self.options.max_depth {
            return Err(Error::RecursionLimit {
                depth: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = self.read(scope, ifd_offset);
        self.depth -= 1;
        result
    }

    /// Default decode of a record
    fn read_plain_value(&mut self, scope: ReadScope, record: &RawRecord) -> Result<Option<EntryValue>> {
        let Some(field_type) = record.field_type() else {
            warn!(
                "skipping tag {:#06x} with unknown field type {}",
                record.tag, record.type_code
            );
            return Ok(None);
        };
        let data = self.read_value_bytes(scope, record, field_type)?;
        Ok(Some(decode_value(scope.order, field_type, record.count, data)))
    }

    /// Values of a SHORT or LONG record as u32
    fn read_uints(&mut self, scope: ReadScope, record: &RawRecord) -> Result<Vec<u32>> {
        match record.field_type() {
            Some(FieldType::Short) => {
                let data = self.read_value_bytes(scope, record, FieldType::Short)?;
                Ok(data.chunks_exact(2).map(|c| scope.order.read_u16(c) as u32).collect())
            }
            Some(FieldType::Long) => {
                let data = self.read_value_bytes(scope, record, FieldType::Long)?;
                Ok(data.chunks_exact(4).map(|c| scope.order.read_u32(c)).collect())
            }
            _ => Err(Error::corrupt(
                scope.base_offset,
                format!("tag {:#06x} is not SHORT or LONG", record.tag),
            )),
        }
    }

    /// The value bytes of a record, inline or from its overflow offset
    fn read_value_bytes(&mut self, scope: ReadScope, record: &RawRecord, field_type: FieldType) -> Result<Vec<u8>> {
        let size = (field_type.size() as u64)
            .checked_mul(record.count as u64)
            .ok_or_else(|| Error::corrupt(scope.base_offset, "value size overflow"))?;
        if size > self.options.max_value_size {
            return Err(Error::DataTooLarge {
                size,
                max: self.options.max_value_size,
            });
        }

        if size <= 4 {
            return Ok(record.value[..size as usize].to_vec());
        }
        let start = scope.base_offset + record.offset(scope.order) as u64;
        self.read_region(start, size)
    }

    /// Read exactly `size` bytes at an absolute position inside the stream
    fn read_region(&mut self, start: u64, size: u64) -> Result<Vec<u8>> {
        if size > self.options.max_value_size {
            return Err(Error::DataTooLarge {
                size,
                max: self.options.max_value_size,
            });
        }
        if size == 0 {
            return Ok(Vec::new());
        }
        self.check_range(start, size)?;
        self.read_exact_at(start, size as usize)
    }

    fn check_range(&self, start: u64, size: u64) -> Result<()> {
        match start.checked_add(size) {
            Some(end) if start < self.length && end <= self.length => Ok(()),
            _ => Err(Error::corrupt(
                start,
                format!("{} bytes out of range (stream length {})", size, self.length),
            )),
        }
    }

    fn read_exact_at(&mut self, position: u64, size: usize) -> Result<Vec<u8>> {
        let data = self.stream.read_block_at(position, size)?;
        if data.len() != size {
            return Err(Error::corrupt(
                position,
                format!("expected {} bytes, found {}", size, data.len()),
            ));
        }
        Ok(data)
    }
}

/// First value of a SHORT/LONG sibling record, when it is inline
fn find_scalar(order: ByteOrder, records: &[RawRecord], tag: u16) -> Option<u32> {
    let record = records.iter().find(|r| r.tag == tag)?;
    match record.field_type()? {
        FieldType::Short => Some(order.read_u16(&record.value) as u32),
        FieldType::Long => Some(order.read_u32(&record.value)),
        _ => None,
    }
}

/// Text of an ASCII payload, only when rendering it reproduces the same bytes
fn exact_ascii(data: &[u8]) -> Option<String> {
    let (last, text) = data.split_last()?;
    if *last != 0 || text.last() == Some(&0) {
        return None;
    }
    std::str::from_utf8(text).ok().map(str::to_string)
}

/// Decode a value by type; scalars for count 1, arrays otherwise
pub(crate) fn decode_value(order: ByteOrder, field_type: FieldType, count: u32, data: Vec<u8>) -> EntryValue {
    let single = count == 1;
    match field_type {
        FieldType::Byte if single => EntryValue::Byte(data[0]),
        FieldType::Byte => EntryValue::ByteArray(data),
        FieldType::SByte if single => EntryValue::SByte(data[0] as i8),
        FieldType::SByte => EntryValue::SByteArray(data.into_iter().map(|b| b as i8).collect()),
        FieldType::Short => {
            let v: Vec<u16> = data.chunks_exact(2).map(|c| order.read_u16(c)).collect();
            if single {
                EntryValue::Short(v[0])
            } else {
                EntryValue::ShortArray(v)
            }
        }
        FieldType::SShort => {
            let v: Vec<i16> = data.chunks_exact(2).map(|c| order.read_i16(c)).collect();
            if single {
                EntryValue::SShort(v[0])
            } else {
                EntryValue::SShortArray(v)
            }
        }
        FieldType::Long => {
            let v: Vec<u32> = data.chunks_exact(4).map(|c| order.read_u32(c)).collect();
            if single {
                EntryValue::Long(v[0])
            } else {
                EntryValue::LongArray(v)
            }
        }
        FieldType::SLong => {
            let v: Vec<i32> = data.chunks_exact(4).map(|c| order.read_i32(c)).collect();
            if single {
                EntryValue::SLong(v[0])
            } else {
                EntryValue::SLongArray(v)
            }
        }
        FieldType::Rational => {
            let v: Vec<Rational> = data
                .chunks_exact(8)
                .map(|c| Rational::new(order.read_u32(&c[0..4]), order.read_u32(&c[4..8])))
                .collect();
            if single {
                EntryValue::Rational(v[0])
            } else {
                EntryValue::RationalArray(v)
            }
        }
        FieldType::SRational => {
            let v: Vec<SRational> = data
                .chunks_exact(8)
                .map(|c| SRational::new(order.read_i32(&c[0..4]), order.read_i32(&c[4..8])))
                .collect();
            if single {
                EntryValue::SRational(v[0])
            } else {
                EntryValue::SRationalArray(v)
            }
        }
        FieldType::Ascii => match exact_ascii(&data) {
            Some(text) => EntryValue::Ascii(text),
            // padded, unterminated or non-UTF-8 text stays byte-exact
            None => EntryValue::Raw {
                field_type,
                count,
                data,
            },
        },
        FieldType::Undefined => EntryValue::Undefined(data),
        FieldType::Float | FieldType::Double | FieldType::Ifd => EntryValue::Raw {
            field_type,
            count,
            data,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LE: ByteOrder = ByteOrder::LittleEndian;

    /// Little-endian directory bytes at offset 0: count, records, next pointer
    fn directory(records: &[(u16, u16, u32, [u8; 4])], next: u32) -> Vec<u8> {
        let mut out = Vec::new();
        LE.push_u16(&mut out, records.len() as u16);
        for (tag, type_code, count, value) in records {
            LE.push_u16(&mut out, *tag);
            LE.push_u16(&mut out, *type_code);
            LE.push_u32(&mut out, *count);
            out.extend_from_slice(value);
        }
        LE.push_u32(&mut out, next);
        out
    }

    fn read(data: Vec<u8>, vendor: VendorKind) -> Result<IfdStructure> {
        let mut stream = Cursor::new(data);
        let mut reader = IfdReader::new(&mut stream, ReaderOptions::default())?;
        reader.read(ReadScope::new(LE, vendor, 0), 0)
    }

    #[test]
    fn test_read_inline_short() {
        let data = directory(&[(0x0100, 3, 1, [0x20, 0x03, 0, 0])], 0);
        let s = read(data, VendorKind::Exif).unwrap();
        assert_eq!(s.directory_count(), 1);
        assert_eq!(s.get_value(0, 0x0100), Some(&EntryValue::Short(800)));
    }

    #[test]
    fn test_read_overflow_ascii() {
        let mut data = directory(&[(tags::MAKE, 2, 6, [18, 0, 0, 0])], 0);
        data.extend_from_slice(b"Canon\0");
        let s = read(data, VendorKind::Exif).unwrap();
        assert_eq!(s.get_string_value(0, tags::MAKE), Some("Canon"));
    }

    #[test]
    fn test_out_of_range_offset_is_corrupt() {
        let data = directory(&[(tags::MAKE, 2, 6, [0xF0, 0, 0, 0])], 0);
        let err = read(data, VendorKind::Exif).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_truncated_table_is_corrupt() {
        let mut data = directory(&[(0x0100, 3, 1, [1, 0, 0, 0])], 0);
        data.truncate(10);
        assert!(read(data, VendorKind::Exif).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_entry_limit() {
        let mut data = Vec::new();
        LE.push_u16(&mut data, 2000);
        let err = read(data, VendorKind::Generic).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_self_referencing_chain_is_corrupt() {
        // directory at offset 2 whose next pointer is 2
        let mut data = vec![0u8, 0];
        data.extend_from_slice(&directory(&[(0x0100, 3, 1, [1, 0, 0, 0])], 2));
        let mut stream = Cursor::new(data);
        let mut reader = IfdReader::new(&mut stream, ReaderOptions::default()).unwrap();
        let err = reader
            .read(ReadScope::new(LE, VendorKind::Generic, 0), 2)
            .unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_sub_ifd_pointing_at_parent_is_corrupt() {
        let data = directory(&[(tags::EXIF_IFD_POINTER, 4, 1, [0, 0, 0, 0])], 0);
        assert!(read(data, VendorKind::Exif).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let data = directory(&[(0x0100, 99, 1, [1, 0, 0, 0]), (0x0101, 3, 1, [2, 0, 0, 0])], 0);
        let s = read(data, VendorKind::Exif).unwrap();
        assert!(!s.contains_tag(0, 0x0100));
        assert_eq!(s.get_long_value(0, 0x0101), Some(2));
    }

    #[test]
    fn test_unknown_maker_note_stays_opaque() {
        let mut data = directory(&[(tags::MAKER_NOTE, 7, 8, [18, 0, 0, 0])], 0);
        data.extend_from_slice(b"ACME0001");
        let s = read(data, VendorKind::Exif).unwrap();
        assert_eq!(
            s.get_value(0, tags::MAKER_NOTE),
            Some(&EntryValue::Undefined(b"ACME0001".to_vec()))
        );
    }

    #[test]
    fn test_broken_maker_note_degrades() {
        // Sony signature followed by an entry count that runs off the end
        let mut note = b"SONY DSC \0\0\0".to_vec();
        note.extend_from_slice(&[0x40, 0x00]);
        let mut data = directory(&[(tags::MAKER_NOTE, 7, note.len() as u32, [18, 0, 0, 0])], 0);
        data.extend_from_slice(&note);
        let s = read(data, VendorKind::Exif).unwrap();
        assert_eq!(
            s.get_value(0, tags::MAKER_NOTE),
            Some(&EntryValue::Undefined(note))
        );
    }

    #[test]
    fn test_thumbnail_uses_length_sibling() {
        let mut data = directory(
            &[
                (tags::JPEG_INTERCHANGE_FORMAT, 4, 1, [30, 0, 0, 0]),
                (tags::JPEG_INTERCHANGE_FORMAT_LENGTH, 4, 1, [4, 0, 0, 0]),
            ],
            0,
        );
        assert_eq!(data.len(), 30);
        data.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let s = read(data, VendorKind::Exif).unwrap();
        assert_eq!(s.thumbnail(0), Some(&[0xFF, 0xD8, 0xFF, 0xD9][..]));
    }

    #[test]
    fn test_strip_count_mismatch_is_corrupt() {
        let data = directory(
            &[
                (tags::STRIP_OFFSETS, 4, 1, [0, 0, 0, 0]),
                (tags::STRIP_BYTE_COUNTS, 3, 2, [1, 0, 1, 0]),
            ],
            0,
        );
        assert!(read(data, VendorKind::Exif).unwrap_err().is_corrupt());
    }

    #[test]
    fn test_depth_limit() {
        let data = directory(&[(tags::EXIF_IFD_POINTER, 4, 1, [18, 0, 0, 0])], 0);
        let mut data = data;
        data.extend_from_slice(&directory(&[(0x0100, 3, 1, [1, 0, 0, 0])], 0));
        let mut stream = Cursor::new(data);
        let options = ReaderOptions::new().max_depth(0);
        let mut reader = IfdReader::new(&mut stream, options).unwrap();
        let err = reader
            .read(ReadScope::new(LE, VendorKind::Exif, 0), 0)
            .unwrap_err();
        assert!(matches!(err, Error::RecursionLimit { depth: 0 }));
    }

    #[test]
    fn test_decode_ascii_only_when_exact() {
        let v = decode_value(LE, FieldType::Ascii, 4, b"a\0b\0".to_vec());
        assert_eq!(v, EntryValue::Ascii("a\0b".into()));

        let lossy: [&[u8]; 4] = [b"ab\0\0\0\0", b"abc", b"Jos\xE9\0", b""];
        for data in lossy {
            let count = data.len() as u32;
            let v = decode_value(LE, FieldType::Ascii, count, data.to_vec());
            assert_eq!(
                v,
                EntryValue::Raw {
                    field_type: FieldType::Ascii,
                    count,
                    data: data.to_vec(),
                }
            );
        }
    }

    #[test]
    fn test_padded_make_still_detected() {
        let v = decode_value(LE, FieldType::Ascii, 8, b"NIKON\0\0\0".to_vec());
        assert_eq!(v.as_str(), Some("NIKON"));
        let v = decode_value(LE, FieldType::Ascii, 5, b"Jos\xE9\0".to_vec());
        assert_eq!(v.as_str(), None);
    }
}
