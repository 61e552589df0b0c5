//! APEv2 tags
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! [header 32][item]...[item][footer 32]
//! ```
//!
//! Header and footer share one format: `"APETAGEX"`, version, tag size
//! (items + footer, header excluded), item count, flags, 8 reserved bytes.
//! An item is `value_size(4) flags(4) key NUL value`.

use crate::{
    error::{Error, Result},
    stream::ByteStream,
};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;

/// Signature starting every APE header and footer
pub const APE_PREAMBLE: &[u8; 8] = b"APETAGEX";

/// Size of an APE header or footer
pub const APE_FOOTER_SIZE: usize = 32;

/// APEv2; always written regardless of the version read
pub const APE_VERSION: u32 = 2000;

const FLAG_HEADER_PRESENT: u32 = 1 << 31;
const FLAG_FOOTER_ABSENT: u32 = 1 << 30;
const FLAG_IS_HEADER: u32 = 1 << 29;

const ITEM_READ_ONLY: u32 = 1;
const ITEM_KIND_SHIFT: u32 = 1;
const ITEM_KIND_MASK: u32 = 0b11 << ITEM_KIND_SHIFT;

/// Fixed part of an item plus the shortest legal key and its terminator
const MIN_ITEM_SIZE: usize = 8 + 2 + 1;

/// Keys that would make an item look like another tag format
const FORBIDDEN_KEYS: [&str; 4] = ["ID3", "TAG", "OGGS", "MP+"];

/// An APE header or footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApeFooter {
    pub version: u32,
    /// Items plus footer, header excluded
    pub tag_size: u32,
    pub item_count: u32,
    pub flags: u32,
}

impl ApeFooter {
    /// Parse 32 bytes of header or footer
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < APE_FOOTER_SIZE {
            return Err(Error::corrupt(0, "APE footer truncated"));
        }
        if &data[..8] != APE_PREAMBLE {
            return Err(Error::corrupt(0, "missing APETAGEX signature"));
        }
        let footer = Self {
            version: LittleEndian::read_u32(&data[8..12]),
            tag_size: LittleEndian::read_u32(&data[12..16]),
            item_count: LittleEndian::read_u32(&data[16..20]),
            flags: LittleEndian::read_u32(&data[20..24]),
        };
        if (footer.tag_size as usize) < APE_FOOTER_SIZE {
            return Err(Error::corrupt(
                12,
                format!("APE tag size {} smaller than its footer", footer.tag_size),
            ));
        }
        Ok(footer)
    }

    pub fn header_present(&self) -> bool {
        self.flags & FLAG_HEADER_PRESENT != 0
    }

    pub fn footer_present(&self) -> bool {
        self.flags & FLAG_FOOTER_ABSENT == 0
    }

    pub fn is_header(&self) -> bool {
        self.flags & FLAG_IS_HEADER != 0
    }

    /// Size of the items alone
    pub fn items_size(&self) -> u64 {
        self.tag_size as u64 - APE_FOOTER_SIZE as u64
    }

    /// Bytes taken on disk, header included
    pub fn complete_tag_size(&self) -> u64 {
        let header = if self.header_present() {
            APE_FOOTER_SIZE as u64
        } else {
            0
        };
        self.tag_size as u64 + header
    }

    pub fn render_footer(&self) -> [u8; APE_FOOTER_SIZE] {
        self.render(self.flags & !FLAG_IS_HEADER)
    }

    pub fn render_header(&self) -> [u8; APE_FOOTER_SIZE] {
        self.render(self.flags | FLAG_IS_HEADER)
    }

    fn render(&self, flags: u32) -> [u8; APE_FOOTER_SIZE] {
        let mut out = [0u8; APE_FOOTER_SIZE];
        out[..8].copy_from_slice(APE_PREAMBLE);
        LittleEndian::write_u32(&mut out[8..12], self.version);
        LittleEndian::write_u32(&mut out[12..16], self.tag_size);
        LittleEndian::write_u32(&mut out[16..20], self.item_count);
        LittleEndian::write_u32(&mut out[20..24], flags);
        out
    }
}

/// How an item's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApeItemKind {
    /// UTF-8 text, multiple values separated by NUL
    Text,
    Binary,
    /// UTF-8 link to external data
    Locator,
}

impl ApeItemKind {
    fn from_flags(flags: u32) -> Self {
        match (flags & ITEM_KIND_MASK) >> ITEM_KIND_SHIFT {
            1 => Self::Binary,
            2 => Self::Locator,
            // 3 is reserved; treat as text
            _ => Self::Text,
        }
    }

    fn bits(self) -> u32 {
        let kind = match self {
            Self::Text => 0,
            Self::Binary => 1,
            Self::Locator => 2,
        };
        kind << ITEM_KIND_SHIFT
    }
}

/// A key/value item of an APE tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApeItem {
    pub key: String,
    pub kind: ApeItemKind,
    pub read_only: bool,
    pub value: Vec<u8>,
}

impl ApeItem {
    /// Text item; several values are stored NUL-separated
    pub fn text<S: AsRef<str>>(key: &str, values: &[S]) -> Self {
        let value = values
            .iter()
            .map(|v| v.as_ref())
            .collect::<Vec<_>>()
            .join("\0")
            .into_bytes();
        Self {
            key: key.to_string(),
            kind: ApeItemKind::Text,
            read_only: false,
            value,
        }
    }

    pub fn binary(key: &str, data: Vec<u8>) -> Self {
        Self {
            key: key.to_string(),
            kind: ApeItemKind::Binary,
            read_only: false,
            value: data,
        }
    }

    pub fn locator(key: &str, link: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: ApeItemKind::Locator,
            read_only: false,
            value: link.as_bytes().to_vec(),
        }
    }

    /// Text values; empty for binary items
    pub fn values(&self) -> Vec<String> {
        if self.kind == ApeItemKind::Binary {
            return Vec::new();
        }
        String::from_utf8_lossy(&self.value)
            .split('\0')
            .map(str::to_string)
            .collect()
    }

    /// Rendered size
    pub fn size(&self) -> usize {
        8 + self.key.len() + 1 + self.value.len()
    }

    /// Parse one item from the front of `data`, returning it and its size
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < MIN_ITEM_SIZE {
            return Err(Error::corrupt(0, "APE item shorter than 11 bytes"));
        }
        let value_size = LittleEndian::read_u32(&data[0..4]) as usize;
        let flags = LittleEndian::read_u32(&data[4..8]);

        let key_len = data[8..]
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Error::corrupt(8, "APE item key not terminated"))?;
        let key_bytes = &data[8..8 + key_len];
        if !(2..=255).contains(&key_len) || !key_bytes.iter().all(|b| (0x20..=0x7E).contains(b)) {
            return Err(Error::corrupt(8, "invalid APE item key"));
        }
        let key = String::from_utf8_lossy(key_bytes).into_owned();

        let value_start = 8 + key_len + 1;
        let value_end = value_start
            .checked_add(value_size)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                Error::corrupt(0, format!("APE item {:?} value runs past the tag", key))
            })?;

        let item = Self {
            key,
            kind: ApeItemKind::from_flags(flags),
            read_only: flags & ITEM_READ_ONLY != 0,
            value: data[value_start..value_end].to_vec(),
        };
        Ok((item, value_end))
    }

    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        let mut word = [0u8; 4];
        LittleEndian::write_u32(&mut word, self.value.len() as u32);
        out.extend_from_slice(&word);
        let flags = self.kind.bits() | if self.read_only { ITEM_READ_ONLY } else { 0 };
        LittleEndian::write_u32(&mut word, flags);
        out.extend_from_slice(&word);
        out.extend_from_slice(self.key.as_bytes());
        out.push(0);
        out.extend_from_slice(&self.value);
        out
    }
}

/// An APEv2 tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApeTag {
    items: Vec<ApeItem>,
    header_present: bool,
}

impl Default for ApeTag {
    fn default() -> Self {
        Self::new()
    }
}

impl ApeTag {
    /// An empty tag that renders with both header and footer
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            header_present: true,
        }
    }

    /// Read the tag whose footer starts at `footer_position`
    pub fn read_from_footer<S: ByteStream + ?Sized>(
        stream: &mut S,
        footer_position: u64,
    ) -> Result<Self> {
        let footer = read_footer_at(stream, footer_position)?;
        if footer.is_header() {
            return Err(Error::corrupt(footer_position, "APE header where a footer was expected"));
        }
        let items_start = (footer_position + APE_FOOTER_SIZE as u64)
            .checked_sub(footer.tag_size as u64)
            .ok_or_else(|| Error::corrupt(footer_position, "APE tag larger than the stream"))?;
        Self::read_items(stream, &footer, items_start)
    }

    /// Read the tag whose header starts at `header_position`
    pub fn read_from_header<S: ByteStream + ?Sized>(
        stream: &mut S,
        header_position: u64,
    ) -> Result<Self> {
        let header = read_footer_at(stream, header_position)?;
        if !header.is_header() {
            return Err(Error::corrupt(header_position, "APE footer where a header was expected"));
        }
        Self::read_items(stream, &header, header_position + APE_FOOTER_SIZE as u64)
    }

    fn read_items<S: ByteStream + ?Sized>(
        stream: &mut S,
        footer: &ApeFooter,
        items_start: u64,
    ) -> Result<Self> {
        let items_size = footer.items_size();
        let data = stream.read_block_at(items_start, items_size as usize)?;
        if (data.len() as u64) < items_size {
            return Err(Error::corrupt(items_start, "APE items truncated"));
        }

        let mut tag = Self {
            items: Vec::with_capacity((footer.item_count as usize).min(64)),
            header_present: footer.header_present(),
        };
        let mut pos = 0;
        for _ in 0..footer.item_count {
            match ApeItem::parse(&data[pos..]) {
                Ok((item, size)) => {
                    tag.items.push(item);
                    pos += size;
                }
                Err(err) => {
                    debug!("APE item parsing stopped after {} items: {}", tag.items.len(), err);
                    break;
                }
            }
        }
        Ok(tag)
    }

    pub fn header_present(&self) -> bool {
        self.header_present
    }

    /// Whether a header is written in front of the items
    pub fn set_header_present(&mut self, present: bool) {
        self.header_present = present;
    }

    pub fn items(&self) -> &[ApeItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item; keys compare case-insensitively
    pub fn get(&self, key: &str) -> Option<&ApeItem> {
        self.items.iter().find(|item| item.key.eq_ignore_ascii_case(key))
    }

    /// Replace the item with the same key, or append
    pub fn set_item(&mut self, item: ApeItem) -> Result<()> {
        if FORBIDDEN_KEYS.iter().any(|k| item.key.eq_ignore_ascii_case(k))
            || !(2..=255).contains(&item.key.len())
            || !item.key.bytes().all(|b| (0x20..=0x7E).contains(&b))
        {
            return Err(Error::InvalidFormat(format!("invalid APE key {:?}", item.key)));
        }
        match self
            .items
            .iter_mut()
            .find(|existing| existing.key.eq_ignore_ascii_case(&item.key))
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.items.retain(|item| !item.key.eq_ignore_ascii_case(key));
    }

    /// First text value of `key`
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)?.values().into_iter().next()
    }

    /// Set a single text value; `None` removes the item
    pub fn set_text(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.set_item(ApeItem::text(key, &[value])),
            None => {
                self.remove(key);
                Ok(())
            }
        }
    }

    pub fn title(&self) -> Option<String> {
        self.get_text("Title")
    }

    pub fn set_title(&mut self, value: Option<&str>) -> Result<()> {
        self.set_text("Title", value)
    }

    pub fn artist(&self) -> Option<String> {
        self.get_text("Artist")
    }

    pub fn set_artist(&mut self, value: Option<&str>) -> Result<()> {
        self.set_text("Artist", value)
    }

    pub fn album(&self) -> Option<String> {
        self.get_text("Album")
    }

    pub fn set_album(&mut self, value: Option<&str>) -> Result<()> {
        self.set_text("Album", value)
    }

    pub fn comment(&self) -> Option<String> {
        self.get_text("Comment")
    }

    pub fn set_comment(&mut self, value: Option<&str>) -> Result<()> {
        self.set_text("Comment", value)
    }

    pub fn genre(&self) -> Option<String> {
        self.get_text("Genre")
    }

    pub fn set_genre(&mut self, value: Option<&str>) -> Result<()> {
        self.set_text("Genre", value)
    }

    /// Leading digits of the Year item
    pub fn year(&self) -> Option<u32> {
        leading_number(&self.get_text("Year")?)
    }

    pub fn set_year(&mut self, year: Option<u32>) -> Result<()> {
        self.set_text("Year", year.map(|y| y.to_string()).as_deref())
    }

    /// Track number, the part before any `/total`
    pub fn track(&self) -> Option<u32> {
        leading_number(&self.get_text("Track")?)
    }

    pub fn set_track(&mut self, track: Option<u32>) -> Result<()> {
        self.set_text("Track", track.map(|t| t.to_string()).as_deref())
    }

    /// Footer describing the tag as it would be rendered now
    pub fn footer(&self) -> ApeFooter {
        let items_size: usize = self.items.iter().map(ApeItem::size).sum();
        ApeFooter {
            version: APE_VERSION,
            tag_size: (items_size + APE_FOOTER_SIZE) as u32,
            item_count: self.items.len() as u32,
            flags: if self.header_present {
                FLAG_HEADER_PRESENT
            } else {
                0
            },
        }
    }

    /// Header (when present), items, footer
    pub fn render(&self) -> Result<Vec<u8>> {
        let items_size: usize = self.items.iter().map(ApeItem::size).sum();
        if items_size + APE_FOOTER_SIZE > u32::MAX as usize {
            return Err(Error::DataTooLarge {
                size: items_size as u64,
                max: (u32::MAX as usize - APE_FOOTER_SIZE) as u64,
            });
        }
        let footer = self.footer();
        let mut out = Vec::with_capacity(footer.complete_tag_size() as usize);
        if self.header_present {
            out.extend_from_slice(&footer.render_header());
        }
        for item in &self.items {
            out.extend_from_slice(&item.render());
        }
        out.extend_from_slice(&footer.render_footer());
        Ok(out)
    }
}

/// Parse the 32-byte header or footer at `position`
pub(crate) fn read_footer_at<S: ByteStream + ?Sized>(
    stream: &mut S,
    position: u64,
) -> Result<ApeFooter> {
    let data = stream.read_block_at(position, APE_FOOTER_SIZE)?;
    ApeFooter::parse(&data).map_err(|err| match err {
        Error::CorruptFile { offset, reason } => Error::corrupt(position + offset, reason),
        other => other,
    })
}

fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn footer_bytes(tag_size: u32, item_count: u32, flags: u32) -> Vec<u8> {
        ApeFooter {
            version: APE_VERSION,
            tag_size,
            item_count,
            flags,
        }
        .render(flags)
        .to_vec()
    }

    #[test]
    fn test_footer_flags() {
        let footer = ApeFooter::parse(&footer_bytes(64, 0, FLAG_HEADER_PRESENT)).unwrap();
        assert!(footer.header_present());
        assert!(footer.footer_present());
        assert!(!footer.is_header());
        assert_eq!(footer.complete_tag_size(), 96);

        let header = ApeFooter::parse(&footer.render_header()).unwrap();
        assert!(header.is_header());
        assert_eq!(header.tag_size, 64);
    }

    #[test]
    fn test_partial_signature_rejected() {
        let mut data = b"APEXXXXX".to_vec();
        data.resize(32, 0);
        assert!(ApeFooter::parse(&data).unwrap_err().is_corrupt());
        assert!(ApeFooter::parse(b"APETAGEX").unwrap_err().is_corrupt());
    }

    #[test]
    fn test_tag_size_smaller_than_footer_rejected() {
        assert!(ApeFooter::parse(&footer_bytes(0, 0, 0)).is_err());
    }

    #[test]
    fn test_single_item_footer_only() {
        // smallest legal item: 2-char key, empty value
        let item = ApeItem::text("Ab", &[""]).render();
        assert_eq!(item.len(), 11);

        let mut data = item.clone();
        data.extend_from_slice(&footer_bytes(32 + item.len() as u32, 1, 0));
        let mut stream = Cursor::new(data);
        let tag = ApeTag::read_from_footer(&mut stream, 11).unwrap();
        assert_eq!(tag.item_count(), 1);
        assert!(!tag.is_empty());
        assert!(!tag.header_present());
    }

    #[test]
    fn test_item_count_beyond_data_stops_quietly() {
        let item = ApeItem::text("Title", &["x"]).render();
        let mut data = item.clone();
        data.extend_from_slice(&footer_bytes(32 + item.len() as u32, 5, 0));
        let mut stream = Cursor::new(data);
        let tag = ApeTag::read_from_footer(&mut stream, item.len() as u64).unwrap();
        assert_eq!(tag.item_count(), 1);
        assert_eq!(tag.title().as_deref(), Some("x"));
    }

    #[test]
    fn test_item_kinds_and_flags() {
        let mut item = ApeItem::binary("Cover Art (Front)", vec![1, 2, 3]);
        item.read_only = true;
        let (parsed, size) = ApeItem::parse(&item.render()).unwrap();
        assert_eq!(parsed, item);
        assert_eq!(size, item.size());

        let link = ApeItem::locator("Related", "http://example.com");
        let (parsed, _) = ApeItem::parse(&link.render()).unwrap();
        assert_eq!(parsed.kind, ApeItemKind::Locator);
        assert!(parsed.values().contains(&"http://example.com".to_string()));
    }

    #[test]
    fn test_multi_value_text() {
        let item = ApeItem::text("Artist", &["One", "Two"]);
        assert_eq!(item.value, b"One\0Two");
        assert_eq!(item.values(), ["One", "Two"]);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut tag = ApeTag::new();
        tag.set_title(Some("first")).unwrap();
        tag.set_text("TITLE", Some("second")).unwrap();
        assert_eq!(tag.item_count(), 1);
        assert_eq!(tag.get_text("title").as_deref(), Some("second"));
        tag.remove("tItLe");
        assert!(tag.is_empty());
    }

    #[test]
    fn test_forbidden_keys() {
        let mut tag = ApeTag::new();
        assert!(tag.set_text("tag", Some("x")).is_err());
        assert!(tag.set_text("A", Some("x")).is_err());
        assert!(tag.set_text("Id3", Some("x")).is_err());
    }

    #[test]
    fn test_numbers() {
        let mut tag = ApeTag::new();
        tag.set_text("Track", Some("3/12")).unwrap();
        tag.set_text("Year", Some("1997-05-01")).unwrap();
        assert_eq!(tag.track(), Some(3));
        assert_eq!(tag.year(), Some(1997));
    }

    #[test]
    fn test_render_always_writes_version_2000() {
        let mut data = ApeItem::text("Album", &["A"]).render();
        let size = data.len() as u32 + 32;
        let mut footer = footer_bytes(size, 1, 0);
        LittleEndian::write_u32(&mut footer[8..12], 1000);
        data.extend_from_slice(&footer);
        let mut stream = Cursor::new(data.clone());
        let tag = ApeTag::read_from_footer(&mut stream, data.len() as u64 - 32).unwrap();

        let rendered = tag.render().unwrap();
        let end = rendered.len();
        assert_eq!(LittleEndian::read_u32(&rendered[end - 24..end - 20]), APE_VERSION);
        assert_eq!(&rendered[..end - 32], &data[..data.len() - 32]);
    }

    #[test]
    fn test_read_from_header() {
        let mut tag = ApeTag::new();
        tag.set_artist(Some("Someone")).unwrap();
        let data = tag.render().unwrap();
        let mut stream = Cursor::new(data);
        let read = ApeTag::read_from_header(&mut stream, 0).unwrap();
        assert_eq!(read, tag);
        assert!(ApeTag::read_from_footer(&mut stream, 0).is_err());
    }
}
