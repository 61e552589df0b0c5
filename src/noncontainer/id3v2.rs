//! ID3v2 tags, kept as raw bytes
//!
//! Only the 10-byte header (and optional v2.4 footer) is interpreted here: it
//! gives the size needed to skip or replace the tag. The tag body is carried
//! byte-exact. With the `id3v2-frames` feature the body can be decoded to, and
//! rebuilt from, an [`id3::Tag`].

use crate::{
    error::{Error, Result},
    stream::ByteStream,
};
use log::debug;

/// Size of an ID3v2 header or footer
pub const ID3V2_HEADER_SIZE: usize = 10;

const HEADER_MAGIC: &[u8; 3] = b"ID3";
const FOOTER_MAGIC: &[u8; 3] = b"3DI";

/// Footer present (v2.4)
const FLAG_FOOTER: u8 = 0x10;

/// Parsed ID3v2 header or footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3v2Header {
    pub major_version: u8,
    pub revision: u8,
    pub flags: u8,
    /// Tag size after the header, footer excluded
    pub size: u32,
}

impl Id3v2Header {
    /// Parse an `ID3` header
    pub fn parse_header(data: &[u8]) -> Result<Self> {
        Self::parse(data, HEADER_MAGIC)
    }

    /// Parse a `3DI` footer
    pub fn parse_footer(data: &[u8]) -> Result<Self> {
        Self::parse(data, FOOTER_MAGIC)
    }

    fn parse(data: &[u8], magic: &[u8; 3]) -> Result<Self> {
        if data.len() < ID3V2_HEADER_SIZE {
            return Err(Error::corrupt(0, "ID3v2 header truncated"));
        }
        if &data[..3] != magic {
            return Err(Error::corrupt(0, "missing ID3v2 signature"));
        }
        let major_version = data[3];
        if !(2..=4).contains(&major_version) || data[4] == 0xFF {
            return Err(Error::corrupt(
                3,
                format!("unsupported ID3v2 version 2.{}.{}", major_version, data[4]),
            ));
        }
        Ok(Self {
            major_version,
            revision: data[4],
            flags: data[5],
            size: decode_synchsafe(&data[6..10])?,
        })
    }

    pub fn has_footer(&self) -> bool {
        self.flags & FLAG_FOOTER != 0
    }

    /// Bytes taken on disk, header and footer included
    pub fn complete_tag_size(&self) -> u64 {
        let footer = if self.has_footer() {
            ID3V2_HEADER_SIZE as u64
        } else {
            0
        };
        ID3V2_HEADER_SIZE as u64 + self.size as u64 + footer
    }

    pub fn render_header(&self) -> [u8; ID3V2_HEADER_SIZE] {
        self.render(HEADER_MAGIC)
    }

    fn render(&self, magic: &[u8; 3]) -> [u8; ID3V2_HEADER_SIZE] {
        let mut out = [0u8; ID3V2_HEADER_SIZE];
        out[..3].copy_from_slice(magic);
        out[3] = self.major_version;
        out[4] = self.revision;
        out[5] = self.flags;
        out[6..].copy_from_slice(&encode_synchsafe(self.size));
        out
    }
}

/// 28-bit integer stored 7 bits per byte
fn decode_synchsafe(data: &[u8]) -> Result<u32> {
    if data.iter().any(|b| b & 0x80 != 0) {
        return Err(Error::corrupt(6, "ID3v2 size is not synchsafe"));
    }
    Ok(data.iter().fold(0u32, |acc, b| (acc << 7) | *b as u32))
}

fn encode_synchsafe(value: u32) -> [u8; 4] {
    [
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ]
}

/// An ID3v2 tag: header, body and optional footer, byte for byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v2Tag {
    data: Vec<u8>,
}

impl Default for Id3v2Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl Id3v2Tag {
    /// An empty ID3v2.4 tag (header only)
    pub fn new() -> Self {
        let header = Id3v2Header {
            major_version: 4,
            revision: 0,
            flags: 0,
            size: 0,
        };
        Self {
            data: header.render_header().to_vec(),
        }
    }

    /// Wrap complete tag bytes, validating the header and size
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = Id3v2Header::parse_header(&data)?;
        if header.complete_tag_size() != data.len() as u64 {
            return Err(Error::corrupt(
                6,
                format!(
                    "ID3v2 header declares {} bytes, got {}",
                    header.complete_tag_size(),
                    data.len()
                ),
            ));
        }
        Ok(Self { data })
    }

    /// Read the tag whose header starts at `position`
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S, position: u64) -> Result<Self> {
        let raw = stream.read_block_at(position, ID3V2_HEADER_SIZE)?;
        let header = Id3v2Header::parse_header(&raw).map_err(|e| relocate(e, position))?;
        let size = header.complete_tag_size();
        let data = stream.read_block_at(position, size as usize)?;
        if (data.len() as u64) < size {
            return Err(Error::corrupt(position, "ID3v2 tag truncated"));
        }
        debug!("ID3v2.{} tag at {}, {} bytes", header.major_version, position, size);
        Ok(Self { data })
    }

    /// Read the tag whose footer starts at `footer_position`
    pub fn read_from_footer<S: ByteStream + ?Sized>(
        stream: &mut S,
        footer_position: u64,
    ) -> Result<Self> {
        let raw = stream.read_block_at(footer_position, ID3V2_HEADER_SIZE)?;
        let footer = Id3v2Header::parse_footer(&raw).map_err(|e| relocate(e, footer_position))?;
        let start = (footer_position + ID3V2_HEADER_SIZE as u64)
            .checked_sub(footer.complete_tag_size())
            .ok_or_else(|| Error::corrupt(footer_position, "ID3v2 tag larger than the stream"))?;
        let tag = Self::read(stream, start)?;
        if tag.header()? != footer {
            return Err(Error::corrupt(start, "ID3v2 header and footer disagree"));
        }
        Ok(tag)
    }

    pub fn header(&self) -> Result<Id3v2Header> {
        Id3v2Header::parse_header(&self.data)
    }

    pub fn complete_tag_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Only a header, no frames or padding
    pub fn is_empty(&self) -> bool {
        self.data.len() <= ID3V2_HEADER_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn render(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Decode the frames
    #[cfg(feature = "id3v2-frames")]
    pub fn frames(&self) -> Result<id3::Tag> {
        if self.is_empty() {
            return Ok(id3::Tag::new());
        }
        Ok(id3::Tag::read_from2(std::io::Cursor::new(&self.data))?)
    }

    /// Replace the tag with `frames`, keeping the major version where it can be written
    #[cfg(feature = "id3v2-frames")]
    pub fn set_frames(&mut self, frames: &id3::Tag) -> Result<()> {
        let version = match self.header()?.major_version {
            4 => id3::Version::Id3v24,
            // 2.2 cannot be written
            _ => id3::Version::Id3v23,
        };
        let mut data = Vec::new();
        frames.write_to(&mut data, version)?;
        self.data = data;
        Ok(())
    }

    #[cfg(feature = "id3v2-frames")]
    pub fn title(&self) -> Result<Option<String>> {
        use id3::TagLike;
        Ok(self.frames()?.title().map(str::to_string))
    }

    #[cfg(feature = "id3v2-frames")]
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        use id3::TagLike;
        let mut frames = self.frames()?;
        frames.set_title(title);
        self.set_frames(&frames)
    }

    #[cfg(feature = "id3v2-frames")]
    pub fn artist(&self) -> Result<Option<String>> {
        use id3::TagLike;
        Ok(self.frames()?.artist().map(str::to_string))
    }

    #[cfg(feature = "id3v2-frames")]
    pub fn set_artist(&mut self, artist: &str) -> Result<()> {
        use id3::TagLike;
        let mut frames = self.frames()?;
        frames.set_artist(artist);
        self.set_frames(&frames)
    }
}

/// Shift an error offset from block-relative to stream position
fn relocate(err: Error, position: u64) -> Error {
    match err {
        Error::CorruptFile { offset, reason } => Error::corrupt(position + offset, reason),
        other => other,
    }
}
