//! Tags at the tail of a stream

use super::{
    ape::{read_footer_at, APE_FOOTER_SIZE, APE_PREAMBLE},
    id3v1::{ID3V1_MAGIC, ID3V1_SIZE},
    id3v2::{Id3v2Header, ID3V2_HEADER_SIZE},
    types_of, ApeTag, Id3v1Tag, Id3v2Tag, StackTag, TagKind, TagTypes,
};
use crate::{
    error::{Error, Result},
    stream::ByteStream,
};
use log::{debug, warn};

/// The tags found at the end of a stream, in file order
///
/// However the list is ordered, ID3v1 is always rendered last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndTag {
    tags: Vec<StackTag>,
}

impl EndTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan backwards from the end, never past `floor`
    ///
    /// Returns the tags and where they begin, which is where the media ends.
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S, floor: u64) -> Result<(Self, u64)> {
        let mut tags = Vec::new();
        let start = scan(stream, floor, Some(&mut tags))?;
        tags.reverse();
        Ok((Self { tags }, start))
    }

    pub fn tags(&self) -> &[StackTag] {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut [StackTag] {
        &mut self.tags
    }

    pub fn tag_types(&self) -> TagTypes {
        types_of(&self.tags)
    }

    pub fn find(&self, kind: TagKind) -> Option<&StackTag> {
        self.tags.iter().find(|t| t.kind() == kind)
    }

    pub fn find_mut(&mut self, kind: TagKind) -> Option<&mut StackTag> {
        self.tags.iter_mut().find(|t| t.kind() == kind)
    }

    /// Add an empty tag of `kind` in front of any ID3v1 tag and return it
    pub fn add_tag(&mut self, kind: TagKind) -> &mut StackTag {
        let index = match kind {
            TagKind::Id3v1 => self.tags.len(),
            _ => self
                .tags
                .iter()
                .position(|t| t.kind() == TagKind::Id3v1)
                .unwrap_or(self.tags.len()),
        };
        self.tags.insert(index, StackTag::empty(kind));
        &mut self.tags[index]
    }

    pub fn remove_tags(&mut self, types: TagTypes) {
        self.tags.retain(|t| !types.contains(t.kind().flag()));
    }

    /// Size of the tag region currently on disk, found by scanning again
    pub fn total_size<S: ByteStream + ?Sized>(&self, stream: &mut S, floor: u64) -> Result<u64> {
        let length = stream.length()?;
        let start = scan(stream, floor, None)?;
        Ok(length - start)
    }

    /// All tags back to back, ID3v1 last
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let (id3v1, others): (Vec<&StackTag>, Vec<&StackTag>) = self
            .tags
            .iter()
            .partition(|t| t.kind() == TagKind::Id3v1);
        for tag in others.into_iter().chain(id3v1) {
            out.extend_from_slice(&tag.render()?);
        }
        Ok(out)
    }

    /// Replace the on-disk region with the rendered tags, returning the new size
    pub fn write<S: ByteStream + ?Sized>(&self, stream: &mut S, floor: u64) -> Result<u64> {
        let old_size = self.total_size(stream, floor)?;
        let region_start = stream.length()? - old_size;
        let data = self.render()?;
        stream.insert(&data, region_start, old_size)?;
        debug!("end tags: {} bytes replaced by {}", old_size, data.len());
        Ok(data.len() as u64)
    }
}

/// Walk the end tags backwards, collecting them when `tags` is given
///
/// Returns the offset where the first end tag starts. Tags are pushed last first.
fn scan<S: ByteStream + ?Sized>(
    stream: &mut S,
    floor: u64,
    mut tags: Option<&mut Vec<StackTag>>,
) -> Result<u64> {
    let mut position = stream.length()?;
    while position > floor {
        match read_tag_before(stream, position, floor) {
            Ok(Some((tag, size))) => {
                debug!("{:?} tag ending at {} ({} bytes)", tag.kind(), position, size);
                if let Some(tags) = tags.as_deref_mut() {
                    tags.push(tag);
                }
                position -= size;
            }
            Ok(None) => break,
            Err(err) => {
                warn!("end tag scan stopped at {}: {}", position, err);
                break;
            }
        }
    }
    Ok(position)
}

/// Recognise the tag ending at `position`
///
/// Suffixes are tried in a fixed order: APE footer, ID3v2 footer, ID3v1.
fn read_tag_before<S: ByteStream + ?Sized>(
    stream: &mut S,
    position: u64,
    floor: u64,
) -> Result<Option<(StackTag, u64)>> {
    let available = position - floor;
    let tail_len = (ID3V1_SIZE as u64).min(available);
    let block = stream.read_block_at(position - tail_len, tail_len as usize)?;
    let len = block.len();

    if len >= APE_FOOTER_SIZE && block[len - APE_FOOTER_SIZE..].starts_with(APE_PREAMBLE) {
        let footer_position = position - APE_FOOTER_SIZE as u64;
        let footer = read_footer_at(stream, footer_position)?;
        let size = footer.complete_tag_size();
        check_fits(size, available, footer_position)?;
        let tag = ApeTag::read_from_footer(stream, footer_position)?;
        return Ok(Some((StackTag::Ape(tag), size)));
    }

    if len >= ID3V2_HEADER_SIZE && block[len - ID3V2_HEADER_SIZE..].starts_with(b"3DI") {
        let footer_position = position - ID3V2_HEADER_SIZE as u64;
        let footer = Id3v2Header::parse_footer(&block[len - ID3V2_HEADER_SIZE..])?;
        check_fits(footer.complete_tag_size(), available, footer_position)?;
        let tag = Id3v2Tag::read_from_footer(stream, footer_position)?;
        let size = tag.complete_tag_size();
        return Ok(Some((StackTag::Id3v2(tag), size)));
    }

    if len == ID3V1_SIZE && block.starts_with(ID3V1_MAGIC) {
        let tag = Id3v1Tag::parse(&block)?;
        return Ok(Some((StackTag::Id3v1(tag), ID3V1_SIZE as u64)));
    }

    Ok(None)
}

fn check_fits(size: u64, available: u64, position: u64) -> Result<()> {
    if size > available {
        return Err(Error::corrupt(
            position,
            format!("tag of {} bytes overruns the {} bytes before it", size, available),
        ));
    }
    Ok(())
}
