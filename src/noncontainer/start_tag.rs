//! Tags at the head of a stream

use super::{
    ape::{read_footer_at, APE_FOOTER_SIZE, APE_PREAMBLE},
    id3v2::ID3V2_HEADER_SIZE,
    types_of, ApeTag, Id3v2Tag, StackTag, TagKind, TagTypes,
};
use crate::{error::Result, stream::ByteStream};
use log::{debug, warn};

/// Bytes needed to recognise any start tag
const SIGNATURE_SIZE: usize = if APE_FOOTER_SIZE > ID3V2_HEADER_SIZE {
    APE_FOOTER_SIZE
} else {
    ID3V2_HEADER_SIZE
};

/// The tags found at the start of a stream, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartTag {
    tags: Vec<StackTag>,
}

impl StartTag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan forward from offset 0, returning the tags and where the media begins
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S) -> Result<(Self, u64)> {
        let mut tags = Vec::new();
        let end = scan(stream, Some(&mut tags))?;
        Ok((Self { tags }, end))
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

    /// Append an empty tag of `kind` and return it
    ///
    /// ID3v1 cannot live at the start of a stream and is refused.
    pub fn add_tag(&mut self, kind: TagKind) -> Option<&mut StackTag> {
        if kind == TagKind::Id3v1 {
            return None;
        }
        self.tags.push(StackTag::empty(kind));
        self.tags.last_mut()
    }

    pub fn remove_tags(&mut self, types: TagTypes) {
        self.tags.retain(|t| !types.contains(t.kind().flag()));
    }

    /// Size of the tag region currently on disk, found by scanning again
    pub fn total_size<S: ByteStream + ?Sized>(&self, stream: &mut S) -> Result<u64> {
        scan(stream, None)
    }

    /// All tags back to back, in list order
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for tag in &self.tags {
            out.extend_from_slice(&tag.render()?);
        }
        Ok(out)
    }

    /// Replace the on-disk region with the rendered tags, returning the new size
    pub fn write<S: ByteStream + ?Sized>(&self, stream: &mut S) -> Result<u64> {
        let old_size = self.total_size(stream)?;
        let data = self.render()?;
        stream.insert(&data, 0, old_size)?;
        debug!("start tags: {} bytes replaced by {}", old_size, data.len());
        Ok(data.len() as u64)
    }
}

/// Walk the start tags, collecting them when `tags` is given; returns the end offset
fn scan<S: ByteStream + ?Sized>(stream: &mut S, mut tags: Option<&mut Vec<StackTag>>) -> Result<u64> {
    let length = stream.length()?;
    let mut position = 0u64;
    while position < length {
        match read_tag_at(stream, position) {
            Ok(Some((tag, size))) => {
                debug!("{:?} tag at {} ({} bytes)", tag.kind(), position, size);
                if let Some(tags) = tags.as_deref_mut() {
                    tags.push(tag);
                }
                position += size;
            }
            Ok(None) => break,
            Err(err) => {
                warn!("start tag scan stopped at {}: {}", position, err);
                break;
            }
        }
    }
    Ok(position)
}

fn read_tag_at<S: ByteStream + ?Sized>(
    stream: &mut S,
    position: u64,
) -> Result<Option<(StackTag, u64)>> {
    let head = stream.read_block_at(position, SIGNATURE_SIZE)?;

    if head.starts_with(APE_PREAMBLE) {
        let header = read_footer_at(stream, position)?;
        let tag = ApeTag::read_from_header(stream, position)?;
        return Ok(Some((StackTag::Ape(tag), header.complete_tag_size())));
    }
    if head.starts_with(b"ID3") {
        let tag = Id3v2Tag::read(stream, position)?;
        let size = tag.complete_tag_size();
        return Ok(Some((StackTag::Id3v2(tag), size)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream_with_start(tags: &[StackTag], media: &[u8]) -> Cursor<Vec<u8>> {
        let mut data = Vec::new();
        for tag in tags {
            data.extend_from_slice(&tag.render().unwrap());
        }
        data.extend_from_slice(media);
        Cursor::new(data)
    }

    #[test]
    fn test_scan_id3v2_then_ape() {
        let mut ape = ApeTag::new();
        ape.set_title(Some("t")).unwrap();
        let tags = [StackTag::Id3v2(Id3v2Tag::new()), StackTag::Ape(ape)];
        let mut stream = stream_with_start(&tags, b"\xFF\xFBaudio");

        let (start, media_start) = StartTag::read(&mut stream).unwrap();
        assert_eq!(start.tags(), &tags);
        assert_eq!(media_start, stream.get_ref().len() as u64 - 7);
        assert_eq!(start.tag_types(), TagTypes::APE | TagTypes::ID3V2);
    }

    #[test]
    fn test_no_tags() {
        let mut stream = Cursor::new(b"\xFF\xFBaudio".to_vec());
        let (start, media_start) = StartTag::read(&mut stream).unwrap();
        assert!(start.tags().is_empty());
        assert_eq!(media_start, 0);
    }

    #[test]
    fn test_corrupt_tag_stops_scan() {
        // ID3 signature with a non-synchsafe size
        let mut stream = Cursor::new(b"ID3\x04\0\0\xFF\xFF\xFF\xFFaudio".to_vec());
        let (start, media_start) = StartTag::read(&mut stream).unwrap();
        assert!(start.tags().is_empty());
        assert_eq!(media_start, 0);
    }

    #[test]
    fn test_write_replaces_region() {
        let mut stream = stream_with_start(&[StackTag::Id3v2(Id3v2Tag::new())], b"audio");
        let (mut start, _) = StartTag::read(&mut stream).unwrap();
        start.remove_tags(TagTypes::ID3V2);
        assert!(start.add_tag(TagKind::Id3v1).is_none());
        start.add_tag(TagKind::Ape);

        let old_len = stream.get_ref().len() as u64;
        let old_total = start.total_size(&mut stream).unwrap();
        let new_total = start.write(&mut stream).unwrap();
        assert_eq!(
            stream.get_ref().len() as u64,
            old_len - old_total + new_total
        );
        assert_eq!(start.total_size(&mut stream).unwrap(), new_total);
        assert!(stream.get_ref().ends_with(b"audio"));
    }
}
