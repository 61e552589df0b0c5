//! A stream with tag stacks at both ends

use super::{EndTag, StackTag, StartTag, TagKind, TagTypes};
use crate::{error::Result, stream::ByteStream};
use log::debug;

/// A non-container file: start tags, media, end tags
///
/// Owns its stream. Tags are read once when the file is opened and written
/// back by [`save`](Self::save), the start region first and then the end.
pub struct NonContainerFile<S: ByteStream> {
    stream: S,
    start: StartTag,
    end: EndTag,
    media_start: u64,
    media_end: u64,
}

impl<S: ByteStream> NonContainerFile<S> {
    /// Read the start and end tags of `stream`
    pub fn open(mut stream: S) -> Result<Self> {
        let (start, media_start) = StartTag::read(&mut stream)?;
        let (end, media_end) = EndTag::read(&mut stream, media_start)?;
        debug!(
            "media spans {}..{} ({:?} at start, {:?} at end)",
            media_start,
            media_end,
            start.tag_types(),
            end.tag_types()
        );
        Ok(Self {
            stream,
            start,
            end,
            media_start,
            media_end,
        })
    }

    /// First byte after the start tags
    pub fn media_start(&self) -> u64 {
        self.media_start
    }

    /// First byte of the end tags
    pub fn media_end(&self) -> u64 {
        self.media_end
    }

    pub fn start_tag(&self) -> &StartTag {
        &self.start
    }

    pub fn start_tag_mut(&mut self) -> &mut StartTag {
        &mut self.start
    }

    pub fn end_tag(&self) -> &EndTag {
        &self.end
    }

    pub fn end_tag_mut(&mut self) -> &mut EndTag {
        &mut self.end
    }

    /// Kinds present at either end
    pub fn tag_types(&self) -> TagTypes {
        self.start.tag_types() | self.end.tag_types()
    }

    /// First tag of `kind`, start tags searched before end tags
    pub fn tag(&self, kind: TagKind) -> Option<&StackTag> {
        self.start.find(kind).or_else(|| self.end.find(kind))
    }

    pub fn tag_mut(&mut self, kind: TagKind) -> Option<&mut StackTag> {
        match self.start.find_mut(kind) {
            Some(tag) => Some(tag),
            None => self.end.find_mut(kind),
        }
    }

    /// Existing tag of `kind`, or a new empty one
    ///
    /// New ID3v2 tags go to the start, APE and ID3v1 tags to the end.
    pub fn get_or_create_tag(&mut self, kind: TagKind) -> &mut StackTag {
        if let Some(index) = self.start.tags().iter().position(|t| t.kind() == kind) {
            return &mut self.start.tags_mut()[index];
        }
        if let Some(index) = self.end.tags().iter().position(|t| t.kind() == kind) {
            return &mut self.end.tags_mut()[index];
        }
        match kind {
            TagKind::Id3v2 => match self.start.add_tag(kind) {
                Some(tag) => tag,
                None => self.end.add_tag(kind),
            },
            TagKind::Ape | TagKind::Id3v1 => self.end.add_tag(kind),
        }
    }

    /// Drop every tag whose kind is in `types`, at both ends
    pub fn remove_tags(&mut self, types: TagTypes) {
        self.start.remove_tags(types);
        self.end.remove_tags(types);
    }

    /// Write both tag regions, start then end, one insert each
    pub fn save(&mut self) -> Result<()> {
        let old_media_start = self.media_start;
        let start_size = self.start.write(&mut self.stream)?;
        self.media_start = start_size;

        let floor = self.media_start;
        let end_size = self.end.write(&mut self.stream, floor)?;
        let length = self.stream.length()?;
        self.media_end = length - end_size;
        debug!(
            "saved: media start {} -> {}, end tags {} bytes",
            old_media_start, self.media_start, end_size
        );
        Ok(())
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noncontainer::{ApeTag, Id3v1Tag, Id3v2Tag};
    use std::io::Cursor;

    #[test]
    fn test_get_or_create_places_tags() {
        let mut file = NonContainerFile::open(Cursor::new(b"audio".to_vec())).unwrap();
        assert_eq!(file.tag_types(), TagTypes::empty());

        file.get_or_create_tag(TagKind::Id3v1);
        file.get_or_create_tag(TagKind::Ape);
        file.get_or_create_tag(TagKind::Id3v2);
        assert_eq!(file.start_tag().tag_types(), TagTypes::ID3V2);
        assert_eq!(file.end_tag().tag_types(), TagTypes::APE | TagTypes::ID3V1);

        // a second request returns the existing tag
        file.get_or_create_tag(TagKind::Ape);
        assert_eq!(file.end_tag().tags().len(), 2);
    }

    #[test]
    fn test_save_moves_boundaries() {
        let mut data = Id3v2Tag::new().render();
        data.extend_from_slice(b"audio");
        data.extend_from_slice(&Id3v1Tag::new().render());
        let mut file = NonContainerFile::open(Cursor::new(data)).unwrap();
        assert_eq!(file.media_start(), 10);
        assert_eq!(file.media_end(), 15);

        file.remove_tags(TagTypes::ID3V2);
        if let Some(ape) = file.get_or_create_tag(TagKind::Ape).as_ape_mut() {
            ape.set_album(Some("Album")).unwrap();
        }
        file.save().unwrap();
        assert_eq!(file.media_start(), 0);
        assert_eq!(file.media_end(), 5);

        let stream = file.into_inner();
        let reopened = NonContainerFile::open(stream).unwrap();
        assert_eq!(reopened.media_start(), 0);
        assert_eq!(reopened.media_end(), 5);
        let ape = reopened.tag(TagKind::Ape).and_then(StackTag::as_ape);
        assert_eq!(ape.and_then(ApeTag::album).as_deref(), Some("Album"));
    }
}
