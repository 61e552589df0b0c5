//! Tag stacks at the head and tail of otherwise unstructured streams
//!
//! MP3, Musepack and WavPack style files carry their metadata as independent
//! tag blocks glued to either end of the audio data:
//!
//! ```text
//! [ID3v2][APE] ... audio ... [APE][ID3v2 with footer][ID3v1]
//! ```
//!
//! [`StartTag`] and [`EndTag`] find these blocks by signature, keep them in
//! file order and write each group back with a single
//! [`ByteStream::insert`](crate::ByteStream::insert).

mod ape;
mod end_tag;
mod file;
mod id3v1;
mod id3v2;
mod start_tag;

pub use ape::{ApeFooter, ApeItem, ApeItemKind, ApeTag, APE_FOOTER_SIZE, APE_VERSION};
pub use end_tag::EndTag;
pub use file::NonContainerFile;
pub use id3v1::{Id3v1Tag, ID3V1_SIZE};
pub use id3v2::{Id3v2Header, Id3v2Tag, ID3V2_HEADER_SIZE};
pub use start_tag::StartTag;

use crate::error::Result;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Set of tag formats present in, or to be removed from, a stack
    pub struct TagTypes: u32 {
        /// APEv2
        const APE = 0x0001;
        /// ID3v1 / ID3v1.1
        const ID3V1 = 0x0002;
        /// ID3v2.2 - 2.4
        const ID3V2 = 0x0004;
    }
}

/// A single tag format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Ape,
    Id3v1,
    Id3v2,
}

impl TagKind {
    pub fn flag(self) -> TagTypes {
        match self {
            Self::Ape => TagTypes::APE,
            Self::Id3v1 => TagTypes::ID3V1,
            Self::Id3v2 => TagTypes::ID3V2,
        }
    }
}

/// One tag block of a stack
#[derive(Debug, Clone, PartialEq)]
pub enum StackTag {
    Ape(ApeTag),
    Id3v1(Id3v1Tag),
    Id3v2(Id3v2Tag),
}

impl StackTag {
    /// A new empty tag of `kind`
    pub fn empty(kind: TagKind) -> Self {
        match kind {
            TagKind::Ape => Self::Ape(ApeTag::new()),
            TagKind::Id3v1 => Self::Id3v1(Id3v1Tag::new()),
            TagKind::Id3v2 => Self::Id3v2(Id3v2Tag::new()),
        }
    }

    pub fn kind(&self) -> TagKind {
        match self {
            Self::Ape(_) => TagKind::Ape,
            Self::Id3v1(_) => TagKind::Id3v1,
            Self::Id3v2(_) => TagKind::Id3v2,
        }
    }

    /// Bytes as written to the stream, framing included
    pub fn render(&self) -> Result<Vec<u8>> {
        match self {
            Self::Ape(tag) => tag.render(),
            Self::Id3v1(tag) => Ok(tag.render().to_vec()),
            Self::Id3v2(tag) => Ok(tag.render()),
        }
    }

    pub fn as_ape(&self) -> Option<&ApeTag> {
        match self {
            Self::Ape(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_ape_mut(&mut self) -> Option<&mut ApeTag> {
        match self {
            Self::Ape(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_id3v1(&self) -> Option<&Id3v1Tag> {
        match self {
            Self::Id3v1(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_id3v1_mut(&mut self) -> Option<&mut Id3v1Tag> {
        match self {
            Self::Id3v1(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_id3v2(&self) -> Option<&Id3v2Tag> {
        match self {
            Self::Id3v2(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_id3v2_mut(&mut self) -> Option<&mut Id3v2Tag> {
        match self {
            Self::Id3v2(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Union of the kinds in a tag list
fn types_of(tags: &[StackTag]) -> TagTypes {
    tags.iter()
        .fold(TagTypes::empty(), |acc, tag| acc | tag.kind().flag())
}
