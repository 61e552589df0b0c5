//! ID3v1 / ID3v1.1 tags
//!
//! A fixed 128-byte block at the very end of a file:
//!
//! ```text
//! "TAG" title(30) artist(30) album(30) year(4) comment(30) genre(1)
//! ```
//!
//! ID3v1.1 steals the last two comment bytes for a zero byte and a track number.
//! Text is Latin-1, padded with NUL.

use crate::error::{Error, Result};

/// Size of an ID3v1 tag
pub const ID3V1_SIZE: usize = 128;

/// Signature starting every ID3v1 tag
pub const ID3V1_MAGIC: &[u8; 3] = b"TAG";

/// Genre byte meaning "none"
const NO_GENRE: u8 = 0xFF;

/// An ID3v1 tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    /// ID3v1.1 track number, 0 for none
    pub track: u8,
    /// Index into the Winamp genre list, 255 for none
    pub genre: u8,
}

impl Default for Id3v1Tag {
    fn default() -> Self {
        Self::new()
    }
}

impl Id3v1Tag {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            year: String::new(),
            comment: String::new(),
            track: 0,
            genre: NO_GENRE,
        }
    }

    /// Parse a 128-byte block
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < ID3V1_SIZE {
            return Err(Error::corrupt(0, "ID3v1 tag truncated"));
        }
        if &data[..3] != ID3V1_MAGIC {
            return Err(Error::corrupt(0, "missing ID3v1 TAG signature"));
        }

        // ID3v1.1: zero byte then track number at the end of the comment field
        let (comment, track) = if data[125] == 0 && data[126] != 0 {
            (&data[97..125], data[126])
        } else {
            (&data[97..127], 0)
        };

        Ok(Self {
            title: latin1_field(&data[3..33]),
            artist: latin1_field(&data[33..63]),
            album: latin1_field(&data[63..93]),
            year: latin1_field(&data[93..97]),
            comment: latin1_field(comment),
            track,
            genre: data[127],
        })
    }

    pub fn render(&self) -> [u8; ID3V1_SIZE] {
        let mut out = [0u8; ID3V1_SIZE];
        out[..3].copy_from_slice(ID3V1_MAGIC);
        write_latin1(&mut out[3..33], &self.title);
        write_latin1(&mut out[33..63], &self.artist);
        write_latin1(&mut out[63..93], &self.album);
        write_latin1(&mut out[93..97], &self.year);
        if self.track != 0 {
            write_latin1(&mut out[97..125], &self.comment);
            out[126] = self.track;
        } else {
            write_latin1(&mut out[97..127], &self.comment);
        }
        out[127] = self.genre;
        out
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.artist.is_empty()
            && self.album.is_empty()
            && self.year.is_empty()
            && self.comment.is_empty()
            && self.track == 0
            && self.genre == NO_GENRE
    }

    /// Year as a number, when the field holds one
    pub fn year_number(&self) -> Option<u32> {
        self.year.trim().parse().ok()
    }
}

fn latin1_field(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    data[..end]
        .iter()
        .map(|b| *b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Latin-1 encode into a fixed field; characters outside Latin-1 become '?'
fn write_latin1(field: &mut [u8], text: &str) {
    for (slot, c) in field.iter_mut().zip(text.chars()) {
        *slot = u8::try_from(u32::from(c)).unwrap_or(b'?');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_v11() {
        let tag = Id3v1Tag {
            title: "Café del Mar".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            year: "1999".into(),
            comment: "Comment".into(),
            track: 7,
            genre: 17,
        };
        let data = tag.render();
        assert_eq!(&data[..3], b"TAG");
        assert_eq!(data[125], 0);
        assert_eq!(data[126], 7);
        assert_eq!(Id3v1Tag::parse(&data).unwrap(), tag);
        assert_eq!(tag.year_number(), Some(1999));
    }

    #[test]
    fn test_v10_comment_uses_full_field() {
        let mut data = [0u8; 128];
        data[..3].copy_from_slice(b"TAG");
        data[97..127].copy_from_slice(&[b'c'; 30]);
        data[127] = NO_GENRE;
        let tag = Id3v1Tag::parse(&data).unwrap();
        assert_eq!(tag.comment.len(), 30);
        assert_eq!(tag.track, 0);
    }

    #[test]
    fn test_long_and_non_latin1_text() {
        let tag = Id3v1Tag {
            title: "x".repeat(40),
            artist: "日本".into(),
            ..Id3v1Tag::new()
        };
        let parsed = Id3v1Tag::parse(&tag.render()).unwrap();
        assert_eq!(parsed.title, "x".repeat(30));
        assert_eq!(parsed.artist, "??");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Id3v1Tag::parse(&[0u8; 128]).is_err());
        assert!(Id3v1Tag::parse(b"TAG").is_err());
        assert!(Id3v1Tag::new().is_empty());
    }
}
