//! Synthetic fixtures for tests.
//!
//! Builders for TIFF/Exif blocks, raw directories and tagged audio streams,
//! so tests do not depend on binary files checked into the repository.
//!
//! # Usage
//!
//! ```no_run
//! use tagstack_io::test_utils::*;
//! use tagstack_io::ifd::ByteOrder;
//!
//! # fn example() -> tagstack_io::Result<()> {
//! // A complete Exif block with Exif, GPS and thumbnail directories
//! let block = sample_exif_block(ByteOrder::BigEndian)?;
//!
//! // An MP3-like stream with ID3v2 in front and APE + ID3v1 behind
//! let stream = tagged_stream(
//!     &[sample_id3v2()?],
//!     &media_bytes(1000),
//!     &[sample_ape()?, sample_id3v1()],
//! )?;
//! # Ok(())
//! # }
//! ```

use std::io::Cursor;

use crate::{
    ifd::{
        tags, ByteOrder, IfdStructure, IfdTag, MakerNote, MakerNoteBase, Rational, VendorKind,
    },
    noncontainer::{ApeTag, Id3v1Tag, Id3v2Tag, StackTag},
    Result,
};

/// One raw directory record: tag, type code, count, value bytes
pub type RawRecord = (u16, u16, u32, [u8; 4]);

/// TIFF header pointing at `ifd_offset`
pub fn tiff_header(order: ByteOrder, ifd_offset: u32) -> Vec<u8> {
    let mut out = order.marker().to_vec();
    order.push_u16(&mut out, 0x002A);
    order.push_u32(&mut out, ifd_offset);
    out
}

/// A raw directory (count, records, next pointer) exactly as given
///
/// Nothing is validated, which makes this the tool for corrupt inputs.
pub fn directory_bytes(order: ByteOrder, records: &[RawRecord], next: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + records.len() * 12 + 4);
    order.push_u16(&mut out, records.len() as u16);
    for (tag, type_code, count, value) in records {
        order.push_u16(&mut out, *tag);
        order.push_u16(&mut out, *type_code);
        order.push_u32(&mut out, *count);
        out.extend_from_slice(value);
    }
    order.push_u32(&mut out, next);
    out
}

/// Four value bytes holding `value` as a LONG or offset
pub fn long_value(order: ByteOrder, value: u32) -> [u8; 4] {
    let mut out = Vec::with_capacity(4);
    order.push_u32(&mut out, value);
    [out[0], out[1], out[2], out[3]]
}

/// A camera-like tag: IFD0 strings, Exif and GPS sub-IFDs, thumbnail IFD1
pub fn sample_exif_tag(order: ByteOrder) -> IfdTag {
    let mut tag = IfdTag::new(order);
    tag.set_make(Some("Canon"));
    tag.set_model(Some("Canon EOS 5D"));
    tag.set_software(Some("tagstack-io"));
    tag.set_date_time(Some("2024:05:01 12:30:00"));
    tag.set_orientation(Some(1));
    tag.set_exposure_time(Rational::new(1, 125));
    tag.set_f_number(Rational::new(56, 10));
    tag.set_iso_speed(200);
    tag.set_focal_length(Rational::new(50, 1));
    tag.set_user_comment(Some("synthetic"));
    tag.set_latitude(48.8584);
    tag.set_longitude(2.2945);
    tag.set_altitude(35.0);
    tag.structure.set_thumbnail(1, jpeg_stub(64));
    tag.structure.set_short_value(1, tags::ORIENTATION, 1);
    tag
}

/// [`sample_exif_tag`] rendered
pub fn sample_exif_block(order: ByteOrder) -> Result<Vec<u8>> {
    sample_exif_tag(order).render()
}

/// Bytes shaped like a JPEG (SOI, filler, EOI)
pub fn jpeg_stub(len: usize) -> Vec<u8> {
    let len = len.max(4);
    let mut out = vec![0xFF, 0xD8];
    out.resize(len - 2, 0x55);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Type-3 Nikon maker note wrapping `structure` behind an embedded TIFF header
pub fn nikon3_maker_note(order: ByteOrder, structure: IfdStructure) -> MakerNote {
    let mut header = b"Nikon\0\x02\x10\0\0".to_vec();
    header.extend_from_slice(&tiff_header(order, 8));
    MakerNote {
        vendor: VendorKind::Nikon3,
        header,
        order,
        base: MakerNoteBase::Embedded(10),
        structure,
    }
}

/// Audio-like payload that no tag scanner mistakes for a tag
pub fn media_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| if i % 417 == 0 { 0xFF } else { (i % 200) as u8 + 0x20 })
        .collect()
}

pub fn sample_ape() -> Result<StackTag> {
    let mut ape = ApeTag::new();
    ape.set_title(Some("APE Title"))?;
    ape.set_artist(Some("APE Artist"))?;
    ape.set_track(Some(3))?;
    Ok(StackTag::Ape(ape))
}

pub fn sample_id3v1() -> StackTag {
    StackTag::Id3v1(Id3v1Tag {
        title: "v1 title".into(),
        artist: "v1 artist".into(),
        year: "2001".into(),
        track: 9,
        ..Id3v1Tag::new()
    })
}

/// Empty ID3v2.4 tag with 22 bytes of padding
pub fn sample_id3v2() -> Result<StackTag> {
    let mut data = b"ID3\x04\0\0\0\0\0\x16".to_vec();
    data.resize(32, 0);
    Ok(StackTag::Id3v2(Id3v2Tag::from_bytes(data)?))
}

/// A stream of `start` tags, `media`, then `end` tags, in the order given
pub fn tagged_stream(
    start: &[StackTag],
    media: &[u8],
    end: &[StackTag],
) -> Result<Cursor<Vec<u8>>> {
    let mut data = Vec::new();
    for tag in start {
        data.extend_from_slice(&tag.render()?);
    }
    data.extend_from_slice(media);
    for tag in end {
        data.extend_from_slice(&tag.render()?);
    }
    Ok(Cursor::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReaderOptions;

    #[test]
    fn test_sample_exif_reads_back() {
        let block = sample_exif_block(ByteOrder::LittleEndian).unwrap();
        let mut stream = Cursor::new(block);
        let tag = IfdTag::read(&mut stream, 0, ReaderOptions::default()).unwrap();
        assert_eq!(tag, sample_exif_tag(ByteOrder::LittleEndian));
    }

    #[test]
    fn test_sample_id3v2_is_padded() {
        let tag = sample_id3v2().unwrap();
        assert_eq!(tag.render().unwrap().len(), 32);
    }

    #[test]
    fn test_sample_ape_fixture_is_complete() {
        let tag = sample_ape().unwrap();
        let ape = tag.as_ape().unwrap();
        assert_eq!(ape.item_count(), 3);
        assert_eq!(ape.artist().as_deref(), Some("APE Artist"));
    }

    #[test]
    fn test_media_has_no_signatures() {
        let media = media_bytes(4096);
        for sig in [&b"TAG"[..], b"ID3", b"3DI", b"APETAGEX"] {
            assert!(!media.windows(sig.len()).any(|w| w == sig));
        }
    }
}
