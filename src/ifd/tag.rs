//! A complete TIFF header + directory chain, as embedded in Exif blocks

use super::{
    decode_user_comment, tags, Entry, EntryValue, IfdReader, IfdRenderer, IfdStructure, ReadScope,
    ReaderOptions, Rational, VendorKind, ByteOrder,
};
use crate::{
    error::{Error, Result},
    stream::ByteStream,
};
use log::debug;

/// TIFF magic number following the byte order marker
pub const TIFF_MAGIC: u16 = 0x002A;

/// Size of the TIFF header
pub const TIFF_HEADER_SIZE: usize = 8;

/// Primary image directory
const IFD0: usize = 0;

/// An Exif/TIFF metadata block: byte order plus its directory chain
#[derive(Debug, Clone, PartialEq)]
pub struct IfdTag {
    pub order: ByteOrder,
    pub structure: IfdStructure,
}

impl Default for IfdTag {
    fn default() -> Self {
        Self::new(ByteOrder::BigEndian)
    }
}

impl IfdTag {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            structure: IfdStructure::new(),
        }
    }

    /// Read a tag whose TIFF header starts at `base_offset`
    ///
    /// Every offset inside the block is relative to `base_offset`.
    pub fn read<S: ByteStream + ?Sized>(
        stream: &mut S,
        base_offset: u64,
        options: ReaderOptions,
    ) -> Result<Self> {
        let header = stream.read_block_at(base_offset, TIFF_HEADER_SIZE)?;
        if header.len() < TIFF_HEADER_SIZE {
            return Err(Error::corrupt(base_offset, "TIFF header truncated"));
        }
        let order = ByteOrder::from_marker(&header[0..2])
            .ok_or_else(|| Error::corrupt(base_offset, "invalid TIFF byte order marker"))?;
        if order.read_u16(&header[2..4]) != TIFF_MAGIC {
            return Err(Error::corrupt(base_offset + 2, "invalid TIFF magic number"));
        }
        let ifd_offset = order.read_u32(&header[4..8]);
        debug!("TIFF header at {} ({:?}), IFD0 at {}", base_offset, order, ifd_offset);

        let structure = if ifd_offset == 0 {
            IfdStructure::new()
        } else {
            let mut reader = IfdReader::new(stream, options)?;
            reader.read(ReadScope::new(order, VendorKind::Exif, base_offset), ifd_offset)?
        };
        Ok(Self { order, structure })
    }

    /// Header followed by the chain, with IFD0 immediately after the header
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(self.order.marker());
        self.order.push_u16(&mut out, TIFF_MAGIC);
        self.order.push_u32(&mut out, TIFF_HEADER_SIZE as u32);
        let body = IfdRenderer::new(self.order).render(&self.structure, TIFF_HEADER_SIZE as u32)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Replace the `old_len` bytes at `base_offset` with the rendered tag
    ///
    /// Returns the new length of the block.
    pub fn save<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
        base_offset: u64,
        old_len: u64,
    ) -> Result<u64> {
        let data = self.render()?;
        stream.insert(&data, base_offset, old_len)?;
        Ok(data.len() as u64)
    }

    fn exif(&self) -> Option<&IfdStructure> {
        self.structure.sub_structure(IFD0, tags::EXIF_IFD_POINTER)
    }

    fn exif_mut(&mut self) -> &mut IfdStructure {
        self.structure.sub_structure_mut(IFD0, tags::EXIF_IFD_POINTER)
    }

    fn gps(&self) -> Option<&IfdStructure> {
        self.structure.sub_structure(IFD0, tags::GPS_IFD_POINTER)
    }

    fn gps_mut(&mut self) -> &mut IfdStructure {
        self.structure.sub_structure_mut(IFD0, tags::GPS_IFD_POINTER)
    }

    pub fn title(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::IMAGE_DESCRIPTION)
    }

    pub fn set_title(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::IMAGE_DESCRIPTION, value);
    }

    pub fn artist(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::ARTIST)
    }

    pub fn set_artist(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::ARTIST, value);
    }

    pub fn copyright(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::COPYRIGHT)
    }

    pub fn set_copyright(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::COPYRIGHT, value);
    }

    pub fn software(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::SOFTWARE)
    }

    pub fn set_software(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::SOFTWARE, value);
    }

    pub fn make(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::MAKE)
    }

    pub fn set_make(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::MAKE, value);
    }

    pub fn model(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::MODEL)
    }

    pub fn set_model(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::MODEL, value);
    }

    /// DateTime in Exif form (`YYYY:MM:DD HH:MM:SS`)
    pub fn date_time(&self) -> Option<&str> {
        self.structure.get_string_value(IFD0, tags::DATE_TIME)
    }

    pub fn set_date_time(&mut self, value: Option<&str>) {
        self.structure.set_string_value(IFD0, tags::DATE_TIME, value);
    }

    /// Orientation (1-8)
    pub fn orientation(&self) -> Option<u16> {
        self.structure
            .get_long_value(IFD0, tags::ORIENTATION)
            .and_then(|v| u16::try_from(v).ok())
    }

    pub fn set_orientation(&mut self, value: Option<u16>) {
        match value {
            Some(v) => self.structure.set_short_value(IFD0, tags::ORIENTATION, v),
            None => {
                self.structure.remove_tag(IFD0, tags::ORIENTATION);
            }
        }
    }

    /// Exif UserComment
    ///
    /// Fails with [`Error::UnsupportedEncoding`] for charsets other than
    /// ASCII, UNICODE and undefined.
    pub fn user_comment(&self) -> Result<Option<String>> {
        let Some(value) = self.exif().and_then(|e| e.get_value(IFD0, tags::USER_COMMENT)) else {
            return Ok(None);
        };
        match value {
            EntryValue::UserComment(text) => Ok(Some(text.clone())),
            EntryValue::Undefined(data) => decode_user_comment(self.order, data).map(Some),
            _ => Ok(None),
        }
    }

    pub fn set_user_comment(&mut self, value: Option<&str>) {
        match value {
            Some(text) => {
                self.exif_mut().set_entry(
                    IFD0,
                    Entry::new(tags::USER_COMMENT, EntryValue::UserComment(text.to_string())),
                );
            }
            None => {
                let exif = self
                    .structure
                    .get_entry_mut(IFD0, tags::EXIF_IFD_POINTER)
                    .and_then(|e| e.value.as_structure_mut());
                if let Some(exif) = exif {
                    exif.remove_tag(IFD0, tags::USER_COMMENT);
                }
            }
        }
    }

    /// Exposure time in seconds
    pub fn exposure_time(&self) -> Option<f64> {
        self.exif()?.get_rational_value(IFD0, tags::EXPOSURE_TIME)?.to_f64()
    }

    pub fn set_exposure_time(&mut self, value: Rational) {
        self.exif_mut().set_rational_value(IFD0, tags::EXPOSURE_TIME, value);
    }

    pub fn f_number(&self) -> Option<f64> {
        self.exif()?.get_rational_value(IFD0, tags::F_NUMBER)?.to_f64()
    }

    pub fn set_f_number(&mut self, value: Rational) {
        self.exif_mut().set_rational_value(IFD0, tags::F_NUMBER, value);
    }

    pub fn iso_speed(&self) -> Option<u32> {
        self.exif()?.get_long_value(IFD0, tags::ISO_SPEED)
    }

    pub fn set_iso_speed(&mut self, value: u16) {
        self.exif_mut().set_short_value(IFD0, tags::ISO_SPEED, value);
    }

    /// Focal length in millimetres
    pub fn focal_length(&self) -> Option<f64> {
        self.exif()?.get_rational_value(IFD0, tags::FOCAL_LENGTH)?.to_f64()
    }

    pub fn set_focal_length(&mut self, value: Rational) {
        self.exif_mut().set_rational_value(IFD0, tags::FOCAL_LENGTH, value);
    }

    /// Latitude in decimal degrees, negative south of the equator
    pub fn latitude(&self) -> Option<f64> {
        self.coordinate(tags::GPS_LATITUDE, tags::GPS_LATITUDE_REF, 'S')
    }

    pub fn set_latitude(&mut self, degrees: f64) {
        let reference = if degrees < 0.0 { "S" } else { "N" };
        self.set_coordinate(tags::GPS_LATITUDE, tags::GPS_LATITUDE_REF, reference, degrees);
    }

    /// Longitude in decimal degrees, negative west of Greenwich
    pub fn longitude(&self) -> Option<f64> {
        self.coordinate(tags::GPS_LONGITUDE, tags::GPS_LONGITUDE_REF, 'W')
    }

    pub fn set_longitude(&mut self, degrees: f64) {
        let reference = if degrees < 0.0 { "W" } else { "E" };
        self.set_coordinate(tags::GPS_LONGITUDE, tags::GPS_LONGITUDE_REF, reference, degrees);
    }

    /// Altitude in metres, negative below sea level
    pub fn altitude(&self) -> Option<f64> {
        let gps = self.gps()?;
        let metres = gps.get_rational_value(IFD0, tags::GPS_ALTITUDE)?.to_f64()?;
        match gps.get_long_value(IFD0, tags::GPS_ALTITUDE_REF) {
            Some(1) => Some(-metres),
            _ => Some(metres),
        }
    }

    pub fn set_altitude(&mut self, metres: f64) {
        let gps = self.gps_mut();
        gps.set_entry(
            IFD0,
            Entry::new(
                tags::GPS_ALTITUDE_REF,
                EntryValue::Byte(u8::from(metres < 0.0)),
            ),
        );
        let centimetres = (metres.abs() * 100.0).round() as u32;
        gps.set_rational_value(IFD0, tags::GPS_ALTITUDE, Rational::new(centimetres, 100));
    }

    fn coordinate(&self, tag: u16, ref_tag: u16, negative: char) -> Option<f64> {
        let gps = self.gps()?;
        let parts = gps.get_value(IFD0, tag)?.as_rationals()?;
        let mut value = 0.0;
        for (part, scale) in parts.iter().zip([1.0, 60.0, 3600.0]) {
            value += part.to_f64()? / scale;
        }
        let is_negative = gps
            .get_string_value(IFD0, ref_tag)
            .map(|r| r.starts_with(negative))
            .unwrap_or(false);
        Some(if is_negative { -value } else { value })
    }

    fn set_coordinate(&mut self, tag: u16, ref_tag: u16, reference: &str, degrees: f64) {
        let gps = self.gps_mut();
        gps.set_string_value(IFD0, ref_tag, Some(reference));
        gps.set_entry(
            IFD0,
            Entry::new(tag, EntryValue::RationalArray(to_dms(degrees.abs()).to_vec())),
        );
    }
}

/// Degrees, minutes and hundredths of seconds
fn to_dms(degrees: f64) -> [Rational; 3] {
    let whole = degrees.trunc();
    let minutes = ((degrees - whole) * 60.0).trunc();
    let seconds = (degrees - whole - minutes / 60.0) * 3600.0;
    [
        Rational::new(whole as u32, 1),
        Rational::new(minutes as u32, 1),
        Rational::new((seconds * 100.0).round() as u32, 100),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(tag: &IfdTag) -> IfdTag {
        let data = tag.render().unwrap();
        let mut stream = Cursor::new(data);
        IfdTag::read(&mut stream, 0, ReaderOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_tag_renders_header_and_empty_directory() {
        let tag = IfdTag::new(ByteOrder::LittleEndian);
        let data = tag.render().unwrap();
        assert_eq!(data, [b'I', b'I', 0x2A, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(round_trip(&tag).structure.is_empty());
    }

    #[test]
    fn test_header_validation() {
        let mut bad_marker = Cursor::new(b"XX\0\x2a\0\0\0\x08".to_vec());
        assert!(IfdTag::read(&mut bad_marker, 0, ReaderOptions::default())
            .unwrap_err()
            .is_corrupt());

        let mut bad_magic = Cursor::new(b"MM\0\x2b\0\0\0\x08".to_vec());
        assert!(IfdTag::read(&mut bad_magic, 0, ReaderOptions::default())
            .unwrap_err()
            .is_corrupt());

        let mut short = Cursor::new(b"MM\0".to_vec());
        assert!(IfdTag::read(&mut short, 0, ReaderOptions::default()).is_err());
    }

    #[test]
    fn test_properties_round_trip() {
        let mut tag = IfdTag::new(ByteOrder::BigEndian);
        tag.set_title(Some("Harbour at dawn"));
        tag.set_artist(Some("A. Photographer"));
        tag.set_make(Some("Canon"));
        tag.set_orientation(Some(6));
        tag.set_user_comment(Some("shot on a tripod"));
        tag.set_exposure_time(Rational::new(1, 250));
        tag.set_f_number(Rational::new(28, 10));
        tag.set_iso_speed(400);

        let read = round_trip(&tag);
        assert_eq!(read.title(), Some("Harbour at dawn"));
        assert_eq!(read.artist(), Some("A. Photographer"));
        assert_eq!(read.make(), Some("Canon"));
        assert_eq!(read.orientation(), Some(6));
        assert_eq!(read.user_comment().unwrap().as_deref(), Some("shot on a tripod"));
        assert_eq!(read.exposure_time(), Some(0.004));
        assert_eq!(read.f_number(), Some(2.8));
        assert_eq!(read.iso_speed(), Some(400));
        assert_eq!(read, tag);
    }

    #[test]
    fn test_gps_round_trip() {
        let mut tag = IfdTag::new(ByteOrder::LittleEndian);
        tag.set_latitude(-33.8568);
        tag.set_longitude(151.2153);
        tag.set_altitude(-12.5);

        let read = round_trip(&tag);
        assert!((read.latitude().unwrap() + 33.8568).abs() < 1e-5);
        assert!((read.longitude().unwrap() - 151.2153).abs() < 1e-5);
        assert_eq!(read.altitude(), Some(-12.5));
    }

    #[test]
    fn test_unsupported_user_comment_charset() {
        let mut tag = IfdTag::new(ByteOrder::LittleEndian);
        let mut data = b"JIS\0\0\0\0\0".to_vec();
        data.extend_from_slice(b"abc");
        tag.exif_mut().set_entry(
            0,
            Entry::new(tags::USER_COMMENT, EntryValue::Undefined(data)),
        );
        let read = round_trip(&tag);
        assert!(matches!(
            read.user_comment(),
            Err(Error::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_save_replaces_old_block() {
        let mut original = IfdTag::new(ByteOrder::LittleEndian);
        original.set_software(Some("v1"));
        let block = original.render().unwrap();

        let mut data = b"HEAD".to_vec();
        data.extend_from_slice(&block);
        data.extend_from_slice(b"TAIL");
        let mut stream = Cursor::new(data);

        let mut tag = IfdTag::read(&mut stream, 4, ReaderOptions::default()).unwrap();
        assert_eq!(tag.software(), Some("v1"));
        tag.set_software(Some("a much longer software name"));
        let new_len = tag.save(&mut stream, 4, block.len() as u64).unwrap();

        let bytes = stream.get_ref().clone();
        assert_eq!(&bytes[..4], b"HEAD");
        assert_eq!(&bytes[bytes.len() - 4..], b"TAIL");
        assert_eq!(bytes.len() as u64, 8 + new_len);

        let reread = IfdTag::read(&mut stream, 4, ReaderOptions::default()).unwrap();
        assert_eq!(reread.software(), Some("a much longer software name"));
    }
}
