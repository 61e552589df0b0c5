//! TIFF/Exif tag IDs

// IFD0 (main image) tags
pub const IMAGE_WIDTH: u16 = 0x0100;
pub const IMAGE_LENGTH: u16 = 0x0101;
pub const BITS_PER_SAMPLE: u16 = 0x0102;
pub const COMPRESSION: u16 = 0x0103;
pub const IMAGE_DESCRIPTION: u16 = 0x010E;
pub const MAKE: u16 = 0x010F;
pub const MODEL: u16 = 0x0110;
pub const STRIP_OFFSETS: u16 = 0x0111;
pub const ORIENTATION: u16 = 0x0112;
pub const ROWS_PER_STRIP: u16 = 0x0116;
pub const STRIP_BYTE_COUNTS: u16 = 0x0117;
pub const X_RESOLUTION: u16 = 0x011A;
pub const Y_RESOLUTION: u16 = 0x011B;
pub const RESOLUTION_UNIT: u16 = 0x0128;
pub const SOFTWARE: u16 = 0x0131;
pub const DATE_TIME: u16 = 0x0132;
pub const ARTIST: u16 = 0x013B;
pub const SUB_IFDS: u16 = 0x014A;
pub const COPYRIGHT: u16 = 0x8298;
pub const EXIF_IFD_POINTER: u16 = 0x8769;
pub const GPS_IFD_POINTER: u16 = 0x8825;

// IFD1 (thumbnail) tags
pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

// EXIF sub-IFD tags
pub const EXPOSURE_TIME: u16 = 0x829A;
pub const F_NUMBER: u16 = 0x829D;
pub const ISO_SPEED: u16 = 0x8827;
pub const EXIF_VERSION: u16 = 0x9000;
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const FOCAL_LENGTH: u16 = 0x920A;
pub const MAKER_NOTE: u16 = 0x927C;
pub const USER_COMMENT: u16 = 0x9286;
pub const INTEROPERABILITY_IFD_POINTER: u16 = 0xA005;

// GPS sub-IFD tags
pub const GPS_VERSION_ID: u16 = 0x0000;
pub const GPS_LATITUDE_REF: u16 = 0x0001;
pub const GPS_LATITUDE: u16 = 0x0002;
pub const GPS_LONGITUDE_REF: u16 = 0x0003;
pub const GPS_LONGITUDE: u16 = 0x0004;
pub const GPS_ALTITUDE_REF: u16 = 0x0005;
pub const GPS_ALTITUDE: u16 = 0x0006;

// Interoperability sub-IFD tags
pub const INTEROPERABILITY_INDEX: u16 = 0x0001;

// Maker note tags that point at nested directories
pub const NIKON3_PREVIEW_IFD: u16 = 0x0011;
pub const OLYMPUS_EQUIPMENT: u16 = 0x2010;
pub const OLYMPUS_CAMERA_SETTINGS: u16 = 0x2020;
pub const OLYMPUS_RAW_DEVELOPMENT: u16 = 0x2030;
pub const OLYMPUS_RAW_DEVELOPMENT2: u16 = 0x2031;
pub const OLYMPUS_IMAGE_PROCESSING: u16 = 0x2040;
pub const OLYMPUS_FOCUS_INFO: u16 = 0x2050;

/// Tags that hold an offset to a nested Exif-family directory
pub fn is_sub_ifd_pointer(tag: u16) -> bool {
    matches!(
        tag,
        EXIF_IFD_POINTER | GPS_IFD_POINTER | INTEROPERABILITY_IFD_POINTER
    )
}

/// Olympus (type 2) maker note tags holding nested directories
pub fn is_olympus_sub_ifd(tag: u16) -> bool {
    matches!(
        tag,
        OLYMPUS_EQUIPMENT
            | OLYMPUS_CAMERA_SETTINGS
            | OLYMPUS_RAW_DEVELOPMENT
            | OLYMPUS_RAW_DEVELOPMENT2
            | OLYMPUS_IMAGE_PROCESSING
            | OLYMPUS_FOCUS_INFO
    )
}
