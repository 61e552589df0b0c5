#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tagstack_io::{IfdTag, NonContainerFile, ReaderOptions, TagKind};

fuzz_target!(|data: &[u8]| {
    // Any input as an Exif block: errors are fine, panics are not
    let mut cursor = Cursor::new(data.to_vec());
    if let Ok(tag) = IfdTag::read(&mut cursor, 0, ReaderOptions::default()) {
        let _ = tag.make();
        let _ = tag.user_comment();
        let _ = tag.latitude();
        let _ = tag.altitude();
        let _ = tag.structure.thumbnail(1);
        let _ = tag.render();
    }

    // Same bytes as a tagged audio stream
    if let Ok(file) = NonContainerFile::open(Cursor::new(data.to_vec())) {
        let _ = file.tag_types();
        for kind in [TagKind::Ape, TagKind::Id3v1, TagKind::Id3v2] {
            if let Some(tag) = file.tag(kind) {
                let _ = tag.render();
            }
        }
        if let Some(tag) = file.tag(TagKind::Id3v2).and_then(|t| t.as_id3v2()) {
            let _ = tag.title();
        }
    }
});
