#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tagstack_io::{IfdTag, NonContainerFile, ReaderOptions, TagKind, TagTypes};

fuzz_target!(|data: &[u8]| {
    // Whatever parses must save and parse again
    let mut cursor = Cursor::new(data.to_vec());
    if let Ok(mut tag) = IfdTag::read(&mut cursor, 0, ReaderOptions::default()) {
        tag.set_artist(Some("fuzz"));
        let old_len = data.len() as u64;
        if tag.save(&mut cursor, 0, old_len).is_ok() {
            let _ = IfdTag::read(&mut cursor, 0, ReaderOptions::default());
        }
    }

    if let Ok(mut file) = NonContainerFile::open(Cursor::new(data.to_vec())) {
        file.remove_tags(TagTypes::ID3V1);
        if let Some(ape) = file.get_or_create_tag(TagKind::Ape).as_ape_mut() {
            let _ = ape.set_title(Some("fuzz"));
        }
        if file.save().is_ok() {
            let _ = NonContainerFile::open(file.into_inner());
        }
    }
});
