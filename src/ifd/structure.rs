//! In-memory directory chains

use super::{tags, Entry, EntryValue, FieldType, Rational};
use std::collections::BTreeMap;

/// One directory: a map from tag to entry, iterated in ascending tag order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IfdDirectory {
    entries: BTreeMap<u16, Entry>,
}

impl IfdDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.get(&tag)
    }

    pub fn get_mut(&mut self, tag: u16) -> Option<&mut Entry> {
        self.entries.get_mut(&tag)
    }

    /// Insert or replace the entry for its tag, returning the previous one
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.tag, entry)
    }

    pub fn remove(&mut self, tag: u16) -> Option<Entry> {
        self.entries.remove(&tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending tag order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn tags(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }
}

/// A chain of directories linked by next-IFD pointers
///
/// Index 0 is the primary directory; for Exif, index 1 is the thumbnail.
/// A sub-IFD entry owns its nested structure exclusively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IfdStructure {
    directories: Vec<IfdDirectory>,
}

impl IfdStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn directories(&self) -> &[IfdDirectory] {
        &self.directories
    }

    pub fn directory(&self, index: usize) -> Option<&IfdDirectory> {
        self.directories.get(index)
    }

    /// Mutable access to a directory, creating empty directories up to `index`
    pub fn directory_mut(&mut self, index: usize) -> &mut IfdDirectory {
        if self.directories.len() <= index {
            self.directories.resize_with(index + 1, IfdDirectory::new);
        }
        &mut self.directories[index]
    }

    /// Append a directory to the end of the chain, returning its index
    pub fn push_directory(&mut self, directory: IfdDirectory) -> usize {
        self.directories.push(directory);
        self.directories.len() - 1
    }

    pub fn get_entry(&self, directory: usize, tag: u16) -> Option<&Entry> {
        self.directory(directory)?.get(tag)
    }

    pub fn get_entry_mut(&mut self, directory: usize, tag: u16) -> Option<&mut Entry> {
        self.directories.get_mut(directory)?.get_mut(tag)
    }

    pub fn set_entry(&mut self, directory: usize, entry: Entry) -> Option<Entry> {
        self.directory_mut(directory).insert(entry)
    }

    pub fn remove_tag(&mut self, directory: usize, tag: u16) -> Option<Entry> {
        self.directories.get_mut(directory)?.remove(tag)
    }

    pub fn contains_tag(&self, directory: usize, tag: u16) -> bool {
        self.get_entry(directory, tag).is_some()
    }

    pub fn get_value(&self, directory: usize, tag: u16) -> Option<&EntryValue> {
        self.get_entry(directory, tag).map(|e| &e.value)
    }

    pub fn get_long_value(&self, directory: usize, tag: u16) -> Option<u32> {
        self.get_value(directory, tag)?.as_u32()
    }

    pub fn get_string_value(&self, directory: usize, tag: u16) -> Option<&str> {
        self.get_value(directory, tag)?.as_str()
    }

    pub fn get_rational_value(&self, directory: usize, tag: u16) -> Option<Rational> {
        self.get_value(directory, tag)?.as_rational()
    }

    pub fn set_long_value(&mut self, directory: usize, tag: u16, value: u32) {
        self.set_entry(directory, Entry::new(tag, EntryValue::Long(value)));
    }

    pub fn set_short_value(&mut self, directory: usize, tag: u16, value: u16) {
        self.set_entry(directory, Entry::new(tag, EntryValue::Short(value)));
    }

    /// Set a text value; `None` removes the tag
    pub fn set_string_value(&mut self, directory: usize, tag: u16, value: Option<&str>) {
        match value {
            Some(value) => {
                self.set_entry(directory, Entry::new(tag, EntryValue::Ascii(value.to_string())));
            }
            None => {
                self.remove_tag(directory, tag);
            }
        }
    }

    pub fn set_rational_value(&mut self, directory: usize, tag: u16, value: Rational) {
        self.set_entry(directory, Entry::new(tag, EntryValue::Rational(value)));
    }

    /// Nested structure behind a sub-IFD or maker note entry
    pub fn sub_structure(&self, directory: usize, tag: u16) -> Option<&IfdStructure> {
        self.get_value(directory, tag)?.as_structure()
    }

    /// Nested structure behind a pointer tag, created as a LONG sub-IFD when absent
    pub fn sub_structure_mut(&mut self, directory: usize, tag: u16) -> &mut IfdStructure {
        let dir = self.directory_mut(directory);
        let is_structure = dir
            .get(tag)
            .map(|e| e.value.as_structure().is_some())
            .unwrap_or(false);
        if !is_structure {
            dir.insert(Entry::new(
                tag,
                EntryValue::SubIfd {
                    field_type: FieldType::Long,
                    count: 1,
                    structure: IfdStructure::new(),
                },
            ));
        }
        match dir.get_mut(tag).map(|e| &mut e.value) {
            Some(EntryValue::SubIfd { structure, .. }) => structure,
            Some(EntryValue::MakerNote(note)) => &mut note.structure,
            _ => unreachable!("sub-IFD entry inserted above"),
        }
    }

    /// Replace the JPEG thumbnail of `directory`, keeping its length tag in step
    pub fn set_thumbnail(&mut self, directory: usize, data: Vec<u8>) {
        let len = data.len() as u32;
        let dir = self.directory_mut(directory);
        dir.insert(Entry::new(
            tags::JPEG_INTERCHANGE_FORMAT,
            EntryValue::ThumbnailData(data),
        ));
        dir.insert(Entry::new(
            tags::JPEG_INTERCHANGE_FORMAT_LENGTH,
            EntryValue::Long(len),
        ));
    }

    /// Thumbnail bytes of `directory`, if it carries one
    pub fn thumbnail(&self, directory: usize) -> Option<&[u8]> {
        match self.get_value(directory, tags::JPEG_INTERCHANGE_FORMAT)? {
            EntryValue::ThumbnailData(data) => Some(data),
            _ => None,
        }
    }

    /// True when no directory holds any entry
    pub fn is_empty(&self) -> bool {
        self.directories.iter().all(IfdDirectory::is_empty)
    }
}
