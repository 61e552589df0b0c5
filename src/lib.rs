//! Byte-exact reading and writing of embedded metadata blocks.
//!
//! This crate covers two binary tag models that media formats embed rather
//! than define themselves:
//!
//! - **TIFF/Exif IFDs**: self-describing directory chains with nested
//!   sub-directories, vendor maker notes, thumbnails and strips
//!   ([`ifd`]).
//! - **Non-container tag stacks**: APE, ID3v1 and ID3v2 blocks glued to the
//!   head and tail of MP3-style streams ([`noncontainer`]).
//!
//! # Design Principles
//!
//! - **One write primitive**: every mutation is a single [`ByteStream::insert`]
//!   per region, so a failed render never touches the stream
//! - **Round-trip fidelity**: type codes, unknown tags and opaque blocks are
//!   re-emitted as read
//! - **Lenient where vendors are**: broken maker notes and trailing junk
//!   degrade instead of failing the whole read
//!
//! # Exif
//!
//! ```no_run
//! use std::fs::OpenOptions;
//! use tagstack_io::{ifd::IfdTag, ByteStream, ReaderOptions};
//!
//! # fn main() -> tagstack_io::Result<()> {
//! // A raw Exif block: TIFF header and directories, nothing else
//! let mut file = OpenOptions::new().read(true).write(true).open("exif.bin")?;
//! let mut tag = IfdTag::read(&mut file, 0, ReaderOptions::default())?;
//! println!("camera: {:?} {:?}", tag.make(), tag.model());
//!
//! let old_len = file.length()?;
//! tag.set_artist(Some("Someone"));
//! tag.save(&mut file, 0, old_len)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Tag stacks
//!
//! ```no_run
//! use std::fs::OpenOptions;
//! use tagstack_io::noncontainer::{NonContainerFile, TagKind, TagTypes};
//!
//! # fn main() -> tagstack_io::Result<()> {
//! let file = OpenOptions::new().read(true).write(true).open("song.mp3")?;
//! let mut file = NonContainerFile::open(file)?;
//!
//! if let Some(ape) = file.get_or_create_tag(TagKind::Ape).as_ape_mut() {
//!     ape.set_title(Some("Title"))?;
//! }
//! file.remove_tags(TagTypes::ID3V1);
//! file.save()?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod ifd;
pub mod noncontainer;
mod stream;

pub use error::{Error, Result};
pub use ifd::{IfdReader, IfdRenderer, IfdStructure, IfdTag, ReaderOptions, VendorKind};
pub use noncontainer::{EndTag, NonContainerFile, StackTag, StartTag, TagKind, TagTypes};
pub use stream::{ByteStream, DEFAULT_CHUNK_SIZE};

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
