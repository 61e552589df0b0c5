//! Seekable byte streams with in-place insertion
//!
//! Every write this crate performs goes through [`ByteStream::insert`]: replace
//! `replace_len` bytes at `offset` with new data, growing or shrinking the
//! stream. Bytes after the replaced region keep their relative order and move
//! by `data.len() - replace_len`.

use crate::error::Result;
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// Chunk size used when shifting stream tails (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// A readable, writable, seekable stream that can be resized
///
/// Implemented for in-memory buffers (`Cursor<Vec<u8>>`) and files.
pub trait ByteStream: Read + Write + Seek {
    /// Truncate or extend the stream to exactly `len` bytes
    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Current position
    fn tell(&mut self) -> Result<u64> {
        Ok(self.stream_position()?)
    }

    /// Total length, leaving the position unchanged
    fn length(&mut self) -> Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }

    /// Read up to `n` bytes from the current position
    ///
    /// Short reads at the end of the stream return fewer bytes instead of failing.
    fn read_block(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(n.min(DEFAULT_CHUNK_SIZE));
        Read::take(&mut *self, n as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Seek to `offset` and read up to `n` bytes
    fn read_block_at(&mut self, offset: u64, n: usize) -> Result<Vec<u8>> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_block(n)
    }

    /// Replace `replace_len` bytes at `offset` with `data`
    fn insert(&mut self, data: &[u8], offset: u64, replace_len: u64) -> Result<()> {
        let len = self.length()?;
        let replace_end = offset.saturating_add(replace_len).min(len);
        let new_len = data.len() as u64;
        let old_len = replace_end.saturating_sub(offset);

        if new_len > old_len {
            let grow = new_len - old_len;
            shift_tail_back(self, replace_end, len, grow)?;
        } else if new_len < old_len {
            let shrink = old_len - new_len;
            shift_tail_forward(self, replace_end, len, shrink)?;
            self.set_len(len - shrink)?;
        }

        self.seek(SeekFrom::Start(offset))?;
        self.write_all(data)?;
        self.flush()?;
        Ok(())
    }

    /// Remove `len` bytes at `offset`
    fn remove_block(&mut self, offset: u64, len: u64) -> Result<()> {
        self.insert(&[], offset, len)
    }
}

/// Move `[start, end)` towards the end of the stream by `distance` bytes
///
/// Copies from the end backwards so the source is never overwritten before it is read.
fn shift_tail_back<S: ByteStream + ?Sized>(
    stream: &mut S,
    start: u64,
    end: u64,
    distance: u64,
) -> Result<()> {
    let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];
    let mut pos = end;
    while pos > start {
        let chunk = (pos - start).min(DEFAULT_CHUNK_SIZE as u64) as usize;
        let from = pos - chunk as u64;
        stream.seek(SeekFrom::Start(from))?;
        stream.read_exact(&mut buffer[..chunk])?;
        stream.seek(SeekFrom::Start(from + distance))?;
        stream.write_all(&buffer[..chunk])?;
        pos = from;
    }
    Ok(())
}

/// Move `[start, end)` towards the start of the stream by `distance` bytes
fn shift_tail_forward<S: ByteStream + ?Sized>(
    stream: &mut S,
    start: u64,
    end: u64,
    distance: u64,
) -> Result<()> {
    let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];
    let mut pos = start;
    while pos < end {
        let chunk = (end - pos).min(DEFAULT_CHUNK_SIZE as u64) as usize;
        stream.seek(SeekFrom::Start(pos))?;
        stream.read_exact(&mut buffer[..chunk])?;
        stream.seek(SeekFrom::Start(pos - distance))?;
        stream.write_all(&buffer[..chunk])?;
        pos += chunk as u64;
    }
    Ok(())
}

impl ByteStream for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

impl ByteStream for File {
    fn set_len(&mut self, len: u64) -> Result<()> {
        File::set_len(self, len)?;
        Ok(())
    }
}
