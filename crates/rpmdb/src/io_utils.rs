//! Binary reading utilities shared by the header decoder and the database
//! readers.

use crate::Error;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::Cursor;
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::Path;

/// A cursor wrapper for reading binary data from a byte slice.
///
/// RPM header structures are big-endian on disk; BerkeleyDB and NDB
/// structures are little-endian unless the database was written by a
/// byte-swapped host, so the flavor is a type parameter.
pub struct BinaryReader<'a, E: ByteOrder = BigEndian> {
    cursor: Cursor<&'a [u8]>,
    _endian: PhantomData<E>,
}

impl<'a, E: ByteOrder> BinaryReader<'a, E> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            _endian: PhantomData,
        }
    }

    /// Create a reader starting at a specific offset.
    pub fn at_offset(data: &'a [u8], offset: u64) -> Self {
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset);
        Self {
            cursor,
            _endian: PhantomData,
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        let pos = self.cursor.position() as usize;
        let len = self.cursor.get_ref().len();
        len.saturating_sub(pos)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.cursor.read_u8().map_err(Error::Io)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.cursor.read_u16::<E>().map_err(Error::Io)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.cursor.read_u32::<E>().map_err(Error::Io)
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.cursor.read_i32::<E>().map_err(Error::Io)
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.cursor.read_u64::<E>().map_err(Error::Io)
    }

    /// Read N bytes into a new Vec.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let pos = self.cursor.position() as usize;
        let data = self.cursor.get_ref();
        if pos + n > data.len() {
            return Err(Error::Corrupted(format!(
                "read_bytes: tried to read {} bytes at offset {}, but only {} available",
                n,
                pos,
                data.len().saturating_sub(pos)
            )));
        }
        let result = data[pos..pos + n].to_vec();
        self.cursor.set_position((pos + n) as u64);
        Ok(result)
    }

    /// Skip N bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        let new_pos = self.cursor.position() + n as u64;
        if new_pos > self.cursor.get_ref().len() as u64 {
            return Err(Error::Corrupted(format!(
                "skip: tried to skip to offset {}, but data is only {} bytes",
                new_pos,
                self.cursor.get_ref().len()
            )));
        }
        self.cursor.set_position(new_pos);
        Ok(())
    }
}

/// Total bytes consumed by `count` consecutive null-terminated strings at the
/// start of `data` (terminators included), or `None` if the region ends
/// before `count` terminators are seen.
pub fn strtaglen(data: &[u8], count: u32) -> Option<usize> {
    let mut length = 0usize;
    for _ in 0..count {
        let rest = data.get(length..)?;
        let nul = rest.iter().position(|&b| b == 0)?;
        length += nul + 1;
    }
    Some(length)
}

/// Lowercase hex rendering of a byte slice.
pub(crate) fn hex_string(data: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Abstraction over file data sources (owned bytes or memory-mapped).
#[derive(Debug)]
pub(crate) enum FileData {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Deref for FileData {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            FileData::Mapped(m) => m,
        }
    }
}

impl FileData {
    /// Read the whole file into memory.
    pub(crate) fn read(path: &Path) -> std::io::Result<Self> {
        Ok(FileData::Owned(std::fs::read(path)?))
    }

    /// Map the file read-only. The OS pages data in on demand; the file must
    /// not be modified while the mapping is live.
    pub(crate) fn map(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(FileData::Mapped(mmap))
    }
}
