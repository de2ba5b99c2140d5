//! NDB database reader.
//!
//! `Packages.db` is the flat-slot format rpm introduced for SUSE hosts. The
//! file opens with a 16-byte header, followed by an array of 16-byte slot
//! descriptors filling the remainder of the 4 KiB slot pages; each live slot
//! points at a blob area addressed in 16-byte blocks:
//!
//! | Structure   | Fields (u32 LE each)                           |
//! |-------------|------------------------------------------------|
//! | header      | magic `"RpmP"`, version, generation, slot pages |
//! | slot        | magic `"Slot"`, package index, block offset, block count |
//! | blob header | magic `"BlbS"`, package index, generation, blob length |
//!
//! The first two slot cells of page 0 are occupied by the file header; a
//! slot with package index 0 is free.

use crate::cancel::CancelToken;
use crate::io_utils::{BinaryReader, FileData};
use crate::Error;
use byteorder::LittleEndian;
use std::path::Path;

const NDB_HEADER_MAGIC: u32 = u32::from_le_bytes(*b"RpmP");
const NDB_SLOT_MAGIC: u32 = u32::from_le_bytes(*b"Slot");
const NDB_BLOB_MAGIC: u32 = u32::from_le_bytes(*b"BlbS");
const NDB_DB_VERSION: u32 = 0;

/// 16-byte slot descriptors per 4 KiB slot page.
const SLOT_ENTRIES_PER_PAGE: u32 = 4096 / 16;

/// Blob areas are addressed in 16-byte blocks.
const BLOB_BLOCK_SIZE: u64 = 16;

const BLOB_HEADER_SIZE: usize = 16;

/// Upper bound on the slot area; anything larger is corruption.
const MAX_SLOT_PAGES: u32 = 2048;

/// One live slot: a package index and the block address of its blob.
#[derive(Debug, Clone, Copy)]
struct SlotEntry {
    pkg_index: u32,
    blk_offset: u32,
    blk_count: u32,
}

/// An NDB database opened for reading.
#[derive(Debug)]
pub struct NdbFile {
    data: FileData,
    slots: Vec<SlotEntry>,
}

impl NdbFile {
    /// Open a database, reading it entirely into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_data(FileData::read(path.as_ref())?)
    }

    /// Open a database through a read-only memory map.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_data(FileData::map(path.as_ref())?)
    }

    fn from_data(data: FileData) -> Result<Self, Error> {
        if data.len() < 16 {
            return Err(Error::NotNdb);
        }
        let mut reader = BinaryReader::<LittleEndian>::new(&data);
        let magic = reader.read_u32()?;
        let version = reader.read_u32()?;
        let _generation = reader.read_u32()?;
        let slot_npages = reader.read_u32()?;

        if magic != NDB_HEADER_MAGIC || version != NDB_DB_VERSION || slot_npages == 0 {
            return Err(Error::NotNdb);
        }
        if slot_npages > MAX_SLOT_PAGES {
            return Err(Error::Corrupted(format!(
                "slot page limit exceeded: {}",
                slot_npages
            )));
        }

        // The header occupies the first two slot cells of page 0.
        let nslots = slot_npages * SLOT_ENTRIES_PER_PAGE - 2;
        let mut slots = Vec::new();
        for i in 0..nslots {
            let slot_magic = reader.read_u32()?;
            let pkg_index = reader.read_u32()?;
            let blk_offset = reader.read_u32()?;
            let blk_count = reader.read_u32()?;
            if slot_magic != NDB_SLOT_MAGIC {
                return Err(Error::Corrupted(format!("bad slot magic at slot {}", i)));
            }
            if pkg_index == 0 {
                continue; // free slot
            }
            slots.push(SlotEntry {
                pkg_index,
                blk_offset,
                blk_count,
            });
        }

        Ok(Self { data, slots })
    }

    /// Number of live slots (installed packages).
    pub fn package_count(&self) -> usize {
        self.slots.len()
    }

    /// Lazy traversal of every package blob, in slot order.
    pub fn blobs<'a>(&'a self, cancel: &'a CancelToken) -> BlobIter<'a> {
        BlobIter {
            db: self,
            cancel,
            slot: 0,
            done: false,
        }
    }

    /// Read the blob a slot points at, validating its header against the
    /// slot.
    fn slot_blob(&self, slot: SlotEntry) -> Result<Vec<u8>, Error> {
        let start = usize::try_from(u64::from(slot.blk_offset) * BLOB_BLOCK_SIZE)
            .map_err(|_| Error::Corrupted(format!("blob offset overflow: {}", slot.blk_offset)))?;
        let header_bytes = self.data.get(start..start + BLOB_HEADER_SIZE).ok_or_else(|| {
            Error::Corrupted(format!(
                "blob header for package {} out of bounds",
                slot.pkg_index
            ))
        })?;

        let mut reader = BinaryReader::<LittleEndian>::new(header_bytes);
        let magic = reader.read_u32()?;
        let pkg_index = reader.read_u32()?;
        let _generation = reader.read_u32()?;
        let blob_len = reader.read_u32()?;

        if magic != NDB_BLOB_MAGIC {
            return Err(Error::Corrupted(format!(
                "unexpected blob magic for package {}",
                slot.pkg_index
            )));
        }
        if pkg_index != slot.pkg_index {
            return Err(Error::Corrupted(format!(
                "blob/slot package index mismatch: {} vs {}",
                pkg_index, slot.pkg_index
            )));
        }
        if u64::from(blob_len) + BLOB_HEADER_SIZE as u64
            > u64::from(slot.blk_count) * BLOB_BLOCK_SIZE
        {
            return Err(Error::Corrupted(format!(
                "blob length {} exceeds {} reserved blocks for package {}",
                blob_len, slot.blk_count, slot.pkg_index
            )));
        }

        let blob_start = start + BLOB_HEADER_SIZE;
        let blob = self
            .data
            .get(blob_start..blob_start + blob_len as usize)
            .ok_or_else(|| {
                Error::Corrupted(format!(
                    "blob for package {} overruns file",
                    slot.pkg_index
                ))
            })?;
        Ok(blob.to_vec())
    }
}

/// Pull-based iterator over the database's package blobs.
pub struct BlobIter<'a> {
    db: &'a NdbFile,
    cancel: &'a CancelToken,
    slot: usize,
    done: bool,
}

impl Iterator for BlobIter<'_> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.done = true;
            return Some(Err(Error::Cancelled));
        }
        let slot = *self.db.slots.get(self.slot)?;
        self.slot += 1;
        let result = self.db.slot_blob(slot);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble an NDB file with one slot page and the given blobs.
    fn build_ndb(blobs: &[&[u8]]) -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(b"RpmP");
        file.extend_from_slice(&NDB_DB_VERSION.to_le_bytes());
        file.extend_from_slice(&1u32.to_le_bytes()); // generation
        file.extend_from_slice(&1u32.to_le_bytes()); // slot pages

        // Blob areas start on the block boundary right after the slot page.
        let mut next_block = 4096u32 / 16;
        let mut areas = Vec::new();
        let mut slots = Vec::new();
        for (i, blob) in blobs.iter().enumerate() {
            let pkg_index = i as u32 + 1;
            let blk_count = ((BLOB_HEADER_SIZE + blob.len()) as u32).div_ceil(16);
            slots.push((pkg_index, next_block, blk_count));

            let mut area = Vec::new();
            area.extend_from_slice(b"BlbS");
            area.extend_from_slice(&pkg_index.to_le_bytes());
            area.extend_from_slice(&1u32.to_le_bytes()); // generation
            area.extend_from_slice(&(blob.len() as u32).to_le_bytes());
            area.extend_from_slice(blob);
            area.resize((blk_count * 16) as usize, 0);
            areas.push(area);
            next_block += blk_count;
        }

        for cell in 0..(SLOT_ENTRIES_PER_PAGE - 2) as usize {
            file.extend_from_slice(b"Slot");
            if let Some(&(pkg_index, blk_offset, blk_count)) = slots.get(cell) {
                file.extend_from_slice(&pkg_index.to_le_bytes());
                file.extend_from_slice(&blk_offset.to_le_bytes());
                file.extend_from_slice(&blk_count.to_le_bytes());
            } else {
                file.extend_from_slice(&[0u8; 12]); // free slot
            }
        }
        file.resize(4096, 0); // blob areas start on the next slot-page boundary
        for area in areas {
            file.extend_from_slice(&area);
        }
        file
    }

    fn collect_blobs(db: &NdbFile) -> Vec<Result<Vec<u8>, Error>> {
        let cancel = CancelToken::new();
        db.blobs(&cancel).collect()
    }

    #[test]
    fn test_read_slot_blobs_in_order() {
        let file = build_ndb(&[b"first blob", b"second blob body"]);
        let db = NdbFile::from_data(FileData::Owned(file)).unwrap();
        assert_eq!(db.package_count(), 2);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].as_ref().unwrap(), b"first blob");
        assert_eq!(blobs[1].as_ref().unwrap(), b"second blob body");
    }

    #[test]
    fn test_not_ndb_magic_and_version() {
        let mut file = build_ndb(&[b"x"]);
        file[0] = b'X';
        assert!(matches!(
            NdbFile::from_data(FileData::Owned(file)).unwrap_err(),
            Error::NotNdb
        ));

        let mut file = build_ndb(&[b"x"]);
        file[4] = 9; // future version
        assert!(matches!(
            NdbFile::from_data(FileData::Owned(file)).unwrap_err(),
            Error::NotNdb
        ));

        assert!(matches!(
            NdbFile::from_data(FileData::Owned(b"short".to_vec())).unwrap_err(),
            Error::NotNdb
        ));
    }

    #[test]
    fn test_slot_page_cap() {
        let mut file = build_ndb(&[]);
        file[12..16].copy_from_slice(&4096u32.to_le_bytes());
        let err = NdbFile::from_data(FileData::Owned(file)).unwrap_err();
        assert!(err.to_string().contains("slot page limit"));
    }

    #[test]
    fn test_bad_slot_magic() {
        let mut file = build_ndb(&[b"x"]);
        file[16..20].copy_from_slice(b"tolS");
        let err = NdbFile::from_data(FileData::Owned(file)).unwrap_err();
        assert!(err.to_string().contains("bad slot magic"));
    }

    #[test]
    fn test_blob_magic_mismatch() {
        let file = build_ndb(&[b"payload"]);
        let blob_area = 4096;
        let mut file = file;
        file[blob_area..blob_area + 4].copy_from_slice(b"XXXX");
        let db = NdbFile::from_data(FileData::Owned(file)).unwrap();
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("blob magic"));
    }

    #[test]
    fn test_blob_package_index_mismatch() {
        let mut file = build_ndb(&[b"payload"]);
        file[4096 + 4..4096 + 8].copy_from_slice(&9u32.to_le_bytes());
        let db = NdbFile::from_data(FileData::Owned(file)).unwrap();
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("index mismatch"));
    }

    #[test]
    fn test_blob_overruns_reserved_blocks() {
        let mut file = build_ndb(&[b"payload"]);
        // Inflate the recorded blob length past the slot's block count.
        file[4096 + 12..4096 + 16].copy_from_slice(&400u32.to_le_bytes());
        let db = NdbFile::from_data(FileData::Owned(file)).unwrap();
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("reserved blocks"));
    }

    #[test]
    fn test_cancellation_stops_iteration() {
        let file = build_ndb(&[b"first", b"second"]);
        let db = NdbFile::from_data(FileData::Owned(file)).unwrap();
        let cancel = CancelToken::new();
        let mut iter = db.blobs(&cancel);
        assert!(iter.next().unwrap().is_ok());
        cancel.cancel();
        assert!(matches!(iter.next(), Some(Err(Error::Cancelled))));
        assert!(iter.next().is_none());
    }
}
