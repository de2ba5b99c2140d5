//! BerkeleyDB hash database reader.
//!
//! The `Packages` file of pre-SQLite RPM hosts is a BerkeleyDB hash
//! database: a sequence of fixed-size pages, with page 0 carrying the hash
//! metadata, hash pages (plain, type 13, or "off-index" kind, type 3)
//! holding paired (key, value) records, and overflow chains carrying values
//! too large for their hash page. Every value is one serialized header blob;
//! keys are ignored.
//!
//! All pages open with the same 26-byte header:
//!
//! | Offset | Type | Field                      |
//! |--------|------|----------------------------|
//! | 00-07  | —    | LSN                        |
//! | 08-11  | u32  | current page number        |
//! | 12-15  | u32  | previous page number       |
//! | 16-19  | u32  | next page number           |
//! | 20-21  | u16  | number of items on page    |
//! | 22-23  | u16  | high free byte page offset |
//! | 24     | u8   | btree tree level           |
//! | 25     | u8   | page type                  |
//!
//! Byte order follows the writing host; it is detected once from the
//! metadata magic and applied to every subsequent read.

use crate::cancel::CancelToken;
use crate::io_utils::FileData;
use crate::Error;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::path::Path;

/// Magic number of a hash metadata page.
pub const HASH_MAGIC_NUMBER: u32 = 0x0006_1561;

const NO_ENCRYPTION_ALGORITHM: u8 = 0;

/// All DB pages have the same sized header (in bytes).
pub const PAGE_HEADER_SIZE: usize = 26;

/// The size (in bytes) of an in-page record offset.
const HASH_INDEX_ENTRY_SIZE: usize = 2;

/// The 12-byte off-page record: type byte, 3 pad, page number, length.
const HASH_OFF_PAGE_SIZE: usize = 12;

// Page types of interest.
const OVERFLOW_PAGE_TYPE: u8 = 7;
const HASH_METADATA_PAGE_TYPE: u8 = 8;
const HASH_PAGE_TYPE: u8 = 13;

// Record-type discriminators inside a hash page. The off-index code doubles
// as a page type: a hash page of that kind stores every value as an
// indirection descriptor, whatever the record's own discriminator says.
const HASH_KEYDATA_TYPE: u8 = 1;
const HASH_OFF_INDEX_TYPE: u8 = 3;

/// Fields of the hash metadata page (page 0) the reader needs.
#[derive(Debug, Clone)]
pub struct HashMetadata {
    pub magic: u32,
    pub version: u32,
    /// Page size in bytes; a power of two between 512 and 64 KiB.
    pub page_size: u32,
    pub encryption_alg: u8,
    pub page_type: u8,
    /// Page number of the last page in the database.
    pub last_page_no: u32,
    /// ID of the maximum hash bucket in use.
    pub max_bucket: u32,
    /// Whether on-disk values are byte-swapped relative to little-endian.
    pub swapped: bool,
}

impl HashMetadata {
    /// Parse page 0. Byte order is whichever makes the magic number match.
    fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 512 {
            return Err(Error::NotBdb);
        }
        let meta = match LittleEndian::read_u32(&data[12..16]) {
            HASH_MAGIC_NUMBER => Self::read::<LittleEndian>(data, false),
            _ if BigEndian::read_u32(&data[12..16]) == HASH_MAGIC_NUMBER => {
                Self::read::<BigEndian>(data, true)
            }
            _ => return Err(Error::NotBdb),
        };

        if meta.page_type != HASH_METADATA_PAGE_TYPE {
            return Err(Error::Corrupted(format!(
                "unexpected metadata page type: {}",
                meta.page_type
            )));
        }
        if meta.encryption_alg != NO_ENCRYPTION_ALGORITHM {
            return Err(Error::Unsupported(format!(
                "encrypted database (algorithm {})",
                meta.encryption_alg
            )));
        }
        if !meta.page_size.is_power_of_two() || !(512..=65536).contains(&meta.page_size) {
            return Err(Error::Corrupted(format!(
                "invalid page size: {}",
                meta.page_size
            )));
        }
        Ok(meta)
    }

    fn read<E: ByteOrder>(data: &[u8], swapped: bool) -> Self {
        // Generic metadata page layout:
        // 00-07 LSN, 08-11 page number, 12-15 magic, 16-19 version,
        // 20-23 page size, 24 encryption algorithm, 25 page type,
        // 26 meta flags, 27 unused, 28-31 free list head,
        // 32-35 last page number, 36-39 partitions, 40-43 key count,
        // 44-47 record count, 48-51 flags, 52-71 unique file ID,
        // 72-75 maximum bucket.
        Self {
            magic: E::read_u32(&data[12..16]),
            version: E::read_u32(&data[16..20]),
            page_size: E::read_u32(&data[20..24]),
            encryption_alg: data[24],
            page_type: data[25],
            last_page_no: E::read_u32(&data[32..36]),
            max_bucket: E::read_u32(&data[72..76]),
            swapped,
        }
    }
}

/// The 26-byte header shared by every page.
#[derive(Debug, Clone)]
pub struct PageHeader {
    pub page_no: u32,
    pub prev_page_no: u32,
    pub next_page_no: u32,
    pub num_entries: u16,
    pub free_area_offset: u16,
    pub tree_level: u8,
    pub page_type: u8,
}

impl PageHeader {
    fn parse(data: &[u8], swapped: bool) -> Result<Self, Error> {
        if data.len() < PAGE_HEADER_SIZE {
            return Err(Error::Corrupted(format!("short page: {} bytes", data.len())));
        }
        if swapped {
            Ok(Self::read::<BigEndian>(data))
        } else {
            Ok(Self::read::<LittleEndian>(data))
        }
    }

    fn read<E: ByteOrder>(data: &[u8]) -> Self {
        Self {
            page_no: E::read_u32(&data[8..12]),
            prev_page_no: E::read_u32(&data[12..16]),
            next_page_no: E::read_u32(&data[16..20]),
            num_entries: E::read_u16(&data[20..22]),
            free_area_offset: E::read_u16(&data[22..24]),
            tree_level: data[24],
            page_type: data[25],
        }
    }
}

/// A resolved off-page record: the overflow chain's start page and the total
/// value length.
#[derive(Debug, Clone, Copy)]
struct HashOffPageEntry {
    page_no: u32,
    length: u32,
}

impl HashOffPageEntry {
    fn parse(data: &[u8], swapped: bool) -> Self {
        // 00 record type, 01-03 padding, 04-07 first overflow page number,
        // 08-11 total length of the item.
        if swapped {
            Self {
                page_no: BigEndian::read_u32(&data[4..8]),
                length: BigEndian::read_u32(&data[8..12]),
            }
        } else {
            Self {
                page_no: LittleEndian::read_u32(&data[4..8]),
                length: LittleEndian::read_u32(&data[8..12]),
            }
        }
    }
}

/// A BerkeleyDB hash database opened for reading.
#[derive(Debug)]
pub struct BerkeleyDb {
    data: FileData,
    meta: HashMetadata,
}

impl BerkeleyDb {
    /// Open a database, reading it entirely into memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_data(FileData::read(path.as_ref())?)
    }

    /// Open a database through a read-only memory map.
    ///
    /// More memory-efficient for large databases — the OS pages data in on
    /// demand. The file must not be modified while the handle is open.
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_data(FileData::map(path.as_ref())?)
    }

    fn from_data(data: FileData) -> Result<Self, Error> {
        let meta = HashMetadata::parse(&data)?;
        Ok(Self { data, meta })
    }

    /// The parsed hash metadata page.
    pub fn metadata(&self) -> &HashMetadata {
        &self.meta
    }

    /// Lazy traversal of every stored value, in on-disk page order.
    pub fn blobs<'a>(&'a self, cancel: &'a CancelToken) -> BlobIter<'a> {
        BlobIter {
            db: self,
            cancel,
            next_page_no: 0,
            page: None,
            page_kind: HASH_PAGE_TYPE,
            offsets: Vec::new(),
            pair: 0,
            done: false,
        }
    }

    fn page(&self, page_no: u32) -> Result<&[u8], Error> {
        let size = self.meta.page_size as usize;
        let start = page_no as usize * size;
        self.data.get(start..start + size).ok_or_else(|| {
            Error::Corrupted(format!(
                "page {} out of bounds ({} byte file, {} byte pages)",
                page_no,
                self.data.len(),
                size
            ))
        })
    }

    /// Record offsets of a hash page, keys and values interleaved.
    ///
    /// Records pair up as (key, value); entry counts are therefore always
    /// even.
    fn record_offsets(&self, page: &[u8], num_entries: u16) -> Result<Vec<u16>, Error> {
        if num_entries % 2 != 0 {
            return Err(Error::Corrupted(format!(
                "odd number of hash page entries: {}",
                num_entries
            )));
        }
        let table_len = num_entries as usize * HASH_INDEX_ENTRY_SIZE;
        let table = page
            .get(PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + table_len)
            .ok_or_else(|| {
                Error::Corrupted(format!(
                    "hash index table ({} entries) overruns page",
                    num_entries
                ))
            })?;
        let offsets = table
            .chunks_exact(HASH_INDEX_ENTRY_SIZE)
            .map(|pair| {
                if self.meta.swapped {
                    BigEndian::read_u16(pair)
                } else {
                    LittleEndian::read_u16(pair)
                }
            })
            .collect();
        Ok(offsets)
    }

    /// Resolve one value record into the raw header blob bytes.
    ///
    /// `page_kind` is the owning page's type byte: on an off-index page
    /// (type 3) every value is an indirection descriptor, so a key/data
    /// record there is walked as a descriptor rather than read inline.
    fn value_content(
        &self,
        page: &[u8],
        page_kind: u8,
        offsets: &[u16],
        offset: u16,
    ) -> Result<Vec<u8>, Error> {
        let start = offset as usize;
        let disc = *page.get(start).ok_or_else(|| {
            Error::Corrupted(format!("record offset {} beyond page end", start))
        })?;
        match disc {
            HASH_OFF_INDEX_TYPE => self.follow_off_page_record(page, start),
            HASH_KEYDATA_TYPE if page_kind == HASH_OFF_INDEX_TYPE => {
                self.follow_off_page_record(page, start)
            }
            HASH_KEYDATA_TYPE => {
                // Inline record: runs to the nearest record above it, or to
                // the page end.
                let bound = offsets
                    .iter()
                    .map(|&o| o as usize)
                    .filter(|&o| o > start)
                    .min()
                    .unwrap_or(page.len())
                    .min(page.len());
                Ok(page[start + 1..bound.max(start + 1)].to_vec())
            }
            other => Err(Error::Unsupported(format!(
                "hash record type {} (only key/data and off-page records)",
                other
            ))),
        }
    }

    /// Parse the 12-byte off-page descriptor at `start` and read its chain.
    fn follow_off_page_record(&self, page: &[u8], start: usize) -> Result<Vec<u8>, Error> {
        let raw = page.get(start..start + HASH_OFF_PAGE_SIZE).ok_or_else(|| {
            Error::Corrupted(format!("off-page record at {} overruns page", start))
        })?;
        let entry = HashOffPageEntry::parse(raw, self.meta.swapped);
        self.read_overflow_chain(entry)
    }

    /// Concatenate an overflow chain into the complete value.
    fn read_overflow_chain(&self, entry: HashOffPageEntry) -> Result<Vec<u8>, Error> {
        // The declared length is untrusted; never reserve more than the file
        // could actually hold.
        let mut value = Vec::with_capacity((entry.length as usize).min(self.data.len()));
        let mut page_no = entry.page_no;
        let mut visited = 0u64;

        while page_no != 0 {
            visited += 1;
            if visited > u64::from(self.meta.last_page_no) + 1 {
                return Err(Error::Corrupted(format!(
                    "overflow chain loops (started at page {})",
                    entry.page_no
                )));
            }

            let page = self.page(page_no)?;
            let header = PageHeader::parse(page, self.meta.swapped)?;
            if header.page_type != OVERFLOW_PAGE_TYPE {
                return Err(Error::Corrupted(format!(
                    "unexpected page type {} in overflow chain (page {})",
                    header.page_type, page_no
                )));
            }

            // For overflow pages the free-area offset holds the number of
            // payload bytes on the page.
            let used = header.free_area_offset as usize;
            let payload = page
                .get(PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + used)
                .ok_or_else(|| {
                    Error::Corrupted(format!("overflow payload overruns page {}", page_no))
                })?;
            value.extend_from_slice(payload);
            page_no = header.next_page_no;
        }

        if value.len() < entry.length as usize {
            return Err(Error::Corrupted(format!(
                "overflow chain ended early: {} of {} bytes",
                value.len(),
                entry.length
            )));
        }
        value.truncate(entry.length as usize);
        Ok(value)
    }
}

/// Pull-based iterator over the database's stored values.
///
/// Yields one raw header blob per (key, value) record pair. Structural
/// errors and cancellation are yielded once, then the iterator is exhausted.
pub struct BlobIter<'a> {
    db: &'a BerkeleyDb,
    cancel: &'a CancelToken,
    next_page_no: u32,
    page: Option<&'a [u8]>,
    page_kind: u8,
    offsets: Vec<u16>,
    pair: usize,
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

        loop {
            if let Some(page) = self.page {
                // Pairs are (key, value); only values are read.
                let value_index = self.pair * 2 + 1;
                if value_index < self.offsets.len() {
                    let offset = self.offsets[value_index];
                    self.pair += 1;
                    let result =
                        self.db
                            .value_content(page, self.page_kind, &self.offsets, offset);
                    if result.is_err() {
                        self.done = true;
                    }
                    return Some(result);
                }
                self.page = None;
            }

            if self.next_page_no > self.db.meta.last_page_no {
                self.done = true;
                return None;
            }
            let page_no = self.next_page_no;
            self.next_page_no += 1;

            let page = match self.db.page(page_no) {
                Ok(page) => page,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            let header = match PageHeader::parse(page, self.db.meta.swapped) {
                Ok(header) => header,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            // Both plain hash pages and off-index hash pages carry records.
            if header.page_type != HASH_PAGE_TYPE && header.page_type != HASH_OFF_INDEX_TYPE {
                continue;
            }
            self.offsets = match self.db.record_offsets(page, header.num_entries) {
                Ok(offsets) => offsets,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            self.pair = 0;
            self.page_kind = header.page_type;
            self.page = Some(page);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_SIZE: usize = 512;

    fn put_u32<E: ByteOrder>(buf: &mut [u8], offset: usize, value: u32) {
        E::write_u32(&mut buf[offset..offset + 4], value);
    }

    fn put_u16<E: ByteOrder>(buf: &mut [u8], offset: usize, value: u16) {
        E::write_u16(&mut buf[offset..offset + 2], value);
    }

    fn metadata_page<E: ByteOrder>(last_page_no: u32) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        put_u32::<E>(&mut page, 12, HASH_MAGIC_NUMBER);
        put_u32::<E>(&mut page, 16, 9); // version
        put_u32::<E>(&mut page, 20, PAGE_SIZE as u32);
        page[24] = NO_ENCRYPTION_ALGORITHM;
        page[25] = HASH_METADATA_PAGE_TYPE;
        put_u32::<E>(&mut page, 32, last_page_no);
        put_u32::<E>(&mut page, 72, 1); // max bucket
        page
    }

    fn page_header<E: ByteOrder>(
        page: &mut [u8],
        page_no: u32,
        next_page_no: u32,
        num_entries: u16,
        free_area_offset: u16,
        page_type: u8,
    ) {
        put_u32::<E>(page, 8, page_no);
        put_u32::<E>(page, 16, next_page_no);
        put_u16::<E>(page, 20, num_entries);
        put_u16::<E>(page, 22, free_area_offset);
        page[25] = page_type;
    }

    /// Hash page of the given kind with one (key, value) pair whose value is
    /// a 12-byte descriptor (tagged `disc`) pointing at `chain_start`.
    fn record_page<E: ByteOrder>(
        page_type: u8,
        disc: u8,
        chain_start: u32,
        length: u32,
    ) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        page_header::<E>(&mut page, 1, 0, 2, 0, page_type);
        let key_offset = 500u16;
        let value_offset = 480u16;
        put_u16::<E>(&mut page, PAGE_HEADER_SIZE, key_offset);
        put_u16::<E>(&mut page, PAGE_HEADER_SIZE + 2, value_offset);
        page[key_offset as usize] = HASH_KEYDATA_TYPE;
        let v = value_offset as usize;
        page[v] = disc;
        put_u32::<E>(&mut page, v + 4, chain_start);
        put_u32::<E>(&mut page, v + 8, length);
        page
    }

    /// Plain hash page with one off-page value record.
    fn hash_page_offpage<E: ByteOrder>(chain_start: u32, length: u32) -> Vec<u8> {
        record_page::<E>(HASH_PAGE_TYPE, HASH_OFF_INDEX_TYPE, chain_start, length)
    }

    fn overflow_page<E: ByteOrder>(page_no: u32, next_page_no: u32, payload: &[u8]) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        page_header::<E>(
            &mut page,
            page_no,
            next_page_no,
            0,
            payload.len() as u16,
            OVERFLOW_PAGE_TYPE,
        );
        page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + payload.len()].copy_from_slice(payload);
        page
    }

    fn db_from_pages(pages: Vec<Vec<u8>>) -> BerkeleyDb {
        let data: Vec<u8> = pages.concat();
        BerkeleyDb::from_data(FileData::Owned(data)).unwrap()
    }

    fn collect_blobs(db: &BerkeleyDb) -> Vec<Result<Vec<u8>, Error>> {
        let cancel = CancelToken::new();
        db.blobs(&cancel).collect()
    }

    #[test]
    fn test_read_value_across_overflow_chain() {
        let value: Vec<u8> = (0..700).map(|i| (i % 251) as u8).collect();
        let (first, second) = value.split_at(486); // page size minus header
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(3),
            hash_page_offpage::<LittleEndian>(2, value.len() as u32),
            overflow_page::<LittleEndian>(2, 3, first),
            overflow_page::<LittleEndian>(3, 0, second),
        ]);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].as_ref().unwrap(), &value);
    }

    #[test]
    fn test_read_big_endian_database() {
        let value = vec![0xAB; 100];
        let db = db_from_pages(vec![
            metadata_page::<BigEndian>(2),
            hash_page_offpage::<BigEndian>(2, value.len() as u32),
            overflow_page::<BigEndian>(2, 0, &value),
        ]);
        assert!(db.metadata().swapped);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].as_ref().unwrap(), &value);
    }

    #[test]
    fn test_chain_truncates_to_descriptor_length() {
        // Descriptor says 50 bytes; the overflow page carries 80.
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            hash_page_offpage::<LittleEndian>(2, 50),
            overflow_page::<LittleEndian>(2, 0, &[0x11; 80]),
        ]);
        let blobs = collect_blobs(&db);
        assert_eq!(blobs[0].as_ref().unwrap().len(), 50);
    }

    #[test]
    fn test_chain_length_shortfall_is_error() {
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            hash_page_offpage::<LittleEndian>(2, 200),
            overflow_page::<LittleEndian>(2, 0, &[0x11; 80]),
        ]);
        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("ended early"));
    }

    #[test]
    fn test_chain_through_wrong_page_type_is_error() {
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            hash_page_offpage::<LittleEndian>(2, 50),
            metadata_page::<LittleEndian>(2), // not an overflow page
        ]);
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("unexpected page type"));
    }

    #[test]
    fn test_chain_loop_detected() {
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            hash_page_offpage::<LittleEndian>(2, 5000),
            overflow_page::<LittleEndian>(2, 2, &[0x22; 100]), // points at itself
        ]);
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("loops"));
    }

    #[test]
    fn test_inline_keydata_value() {
        let mut page = vec![0u8; PAGE_SIZE];
        page_header::<LittleEndian>(&mut page, 1, 0, 2, 0, HASH_PAGE_TYPE);
        put_u16::<LittleEndian>(&mut page, PAGE_HEADER_SIZE, 500); // key
        put_u16::<LittleEndian>(&mut page, PAGE_HEADER_SIZE + 2, 490); // value
        page[500] = HASH_KEYDATA_TYPE;
        page[490] = HASH_KEYDATA_TYPE;
        page[491..500].copy_from_slice(b"inlinedat");

        let db = db_from_pages(vec![metadata_page::<LittleEndian>(1), page]);
        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].as_ref().unwrap(), b"inlinedat");
    }

    #[test]
    fn test_off_index_page_keydata_record_follows_descriptor() {
        // On an off-index page a key/data record is not inline: its bytes
        // are the indirection descriptor into the overflow chain.
        let value = vec![0x5A; 120];
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            record_page::<LittleEndian>(
                HASH_OFF_INDEX_TYPE,
                HASH_KEYDATA_TYPE,
                2,
                value.len() as u32,
            ),
            overflow_page::<LittleEndian>(2, 0, &value),
        ]);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].as_ref().unwrap(), &value);
    }

    #[test]
    fn test_off_index_page_offpage_record() {
        let value = vec![0x6B; 70];
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            record_page::<LittleEndian>(
                HASH_OFF_INDEX_TYPE,
                HASH_OFF_INDEX_TYPE,
                2,
                value.len() as u32,
            ),
            overflow_page::<LittleEndian>(2, 0, &value),
        ]);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].as_ref().unwrap(), &value);
    }

    #[test]
    fn test_keydata_inline_only_on_plain_hash_page() {
        // The same record bytes read inline on a plain hash page and as an
        // indirection on an off-index page.
        let value = vec![0x7C; 30];
        let page = record_page::<LittleEndian>(
            HASH_PAGE_TYPE,
            HASH_KEYDATA_TYPE,
            2,
            value.len() as u32,
        );
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            page,
            overflow_page::<LittleEndian>(2, 0, &value),
        ]);

        let blobs = collect_blobs(&db);
        assert_eq!(blobs.len(), 1);
        // Inline read: the record runs from past the discriminator up to the
        // key record at 500, not through the overflow chain.
        assert_eq!(blobs[0].as_ref().unwrap().len(), 500 - 481);
    }

    #[test]
    fn test_unknown_record_type_unsupported() {
        let mut page = vec![0u8; PAGE_SIZE];
        page_header::<LittleEndian>(&mut page, 1, 0, 2, 0, HASH_PAGE_TYPE);
        put_u16::<LittleEndian>(&mut page, PAGE_HEADER_SIZE, 500);
        put_u16::<LittleEndian>(&mut page, PAGE_HEADER_SIZE + 2, 490);
        page[490] = 4; // H_OFFDUP, never written by rpm

        let db = db_from_pages(vec![metadata_page::<LittleEndian>(1), page]);
        let blobs = collect_blobs(&db);
        assert!(matches!(blobs[0], Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_odd_entry_count_is_error() {
        let mut page = vec![0u8; PAGE_SIZE];
        page_header::<LittleEndian>(&mut page, 1, 0, 3, 0, HASH_PAGE_TYPE);

        let db = db_from_pages(vec![metadata_page::<LittleEndian>(1), page]);
        let blobs = collect_blobs(&db);
        let err = blobs[0].as_ref().unwrap_err();
        assert!(err.to_string().contains("odd number"));
    }

    #[test]
    fn test_non_hash_pages_skipped() {
        let mut btree_page = vec![0u8; PAGE_SIZE];
        page_header::<LittleEndian>(&mut btree_page, 1, 0, 0, 0, 5); // P_LBTREE
        let db = db_from_pages(vec![metadata_page::<LittleEndian>(1), btree_page]);
        assert!(collect_blobs(&db).is_empty());
    }

    #[test]
    fn test_not_bdb_magic() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[12..16].copy_from_slice(b"junk");
        let err = BerkeleyDb::from_data(FileData::Owned(page)).unwrap_err();
        assert!(matches!(err, Error::NotBdb));

        let err = BerkeleyDb::from_data(FileData::Owned(vec![0u8; 16])).unwrap_err();
        assert!(matches!(err, Error::NotBdb));
    }

    #[test]
    fn test_encryption_unsupported() {
        let mut page = metadata_page::<LittleEndian>(0);
        page[24] = 1;
        let err = BerkeleyDb::from_data(FileData::Owned(page)).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_bad_page_size_rejected() {
        let mut page = metadata_page::<LittleEndian>(0);
        put_u32::<LittleEndian>(&mut page, 20, 1000); // not a power of two
        let err = BerkeleyDb::from_data(FileData::Owned(page)).unwrap_err();
        assert!(err.to_string().contains("page size"));
    }

    #[test]
    fn test_cancellation_stops_iteration() {
        let value = vec![0x33; 40];
        let db = db_from_pages(vec![
            metadata_page::<LittleEndian>(2),
            hash_page_offpage::<LittleEndian>(2, value.len() as u32),
            overflow_page::<LittleEndian>(2, 0, &value),
        ]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut iter = db.blobs(&cancel);
        assert!(matches!(iter.next(), Some(Err(Error::Cancelled))));
        assert!(iter.next().is_none());
    }
}
