//! RPM header blob decoding.
//!
//! A header blob is a self-describing tag/type/value container shared by the
//! package file format and every database generation:
//!
//! | Offset      | Type         | Field                              |
//! |-------------|--------------|------------------------------------|
//! | 0           | i32 (BE)     | il — number of index entries       |
//! | 4           | i32 (BE)     | dl — data segment length in bytes  |
//! | 8           | 16 × il      | index entries                      |
//! | 8 + 16·il   | dl bytes     | data segment                       |
//!
//! Each 16-byte index entry is `tag:i32, type:u32, offset:i32, count:u32`,
//! all big-endian. Blobs normally open with a region entry (tag 61/62/63)
//! whose payload is a 16-byte trailer; the negated trailer offset divided by
//! 16 gives `ril`, the number of entries belonging to the main region. Any
//! entries past the region are "dribbles" that override region entries
//! carrying the same tag.
//!
//! The input is untrusted: every offset, count and length is validated
//! before a single payload byte is sliced, and a malformed blob is always an
//! error, never a panic.

use crate::io_utils::{strtaglen, BinaryReader};
use crate::tags::{
    type_align, type_size, HEADER_I18NTABLE, HEADER_MAX_BYTES, RPMTAG_HEADERIMAGE,
    RPMTAG_HEADERIMMUTABLE, RPMTAG_HEADERSIGNATURES, RPM_BIN_TYPE, RPM_MAX_TYPE, RPM_STRING_TYPE,
};
use crate::Error;
use std::collections::BTreeMap;

/// On-disk size of one index entry.
pub const ENTRY_INFO_SIZE: usize = 16;

/// A region entry's payload is exactly one trailer entry.
const REGION_TAG_COUNT: u32 = ENTRY_INFO_SIZE as u32;

/// Native-order tag/type/offset/count quad of one index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub tag: i32,
    pub typ: u32,
    pub offset: i32,
    pub count: u32,
}

impl EntryInfo {
    fn parse(reader: &mut BinaryReader) -> Result<Self, Error> {
        Ok(Self {
            tag: reader.read_i32()?,
            typ: reader.read_u32()?,
            offset: reader.read_i32()?,
            count: reader.read_u32()?,
        })
    }
}

/// One decoded index entry: entry info plus the payload slice it describes.
#[derive(Debug, Clone)]
pub struct IndexEntry<'a> {
    pub info: EntryInfo,
    pub length: usize,
    pub data: &'a [u8],
}

/// Decode one header blob into its index entries.
///
/// Entries come back in region order; when dribble entries forced a merge the
/// result is in ascending tag order instead (the merge is tag-keyed, later
/// entries winning).
pub fn decode(data: &[u8]) -> Result<Vec<IndexEntry<'_>>, Error> {
    let blob = HeaderBlob::init(data)?;
    blob.import(data)
}

/// Parsed blob geometry, before entry payloads are resolved.
struct HeaderBlob {
    entries: Vec<EntryInfo>,
    il: i32,
    dl: i32,
    data_start: i32,
    data_end: i32,
    region_tag: i32,
    ril: i32,
    rdl: i32,
}

impl HeaderBlob {
    fn init(data: &[u8]) -> Result<Self, Error> {
        let mut reader: BinaryReader = BinaryReader::new(data);
        let il = reader.read_i32()?;
        let dl = reader.read_i32()?;

        // il and dl are attacker-controlled; keep the geometry in i64 so the
        // products cannot wrap before they are range-checked.
        let pvlen = 8i64 + 16 * i64::from(il) + i64::from(dl);
        if pvlen >= HEADER_MAX_BYTES {
            return Err(Error::Corrupted(format!(
                "blob size BAD: 8 + 16 * il({}) + dl({}) = {}",
                il, dl, pvlen
            )));
        }
        if il < 1 {
            return Err(Error::Corrupted(format!("region no tags: il {}", il)));
        }
        if dl < 0 {
            return Err(Error::Corrupted(format!("negative data length: dl {}", dl)));
        }

        let data_start = 8 + 16 * il;
        let data_end = data_start + dl;
        if (data.len() as i64) < i64::from(data_end) {
            return Err(Error::Corrupted(format!(
                "blob truncated: {} bytes, il {} dl {} need {}",
                data.len(),
                il,
                dl,
                data_end
            )));
        }

        let mut entries = Vec::with_capacity(il as usize);
        for _ in 0..il {
            entries.push(EntryInfo::parse(&mut reader)?);
        }

        let mut blob = HeaderBlob {
            entries,
            il,
            dl,
            data_start,
            data_end,
            region_tag: 0,
            ril: il,
            rdl: 0,
        };
        blob.verify_region(data)?;
        blob.verify_info(data)?;
        Ok(blob)
    }

    /// Check the region entry and its trailer, establishing `ril` and `rdl`.
    ///
    /// A first entry that is not a region sentinel leaves `ril = il`: the
    /// whole index is treated as one region.
    fn verify_region(&mut self, data: &[u8]) -> Result<(), Error> {
        let einfo = self.entries[0];
        let region_tag = match einfo.tag {
            RPMTAG_HEADERIMAGE | RPMTAG_HEADERSIGNATURES | RPMTAG_HEADERIMMUTABLE => einfo.tag,
            _ => return Ok(()),
        };

        if einfo.typ != RPM_BIN_TYPE || einfo.count != REGION_TAG_COUNT {
            return Err(Error::Corrupted(format!(
                "invalid region tag: type {} count {}",
                einfo.typ, einfo.count
            )));
        }
        if hdrchk_range(self.dl, i64::from(einfo.offset) + ENTRY_INFO_SIZE as i64) {
            return Err(Error::Corrupted(format!(
                "invalid region offset: {}",
                einfo.offset
            )));
        }

        let region_end = (self.data_start + einfo.offset) as usize;
        let trailer_bytes = data
            .get(region_end..region_end + ENTRY_INFO_SIZE)
            .ok_or_else(|| {
                Error::Corrupted(format!("region trailer out of bounds at {}", region_end))
            })?;
        let trailer = EntryInfo::parse(&mut BinaryReader::new(trailer_bytes))?;
        self.rdl = einfo.offset + ENTRY_INFO_SIZE as i32;

        let neg_offset = i64::from(trailer.offset)
            .checked_neg()
            .filter(|off| *off > 0)
            .ok_or_else(|| {
                Error::Corrupted(format!("invalid region trailer offset: {}", trailer.offset))
            })?;
        if neg_offset % ENTRY_INFO_SIZE as i64 != 0 {
            return Err(Error::Corrupted(format!(
                "invalid region size: trailer offset {}",
                trailer.offset
            )));
        }
        let ril = (neg_offset / ENTRY_INFO_SIZE as i64) as i32;
        if ril <= 1 || ril > self.il || hdrchk_range(self.dl, i64::from(self.rdl)) {
            return Err(Error::Corrupted(format!(
                "invalid region size: ril {} il {} rdl {}",
                ril, self.il, self.rdl
            )));
        }

        self.ril = ril;
        self.region_tag = region_tag;
        Ok(())
    }

    /// Verify every non-region entry: offsets monotone and in range, tag and
    /// type codes valid, payload aligned, inferred data length positive and
    /// contained in the data segment.
    fn verify_info(&self, data: &[u8]) -> Result<(), Error> {
        let start = if self.region_tag != 0 { 1 } else { 0 };
        let mut end: i64 = 0;

        for info in &self.entries[start..] {
            if i64::from(info.offset) < end {
                return Err(Error::Corrupted(format!(
                    "overlapping entries: tag {} offset {} inside previous entry ending at {}",
                    info.tag, info.offset, end
                )));
            }
            if info.tag < HEADER_I18NTABLE {
                return Err(Error::Corrupted(format!("invalid tag: {}", info.tag)));
            }
            if info.typ > RPM_MAX_TYPE {
                return Err(Error::Corrupted(format!(
                    "invalid type {} for tag {}",
                    info.typ, info.tag
                )));
            }
            if info.offset & (type_align(info.typ) - 1) != 0 {
                return Err(Error::Corrupted(format!(
                    "misaligned offset {} for tag {} type {}",
                    info.offset, info.tag, info.typ
                )));
            }
            if hdrchk_range(self.dl, i64::from(info.offset)) {
                return Err(Error::Corrupted(format!(
                    "offset {} out of range for tag {} (dl {})",
                    info.offset, info.tag, self.dl
                )));
            }

            let len = data_length(
                data,
                info.typ,
                info.count,
                self.data_start + info.offset,
                self.data_end,
            );
            match len {
                Some(len)
                    if len > 0 && !hdrchk_range(self.dl, i64::from(info.offset) + len as i64) =>
                {
                    end = i64::from(info.offset) + len as i64;
                }
                _ => {
                    return Err(Error::Corrupted(format!(
                        "invalid data length for tag {} type {} count {}",
                        info.tag, info.typ, info.count
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve entry payloads for the region and merge in any dribbles.
    fn import<'a>(&self, data: &'a [u8]) -> Result<Vec<IndexEntry<'a>>, Error> {
        let mut ril = self.ril;
        if self.entries[0].offset == 0 {
            // Historical v3 exception: a zero first offset means the whole
            // index is one region.
            ril = self.il;
        }

        let entries = self.region_swab(data, &self.entries[1..ril as usize])?;

        if self.ril < self.il - 1 {
            let dribbles = self.region_swab(data, &self.entries[ril as usize..])?;
            let mut by_tag: BTreeMap<i32, IndexEntry<'a>> = BTreeMap::new();
            for entry in entries.into_iter().chain(dribbles) {
                by_tag.insert(entry.info.tag, entry);
            }
            return Ok(by_tag.into_values().collect());
        }
        Ok(entries)
    }

    /// Slice the payload of each entry out of the data segment.
    ///
    /// A variable-length entry followed by another entry runs to the next
    /// entry's offset (alignment padding included); the last one, and every
    /// fixed-size entry, gets its length inferred from type and count.
    fn region_swab<'a>(
        &self,
        data: &'a [u8],
        entries: &[EntryInfo],
    ) -> Result<Vec<IndexEntry<'a>>, Error> {
        let mut out = Vec::with_capacity(entries.len());
        for (i, info) in entries.iter().enumerate() {
            let start = self.data_start + info.offset;
            if start >= self.data_end {
                return Err(Error::Corrupted(format!(
                    "invalid data offset {} for tag {}",
                    info.offset, info.tag
                )));
            }

            let length = if i < entries.len() - 1 && type_size(info.typ).is_none() {
                usize::try_from(entries[i + 1].offset - info.offset).map_err(|_| {
                    Error::Corrupted(format!(
                        "invalid data length for tag {}: next offset {} below {}",
                        info.tag,
                        entries[i + 1].offset,
                        info.offset
                    ))
                })?
            } else {
                data_length(data, info.typ, info.count, start, self.data_end).ok_or_else(
                    || {
                        Error::Corrupted(format!(
                            "invalid data length for tag {} type {} count {}",
                            info.tag, info.typ, info.count
                        ))
                    },
                )?
            };

            let start = start as usize;
            let end = start + length;
            if end > self.data_end as usize {
                return Err(Error::Corrupted(format!(
                    "data for tag {} overruns segment: {}..{} (end {})",
                    info.tag, start, end, self.data_end
                )));
            }
            out.push(IndexEntry {
                info: *info,
                length,
                data: &data[start..end],
            });
        }
        Ok(out)
    }
}

/// `offset < 0 || offset > dl`
fn hdrchk_range(dl: i32, offset: i64) -> bool {
    offset < 0 || offset > i64::from(dl)
}

/// Inferred payload length of one entry, in bytes.
///
/// `start` is absolute within the blob, `data_end` is the end of the data
/// segment. Returns `None` when the length cannot be determined or would
/// escape the segment.
fn data_length(data: &[u8], typ: u32, count: u32, start: i32, data_end: i32) -> Option<usize> {
    match typ {
        RPM_STRING_TYPE => {
            if count != 1 {
                return None;
            }
            strtag_window(data, start, data_end, 1)
        }
        t if type_size(t).is_none() => strtag_window(data, start, data_end, count),
        t => {
            let size = type_size(t)?;
            let len = size.checked_mul(count as usize)?;
            if i64::from(start) + len as i64 > i64::from(data_end) {
                return None;
            }
            Some(len)
        }
    }
}

/// Run `strtaglen` over the window `[start, data_end)` of the blob.
fn strtag_window(data: &[u8], start: i32, data_end: i32, count: u32) -> Option<usize> {
    if start < 0 || start >= data_end {
        return None;
    }
    let window = data.get(start as usize..data_end as usize)?;
    strtaglen(window, count)
}
