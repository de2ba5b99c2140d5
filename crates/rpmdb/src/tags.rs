//! RPM tag numbers, tag-type codes and their size/alignment rules.
//!
//! Numeric values follow `rpmtag.h` and `header.c` of the canonical C
//! implementation. Only the tags the projector consumes are listed; the
//! decoder itself is tag-agnostic apart from the region sentinels and the
//! i18n-table lower bound.

/// Largest header blob accepted by the decoder: `8 + 16 * il + dl` must stay
/// below this.
pub const HEADER_MAX_BYTES: i64 = 256 * 1024 * 1024;

// Region sentinel tags. A header normally opens with one of these; its
// payload is the 16-byte region trailer.
pub const RPMTAG_HEADERIMAGE: i32 = 61;
pub const RPMTAG_HEADERSIGNATURES: i32 = 62;
pub const RPMTAG_HEADERIMMUTABLE: i32 = 63;

/// First legal tag in a header; everything below is reserved.
pub const HEADER_I18NTABLE: i32 = 100;

// Signature tags carried over into the main header.
pub const RPMTAG_PGP: i32 = 259;
pub const RPMTAG_SIGMD5: i32 = 261;

pub const RPMTAG_NAME: i32 = 1000;
pub const RPMTAG_VERSION: i32 = 1001;
pub const RPMTAG_RELEASE: i32 = 1002;
pub const RPMTAG_EPOCH: i32 = 1003;
pub const RPMTAG_SUMMARY: i32 = 1004;
pub const RPMTAG_INSTALLTIME: i32 = 1008;
pub const RPMTAG_SIZE: i32 = 1009;
pub const RPMTAG_VENDOR: i32 = 1011;
pub const RPMTAG_LICENSE: i32 = 1014;
pub const RPMTAG_ARCH: i32 = 1022;
pub const RPMTAG_FILESIZES: i32 = 1028;
pub const RPMTAG_FILEMODES: i32 = 1030;
pub const RPMTAG_FILEDIGESTS: i32 = 1035;
pub const RPMTAG_FILEFLAGS: i32 = 1037;
pub const RPMTAG_FILEUSERNAME: i32 = 1039;
pub const RPMTAG_FILEGROUPNAME: i32 = 1040;
pub const RPMTAG_SOURCERPM: i32 = 1044;
pub const RPMTAG_PROVIDENAME: i32 = 1047;
pub const RPMTAG_REQUIRENAME: i32 = 1049;
pub const RPMTAG_DIRINDEXES: i32 = 1116;
pub const RPMTAG_BASENAMES: i32 = 1117;
pub const RPMTAG_DIRNAMES: i32 = 1118;
pub const RPMTAG_FILEDIGESTALGO: i32 = 5011;
pub const RPMTAG_MODULARITYLABEL: i32 = 5096;

// rpmTagType_e — the closed set of tag data types.
pub const RPM_NULL_TYPE: u32 = 0;
pub const RPM_CHAR_TYPE: u32 = 1;
pub const RPM_INT8_TYPE: u32 = 2;
pub const RPM_INT16_TYPE: u32 = 3;
pub const RPM_INT32_TYPE: u32 = 4;
pub const RPM_INT64_TYPE: u32 = 5;
pub const RPM_STRING_TYPE: u32 = 6;
pub const RPM_BIN_TYPE: u32 = 7;
pub const RPM_STRING_ARRAY_TYPE: u32 = 8;
pub const RPM_I18NSTRING_TYPE: u32 = 9;

/// Largest valid tag-type code.
pub const RPM_MAX_TYPE: u32 = 9;

/// Fixed element size of a tag type, or `None` for the null-terminated
/// variable-length types (string, string array, i18n string).
pub fn type_size(t: u32) -> Option<usize> {
    match t {
        RPM_NULL_TYPE => Some(0),
        RPM_CHAR_TYPE | RPM_INT8_TYPE | RPM_BIN_TYPE => Some(1),
        RPM_INT16_TYPE => Some(2),
        RPM_INT32_TYPE => Some(4),
        RPM_INT64_TYPE => Some(8),
        RPM_STRING_TYPE | RPM_STRING_ARRAY_TYPE | RPM_I18NSTRING_TYPE => None,
        _ => Some(0),
    }
}

/// Required data-segment alignment of a tag type's payload.
pub fn type_align(t: u32) -> i32 {
    match t {
        RPM_INT16_TYPE => 2,
        RPM_INT32_TYPE => 4,
        RPM_INT64_TYPE => 8,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes_match_alignment() {
        // Every fixed-size numeric type is stored at its natural alignment.
        for t in [RPM_INT16_TYPE, RPM_INT32_TYPE, RPM_INT64_TYPE] {
            assert_eq!(type_size(t).unwrap() as i32, type_align(t));
        }
        for t in [
            RPM_STRING_TYPE,
            RPM_STRING_ARRAY_TYPE,
            RPM_I18NSTRING_TYPE,
        ] {
            assert!(type_size(t).is_none());
            assert_eq!(type_align(t), 1);
        }
    }
}
