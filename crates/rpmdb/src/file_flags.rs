//! Per-file flag bits (`%{FILEFLAGS}`).

use serde::{Deserialize, Serialize};
use std::fmt;

pub const RPMFILE_CONFIG: i32 = 1 << 0;
pub const RPMFILE_DOC: i32 = 1 << 1;
pub const RPMFILE_MISSINGOK: i32 = 1 << 3;
pub const RPMFILE_NOREPLACE: i32 = 1 << 4;
pub const RPMFILE_SPECFILE: i32 = 1 << 5;
pub const RPMFILE_GHOST: i32 = 1 << 6;
pub const RPMFILE_LICENSE: i32 = 1 << 7;
pub const RPMFILE_README: i32 = 1 << 8;
pub const RPMFILE_ARTIFACT: i32 = 1 << 12;

/// Indicator characters in the order `rpm --queryformat '%{FILEFLAGS:fflags}'`
/// emits them.
const INDICATORS: [(i32, char); 9] = [
    (RPMFILE_DOC, 'd'),
    (RPMFILE_CONFIG, 'c'),
    (RPMFILE_SPECFILE, 's'),
    (RPMFILE_MISSINGOK, 'm'),
    (RPMFILE_NOREPLACE, 'n'),
    (RPMFILE_GHOST, 'g'),
    (RPMFILE_LICENSE, 'l'),
    (RPMFILE_README, 'r'),
    (RPMFILE_ARTIFACT, 'a'),
];

/// The flag word attached to one installed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFlags(pub i32);

impl FileFlags {
    pub fn contains(self, bit: i32) -> bool {
        self.0 & bit != 0
    }
}

impl fmt::Display for FileFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (bit, ch) in INDICATORS {
            if self.0 & bit != 0 {
                out.push(ch);
            }
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_flags() {
        let tests: &[(i32, &str)] = &[
            (0, ""),
            (RPMFILE_CONFIG, "c"),
            (RPMFILE_DOC, "d"),
            (RPMFILE_MISSINGOK, "m"),
            (RPMFILE_NOREPLACE, "n"),
            (RPMFILE_SPECFILE, "s"),
            (RPMFILE_GHOST, "g"),
            (RPMFILE_LICENSE, "l"),
            (RPMFILE_README, "r"),
            (RPMFILE_ARTIFACT, "a"),
            (
                RPMFILE_CONFIG
                    | RPMFILE_DOC
                    | RPMFILE_SPECFILE
                    | RPMFILE_MISSINGOK
                    | RPMFILE_NOREPLACE
                    | RPMFILE_GHOST
                    | RPMFILE_LICENSE
                    | RPMFILE_README
                    | RPMFILE_ARTIFACT,
                "dcsmnglra",
            ),
            (RPMFILE_DOC | RPMFILE_ARTIFACT, "da"),
            // Verified against `rpm -qa --queryformat '%{FILEFLAGS:fflags}|%{FILEFLAGS}\n'`.
            (89, "cmng"),
            (16, "n"),
            (64, "g"),
            (17, "cn"),
            (4096, "a"),
        ];
        for (flags, expected) in tests {
            assert_eq!(FileFlags(*flags).to_string(), *expected, "flags {}", flags);
        }
    }

    #[test]
    fn test_contains() {
        let flags = FileFlags(RPMFILE_CONFIG | RPMFILE_GHOST);
        assert!(flags.contains(RPMFILE_CONFIG));
        assert!(flags.contains(RPMFILE_GHOST));
        assert!(!flags.contains(RPMFILE_DOC));
    }
}
