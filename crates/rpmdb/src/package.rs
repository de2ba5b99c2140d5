//! Package projection: turning decoded index entries into typed metadata.

use crate::digest::DigestAlgorithm;
use crate::file_flags::FileFlags;
use crate::header::IndexEntry;
use crate::io_utils::hex_string;
use crate::signature;
use crate::tags::{
    RPMTAG_ARCH, RPMTAG_BASENAMES, RPMTAG_DIRINDEXES, RPMTAG_DIRNAMES, RPMTAG_EPOCH,
    RPMTAG_FILEDIGESTALGO, RPMTAG_FILEDIGESTS, RPMTAG_FILEFLAGS, RPMTAG_FILEGROUPNAME,
    RPMTAG_FILEMODES, RPMTAG_FILESIZES, RPMTAG_FILEUSERNAME, RPMTAG_INSTALLTIME, RPMTAG_LICENSE,
    RPMTAG_MODULARITYLABEL, RPMTAG_NAME, RPMTAG_PGP, RPMTAG_PROVIDENAME, RPMTAG_RELEASE,
    RPMTAG_REQUIRENAME, RPMTAG_SIGMD5, RPMTAG_SIZE, RPMTAG_SOURCERPM, RPMTAG_SUMMARY,
    RPMTAG_VENDOR, RPMTAG_VERSION, RPM_BIN_TYPE, RPM_I18NSTRING_TYPE, RPM_INT16_TYPE,
    RPM_INT32_TYPE, RPM_STRING_ARRAY_TYPE, RPM_STRING_TYPE,
};
use crate::Error;
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Metadata of one installed package, projected from its header blob.
///
/// The per-file vectors are parallel arrays indexed by file number; paths
/// reconstruct as `dir_names[dir_indexes[i]] + base_names[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub epoch: Option<i32>,
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub source_rpm: String,
    pub size: i32,
    pub license: String,
    pub vendor: String,
    pub modularity_label: String,
    pub summary: String,
    pub pgp: String,
    pub sig_md5: String,
    pub digest_algorithm: DigestAlgorithm,
    pub install_time: i32,
    pub base_names: Vec<String>,
    pub dir_indexes: Vec<i32>,
    pub dir_names: Vec<String>,
    pub file_sizes: Vec<i32>,
    pub file_digests: Vec<String>,
    pub file_modes: Vec<u16>,
    pub file_flags: Vec<i32>,
    pub user_names: Vec<String>,
    pub group_names: Vec<String>,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
}

/// One installed file derived from the parallel per-file arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub mode: u16,
    pub digest: String,
    pub size: i32,
    pub username: String,
    pub groupname: String,
    pub flags: FileFlags,
}

impl PackageInfo {
    /// Project a set of index entries into package metadata.
    ///
    /// Every consumed tag is type-checked; a mismatch means the blob lied
    /// about its layout and the whole package is rejected.
    pub fn from_entries(entries: &[IndexEntry<'_>]) -> Result<Self, Error> {
        let mut pkg = PackageInfo::default();
        for ie in entries {
            match ie.info.tag {
                RPMTAG_NAME => pkg.name = parse_string(ie, "name")?,
                RPMTAG_VERSION => pkg.version = parse_string(ie, "version")?,
                RPMTAG_RELEASE => pkg.release = parse_string(ie, "release")?,
                RPMTAG_ARCH => pkg.arch = parse_string(ie, "arch")?,
                RPMTAG_MODULARITYLABEL => {
                    pkg.modularity_label = parse_string(ie, "modularitylabel")?
                }
                RPMTAG_SOURCERPM => pkg.source_rpm = none_to_empty(parse_string(ie, "sourcerpm")?),
                RPMTAG_LICENSE => pkg.license = none_to_empty(parse_string(ie, "license")?),
                RPMTAG_VENDOR => pkg.vendor = none_to_empty(parse_string(ie, "vendor")?),
                RPMTAG_EPOCH => pkg.epoch = Some(parse_i32(ie, "epoch")?),
                RPMTAG_SIZE => pkg.size = parse_i32(ie, "size")?,
                RPMTAG_INSTALLTIME => pkg.install_time = parse_i32(ie, "installtime")?,
                RPMTAG_FILEDIGESTALGO => {
                    pkg.digest_algorithm = DigestAlgorithm(parse_i32(ie, "filedigestalgo")?)
                }
                RPMTAG_SUMMARY => {
                    // Localized on most hosts; either way only the first
                    // null-terminated segment (the C locale) is kept.
                    if ie.info.typ != RPM_I18NSTRING_TYPE && ie.info.typ != RPM_STRING_TYPE {
                        return Err(invalid_tag("summary"));
                    }
                    let first = ie.data.split(|&b| b == 0).next().unwrap_or_default();
                    pkg.summary = String::from_utf8_lossy(first).into_owned();
                }
                RPMTAG_PGP => {
                    if ie.info.typ != RPM_BIN_TYPE {
                        return Err(invalid_tag("pgp"));
                    }
                    pkg.pgp = signature::describe(ie.data)?;
                }
                RPMTAG_SIGMD5 => {
                    if ie.info.typ != RPM_BIN_TYPE {
                        return Err(invalid_tag("sigmd5"));
                    }
                    pkg.sig_md5 = hex_string(ie.data);
                }
                RPMTAG_DIRINDEXES => pkg.dir_indexes = parse_i32_array(ie, "dirindexes")?,
                RPMTAG_FILESIZES => pkg.file_sizes = parse_i32_array(ie, "filesizes")?,
                RPMTAG_FILEFLAGS => pkg.file_flags = parse_i32_array(ie, "fileflags")?,
                RPMTAG_FILEMODES => pkg.file_modes = parse_u16_array(ie, "filemodes")?,
                RPMTAG_DIRNAMES => pkg.dir_names = parse_string_array(ie, "dirnames")?,
                RPMTAG_BASENAMES => pkg.base_names = parse_string_array(ie, "basenames")?,
                RPMTAG_FILEDIGESTS => pkg.file_digests = parse_string_array(ie, "filedigests")?,
                RPMTAG_FILEUSERNAME => pkg.user_names = parse_string_array(ie, "fileusername")?,
                RPMTAG_FILEGROUPNAME => {
                    pkg.group_names = parse_string_array(ie, "filegroupname")?
                }
                RPMTAG_PROVIDENAME => pkg.provides = parse_string_array(ie, "providename")?,
                RPMTAG_REQUIRENAME => pkg.requires = parse_string_array(ie, "requirename")?,
                _ => {}
            }
        }
        Ok(pkg)
    }

    /// Epoch as a plain integer, zero when the header has no epoch tag.
    pub fn epoch_num(&self) -> i32 {
        self.epoch.unwrap_or(0)
    }

    /// Reconstructed path of every installed file.
    ///
    /// Empty when the header carries no file arrays (a meta package, or a
    /// header stripped of file info).
    pub fn installed_file_names(&self) -> Result<Vec<String>, Error> {
        if self.dir_names.is_empty() || self.dir_indexes.is_empty() || self.base_names.is_empty() {
            return Ok(Vec::new());
        }
        if self.dir_indexes.len() != self.base_names.len()
            || self.dir_names.len() > self.base_names.len()
        {
            return Err(Error::Corrupted(format!(
                "invalid file metadata: {} basenames, {} dirindexes, {} dirnames",
                self.base_names.len(),
                self.dir_indexes.len(),
                self.dir_names.len()
            )));
        }

        let mut paths = Vec::with_capacity(self.base_names.len());
        for (base, &dir_index) in self.base_names.iter().zip(&self.dir_indexes) {
            let dir = usize::try_from(dir_index)
                .ok()
                .and_then(|i| self.dir_names.get(i))
                .ok_or_else(|| {
                    Error::Corrupted(format!(
                        "dir index {} out of range ({} dirnames)",
                        dir_index,
                        self.dir_names.len()
                    ))
                })?;
            // Plain concatenation: dirname entries carry their own trailing
            // slash on disk.
            paths.push(format!("{}{}", dir, base));
        }
        Ok(paths)
    }

    /// Installed files with their per-file metadata.
    ///
    /// The per-file arrays can be shorter than the path list in stripped
    /// headers; missing values degrade to empty/zero rather than failing.
    pub fn installed_files(&self) -> Result<Vec<FileInfo>, Error> {
        let names = self.installed_file_names()?;
        let mut files = Vec::with_capacity(names.len());
        for (i, path) in names.into_iter().enumerate() {
            files.push(FileInfo {
                path,
                mode: self.file_modes.get(i).copied().unwrap_or_default(),
                digest: self.file_digests.get(i).cloned().unwrap_or_default(),
                size: self.file_sizes.get(i).copied().unwrap_or_default(),
                username: self.user_names.get(i).cloned().unwrap_or_default(),
                groupname: self.group_names.get(i).cloned().unwrap_or_default(),
                flags: FileFlags(self.file_flags.get(i).copied().unwrap_or_default()),
            });
        }
        Ok(files)
    }
}

fn invalid_tag(name: &str) -> Error {
    Error::Corrupted(format!("invalid tag {}", name))
}

/// Strings are stored null-terminated, possibly followed by alignment
/// padding; strip every trailing null.
fn trim_nul(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

fn parse_string(ie: &IndexEntry<'_>, name: &str) -> Result<String, Error> {
    if ie.info.typ != RPM_STRING_TYPE {
        return Err(invalid_tag(name));
    }
    Ok(String::from_utf8_lossy(trim_nul(ie.data)).into_owned())
}

/// Old databases spell "no value" as the literal `(none)`.
fn none_to_empty(s: String) -> String {
    if s == "(none)" {
        String::new()
    } else {
        s
    }
}

fn parse_string_array(ie: &IndexEntry<'_>, name: &str) -> Result<Vec<String>, Error> {
    if ie.info.typ != RPM_STRING_ARRAY_TYPE {
        return Err(invalid_tag(name));
    }
    let mut elements: Vec<String> = ie
        .data
        .split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();
    // The terminator of the last element produces exactly one empty tail.
    if elements.last().is_some_and(|s| s.is_empty()) {
        elements.pop();
    }
    Ok(elements)
}

fn parse_i32(ie: &IndexEntry<'_>, name: &str) -> Result<i32, Error> {
    if ie.info.typ != RPM_INT32_TYPE {
        return Err(invalid_tag(name));
    }
    if ie.data.len() < 4 {
        return Err(Error::Corrupted(format!("short int32 data for {}", name)));
    }
    Ok(BigEndian::read_i32(&ie.data[..4]))
}

fn parse_i32_array(ie: &IndexEntry<'_>, name: &str) -> Result<Vec<i32>, Error> {
    if ie.info.typ != RPM_INT32_TYPE {
        return Err(invalid_tag(name));
    }
    Ok(ie.data.chunks_exact(4).map(BigEndian::read_i32).collect())
}

fn parse_u16_array(ie: &IndexEntry<'_>, name: &str) -> Result<Vec<u16>, Error> {
    if ie.info.typ != RPM_INT16_TYPE {
        return Err(invalid_tag(name));
    }
    Ok(ie.data.chunks_exact(2).map(BigEndian::read_u16).collect())
}
