//! Pure Rust reader for the RPM installed-package database.
//!
//! Reads all three on-disk generations of `/var/lib/rpm` without any host
//! RPM tooling:
//!
//! - BerkeleyDB hash databases (`Packages`) — CentOS/RHEL up to 7, SLE ≤ 12
//! - NDB databases (`Packages.db`) — SUSE/openSUSE
//! - SQLite databases (`rpmdb.sqlite`) — Fedora 33+, CentOS/RHEL 9+
//!
//! All three store the same record type — one serialized RPM header blob per
//! installed package — so the format readers only differ in how they find
//! the blobs. Everything is strictly read-only: no locks, no repair, no
//! signature verification.
//!
//! # Example
//!
//! ```no_run
//! use rpmdb::{CancelToken, RpmDb};
//!
//! let db = RpmDb::open("/var/lib/rpm/Packages").unwrap();
//! for pkg in db.list_packages(&CancelToken::new()).unwrap() {
//!     println!("{}-{}-{}.{}", pkg.name, pkg.version, pkg.release, pkg.arch);
//! }
//! ```

pub mod bdb;
pub mod cancel;
pub mod db;
pub mod digest;
pub mod error;
pub mod file_flags;
pub mod header;
pub mod io_utils;
pub mod ndb;
pub mod package;
pub mod signature;
pub mod sqlite;
pub mod tags;

pub use cancel::CancelToken;
pub use db::{BlobIter, RpmDb};
pub use digest::DigestAlgorithm;
pub use error::Error;
pub use file_flags::FileFlags;
pub use package::{FileInfo, PackageInfo};
