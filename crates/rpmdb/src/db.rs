//! Format auto-detection and the unified database handle.

use crate::bdb::BerkeleyDb;
use crate::cancel::CancelToken;
use crate::header;
use crate::ndb::NdbFile;
use crate::package::PackageInfo;
use crate::sqlite::SqliteDb;
use crate::Error;
use std::path::Path;

/// An open package database; the backend is chosen by content sniffing.
pub struct RpmDb {
    backend: Backend,
}

/// Closed set of database backends.
enum Backend {
    Sqlite(SqliteDb),
    Ndb(NdbFile),
    Bdb(BerkeleyDb),
}

/// Iterator over raw header blobs, one per installed package, in on-disk
/// traversal order.
pub enum BlobIter<'a> {
    Sqlite(crate::sqlite::BlobIter<'a>),
    Ndb(crate::ndb::BlobIter<'a>),
    Bdb(crate::bdb::BlobIter<'a>),
}

impl Iterator for BlobIter<'_> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BlobIter::Sqlite(iter) => iter.next(),
            BlobIter::Ndb(iter) => iter.next(),
            BlobIter::Bdb(iter) => iter.next(),
        }
    }
}

impl RpmDb {
    /// Open a package database, trying SQLite, NDB and BerkeleyDB in order.
    ///
    /// Each reader rejects foreign files with a cheap magic probe; only a
    /// format mismatch moves on to the next candidate, any other failure is
    /// final.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let backend = match SqliteDb::open(path) {
            Ok(db) => Backend::Sqlite(db),
            Err(Error::NotSqlite) => match NdbFile::open(path) {
                Ok(db) => Backend::Ndb(db),
                Err(Error::NotNdb) => Backend::Bdb(BerkeleyDb::open(path)?),
                Err(err) => return Err(err),
            },
            Err(err) => return Err(err),
        };
        Ok(Self { backend })
    }

    /// Raw blob traversal; most callers want [`list_packages`] instead.
    ///
    /// [`list_packages`]: RpmDb::list_packages
    pub fn blobs<'a>(&'a self, cancel: &'a CancelToken) -> BlobIter<'a> {
        match &self.backend {
            Backend::Sqlite(db) => BlobIter::Sqlite(db.blobs(cancel)),
            Backend::Ndb(db) => BlobIter::Ndb(db.blobs(cancel)),
            Backend::Bdb(db) => BlobIter::Bdb(db.blobs(cancel)),
        }
    }

    /// Decode and project every installed package.
    pub fn list_packages(&self, cancel: &CancelToken) -> Result<Vec<PackageInfo>, Error> {
        let mut packages = Vec::new();
        for blob in self.blobs(cancel) {
            let blob = blob?;
            let entries = header::decode(&blob)?;
            packages.push(PackageInfo::from_entries(&entries)?);
        }
        Ok(packages)
    }

    /// Find one package by name: the first match in traversal order.
    pub fn package(&self, cancel: &CancelToken, name: &str) -> Result<PackageInfo, Error> {
        for blob in self.blobs(cancel) {
            let blob = blob?;
            let entries = header::decode(&blob)?;
            let pkg = PackageInfo::from_entries(&entries)?;
            if pkg.name == name {
                return Ok(pkg);
            }
        }
        Err(Error::PackageNotFound(name.to_string()))
    }
}
