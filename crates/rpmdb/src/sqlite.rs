//! SQLite backend: delegates the container format to the `sqlite-reader`
//! crate and adapts it to the blob-iterator contract shared with the BDB and
//! NDB readers.

use crate::cancel::CancelToken;
use crate::Error;
use std::path::Path;

/// An SQLite-backed package database opened for reading.
pub struct SqliteDb {
    inner: sqlite_reader::PackagesDb,
}

impl SqliteDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let inner = sqlite_reader::PackagesDb::open(path)?;
        Ok(Self { inner })
    }

    /// Traversal of every package blob in row order.
    ///
    /// The rows are fetched on the first `next()` call; the cancel token is
    /// observed before the fetch and before each yielded row.
    pub fn blobs<'a>(&'a self, cancel: &'a CancelToken) -> BlobIter<'a> {
        BlobIter {
            db: self,
            cancel,
            fetched: None,
            done: false,
        }
    }
}

impl From<sqlite_reader::Error> for Error {
    fn from(err: sqlite_reader::Error) -> Self {
        match err {
            sqlite_reader::Error::NotSqlite => Error::NotSqlite,
            sqlite_reader::Error::Io(e) => Error::Io(e),
            sqlite_reader::Error::Sqlite(e) => Error::Sqlite(e.to_string()),
        }
    }
}

/// Pull-based iterator over the database's package blobs.
pub struct BlobIter<'a> {
    db: &'a SqliteDb,
    cancel: &'a CancelToken,
    fetched: Option<std::vec::IntoIter<Vec<u8>>>,
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
        if self.fetched.is_none() {
            match self.db.inner.package_blobs() {
                Ok(blobs) => self.fetched = Some(blobs.into_iter()),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
        let rows = self.fetched.as_mut()?;
        match rows.next() {
            Some(blob) => Some(Ok(blob)),
            None => {
                self.done = true;
                None
            }
        }
    }
}
