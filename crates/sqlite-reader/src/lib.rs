//! Thin wrapper around the `rusqlite` engine for SQLite-backed package
//! databases.
//!
//! Modern rpm hosts keep the installed-package database in a plain SQLite
//! file (`rpmdb.sqlite`) whose `Packages` table has one row per package:
//! an `hnum` rowid and a `blob` column holding the serialized header. This
//! crate only knows how to pull those blobs out; decoding them is the
//! caller's business.

use rusqlite::{Connection, OpenFlags};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// First bytes of every SQLite 3 database file.
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

#[derive(Error, Debug)]
pub enum Error {
    /// The file exists but is not an SQLite database at all.
    #[error("not a SQLite database")]
    NotSqlite,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A read-only handle on the `Packages` table of an rpm SQLite database.
#[derive(Debug)]
pub struct PackagesDb {
    conn: Connection,
}

impl PackagesDb {
    /// Open a database file read-only.
    ///
    /// Returns [`Error::NotSqlite`] without touching the engine when the
    /// 16-byte magic does not match, so callers can fall through to other
    /// on-disk formats.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut magic = [0u8; 16];
        let mut file = std::fs::File::open(path)?;
        if file.read_exact(&mut magic).is_err() || &magic != SQLITE_MAGIC {
            return Err(Error::NotSqlite);
        }
        drop(file);

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Fetch every package header blob, in row order.
    pub fn package_blobs(&self) -> Result<Vec<Vec<u8>>, Error> {
        let mut stmt = self.conn.prepare("SELECT Blob, Hnum FROM Packages")?;
        let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
        let mut blobs = Vec::new();
        for row in rows {
            blobs.push(row?);
        }
        Ok(blobs)
    }
}
