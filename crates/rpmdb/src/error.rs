use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a SQLite database")]
    NotSqlite,

    #[error("not an NDB database")]
    NotNdb,

    #[error("not a BerkeleyDB hash database")]
    NotBdb,

    #[error("corrupted data: {0}")]
    Corrupted(String),

    #[error("unsupported database feature: {0}")]
    Unsupported(String),

    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("package {0} is not installed")]
    PackageNotFound(String),

    #[error("read cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this error only says "wrong on-disk format". The dispatcher
    /// recovers from these by trying the next backend; everything else is
    /// final.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::NotSqlite | Error::NotNdb | Error::NotBdb)
    }
}
