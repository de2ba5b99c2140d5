//! File digest algorithm codes.
//!
//! The codes come from the OpenPGP hash-algorithm registry; rpm stores one
//! per package in the FILEDIGESTALGO tag (absent means md5 on very old
//! hosts, but the projector keeps absence as code 0).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric digest algorithm code from the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestAlgorithm(pub i32);

pub const PGPHASHALGO_MD5: DigestAlgorithm = DigestAlgorithm(1);
pub const PGPHASHALGO_SHA1: DigestAlgorithm = DigestAlgorithm(2);
pub const PGPHASHALGO_RIPEMD160: DigestAlgorithm = DigestAlgorithm(3);
pub const PGPHASHALGO_MD2: DigestAlgorithm = DigestAlgorithm(5);
pub const PGPHASHALGO_TIGER192: DigestAlgorithm = DigestAlgorithm(6);
pub const PGPHASHALGO_HAVAL_5_160: DigestAlgorithm = DigestAlgorithm(7);
pub const PGPHASHALGO_SHA256: DigestAlgorithm = DigestAlgorithm(8);
pub const PGPHASHALGO_SHA384: DigestAlgorithm = DigestAlgorithm(9);
pub const PGPHASHALGO_SHA512: DigestAlgorithm = DigestAlgorithm(10);
pub const PGPHASHALGO_SHA224: DigestAlgorithm = DigestAlgorithm(11);

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            PGPHASHALGO_MD5 => "md5",
            PGPHASHALGO_SHA1 => "sha1",
            PGPHASHALGO_RIPEMD160 => "ripemd160",
            PGPHASHALGO_MD2 => "md2",
            PGPHASHALGO_TIGER192 => "tiger192",
            PGPHASHALGO_HAVAL_5_160 => "haval-5-160",
            PGPHASHALGO_SHA256 => "sha256",
            PGPHASHALGO_SHA384 => "sha384",
            PGPHASHALGO_SHA512 => "sha512",
            PGPHASHALGO_SHA224 => "sha224",
            _ => "unknown-digest-algorithm",
        })
    }
}
