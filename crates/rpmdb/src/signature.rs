//! PGP signature descriptor parsing.
//!
//! The PGP tag payload is an OpenPGP signature packet. Only enough of it is
//! parsed to describe the signature — public-key algorithm, hash algorithm,
//! creation date and key ID — never to verify anything. Three historical
//! layouts occur in practice, all big-endian, selected by the
//! (signature type, version) pair right after the one-byte packet tag:
//!
//! | signature type | version | layout  | field order                                   |
//! |----------------|---------|---------|-----------------------------------------------|
//! | 1              | 0x1c    | text    | 2 pad, pubkey, hash, 4 pad, date, 4 pad, keyid |
//! | 2              | 0x33    | v4      | 2 pad, pubkey, hash, 17 pad, keyid, 2 pad, date |
//! | anything else  | —       | classic | 3 pad, date, keyid, pubkey, hash              |

use crate::io_utils::{hex_string, BinaryReader};
use crate::Error;

struct SigFields {
    pubkey: u8,
    hash: u8,
    date: i32,
    key_id: [u8; 8],
}

/// Render the binary PGP payload as
/// `"<pubkey>/<hash>, <date>, Key ID <keyid>"`.
pub fn describe(data: &[u8]) -> Result<String, Error> {
    let mut reader: BinaryReader = BinaryReader::new(data);
    let _packet_tag = reader.read_u8()?;
    let signature_type = reader.read_u8()?;
    let version = reader.read_u8()?;

    let sig = match (signature_type, version) {
        (1, 0x1c) => parse_text_sig(&mut reader)?,
        (2, 0x33) => parse_v4_sig(&mut reader)?,
        _ => parse_classic_sig(&mut reader)?,
    };

    Ok(format!(
        "{}/{}, {}, Key ID {}",
        pubkey_name(sig.pubkey),
        hash_name(sig.hash),
        format_utc(sig.date),
        hex_string(&sig.key_id)
    ))
}

fn parse_text_sig(reader: &mut BinaryReader) -> Result<SigFields, Error> {
    reader.skip(2)?;
    let pubkey = reader.read_u8()?;
    let hash = reader.read_u8()?;
    reader.skip(4)?;
    let date = reader.read_i32()?;
    reader.skip(4)?;
    let key_id = read_key_id(reader)?;
    Ok(SigFields {
        pubkey,
        hash,
        date,
        key_id,
    })
}

fn parse_v4_sig(reader: &mut BinaryReader) -> Result<SigFields, Error> {
    reader.skip(2)?;
    let pubkey = reader.read_u8()?;
    let hash = reader.read_u8()?;
    reader.skip(17)?;
    let key_id = read_key_id(reader)?;
    reader.skip(2)?;
    let date = reader.read_i32()?;
    Ok(SigFields {
        pubkey,
        hash,
        date,
        key_id,
    })
}

fn parse_classic_sig(reader: &mut BinaryReader) -> Result<SigFields, Error> {
    reader.skip(3)?;
    let date = reader.read_i32()?;
    let key_id = read_key_id(reader)?;
    let pubkey = reader.read_u8()?;
    let hash = reader.read_u8()?;
    Ok(SigFields {
        pubkey,
        hash,
        date,
        key_id,
    })
}

fn read_key_id(reader: &mut BinaryReader) -> Result<[u8; 8], Error> {
    let bytes = reader.read_bytes(8)?;
    let mut key_id = [0u8; 8];
    key_id.copy_from_slice(&bytes);
    Ok(key_id)
}

fn pubkey_name(code: u8) -> &'static str {
    match code {
        0x01 => "RSA",
        _ => "unknown",
    }
}

fn hash_name(code: u8) -> &'static str {
    match code {
        0x02 => "SHA1",
        0x08 => "SHA256",
        _ => "unknown",
    }
}

/// Render a Unix timestamp as `Www Mmm _d HH:MM:SS YYYY` in UTC (day of
/// month space-padded), the shape `rpm -qi` prints signature dates in.
fn format_utc(timestamp: i32) -> String {
    const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let secs = i64::from(timestamp);
    let days = secs.div_euclid(86400);
    let rem = secs.rem_euclid(86400);
    let hours = rem / 3600;
    let minutes = (rem % 3600) / 60;
    let seconds = rem % 60;

    let (year, month, day) = days_to_ymd(days);
    // 1970-01-01 was a Thursday.
    let weekday = (days.rem_euclid(7) + 4) % 7;

    format!(
        "{} {} {:2} {:02}:{:02}:{:02} {}",
        WEEKDAYS[weekday as usize],
        MONTHS[month - 1],
        day,
        hours,
        minutes,
        seconds,
        year
    )
}

fn days_to_ymd(mut days: i64) -> (i64, usize, i64) {
    if days < 0 {
        days = 0;
    }
    let mut year = 1970i64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }
    let leap = is_leap_year(year);
    let month_days: [i64; 12] = if leap {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };
    let mut month = 1usize;
    for md in month_days {
        if days < md {
            break;
        }
        days -= md;
        month += 1;
    }
    (year, month, days + 1)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
