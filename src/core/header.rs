//! `nom` parsers for the fixed-layout headers: file header, directory header and key
//! header.
//!
//! A key header on disk (pointers grow to 8 bytes for key versions above 1000):
//!
//! | bytes            | field     | meaning                                   |
//! |------------------|-----------|-------------------------------------------|
//! | 1->4             | Nbytes    | length of the compressed object and key   |
//! | 5->6             | Version   | key version identifier                    |
//! | 7->10            | ObjLen    | length of the uncompressed object         |
//! | 11->14           | Datime    | date and time the object was written      |
//! | 15->16           | KeyLen    | length of the key header                  |
//! | 17->18           | Cycle     | cycle of the key                          |
//! | 19->22 [19->26]  | SeekKey   | pointer to the record itself              |
//! | 23->26 [27->34]  | SeekPdir  | pointer to the directory header           |
//! | ..               | ClassName | `TString`                                 |
//! | ..               | Name      | `TString`                                 |
//! | ..               | Title     | `TString`                                 |
use std::fmt;

use nom::{
    bytes::complete::{tag, take},
    combinator::{map, opt},
    multi::count,
    number::complete::{be_i16, be_i32, be_u128, be_u16, be_u32, be_u64, be_u8},
    sequence::pair,
    IResult,
};
use uuid::Uuid;

use crate::core::cursor::latin1;

/// Size of the serialized file header with 64 bit pointers; the 32 bit form is shorter.
pub const FILE_HEADER_SIZE: u64 = 75;

/// File versions from here on use 8-byte seek pointers in the file header.
const LARGE_FILE_VERSION: i32 = 1_000_000;

/// Opening record of every ROOT file
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub version: i32,
    pub begin: u32,
    pub end: u64,
    pub seek_free: u64,
    pub nbytes_free: u32,
    pub nfree: i32,
    pub nbytes_name: u32,
    pub units: u8,
    pub compression: u32,
    pub seek_info: u64,
    pub nbytes_info: u32,
    pub uuid: Option<Uuid>,
}

impl FileHeader {
    /// A file without a streamer-info record holds nothing to decode.
    pub fn is_empty(&self) -> bool {
        self.seek_info == 0 && self.nbytes_info == 0
    }
}

/// Serialized part of a `TDirectory`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectoryHeader {
    pub version: u16,
    pub c_time: Datime,
    pub m_time: Datime,
    pub nbytes_keys: u32,
    pub nbytes_name: u32,
    pub seek_dir: u64,
    pub seek_parent: u64,
    pub seek_keys: u64,
    pub uuid: Option<Uuid>,
}

/// Packed date and time as stored by ROOT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Datime(pub u32);

impl Datime {
    pub fn year(self) -> u32 {
        (self.0 >> 26) + 1995
    }

    pub fn month(self) -> u32 {
        (self.0 >> 22) & 0xf
    }

    pub fn day(self) -> u32 {
        (self.0 >> 17) & 0x1f
    }

    pub fn hour(self) -> u32 {
        (self.0 >> 12) & 0x1f
    }

    pub fn minute(self) -> u32 {
        (self.0 >> 6) & 0x3f
    }

    pub fn second(self) -> u32 {
        self.0 & 0x3f
    }
}

impl fmt::Display for Datime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

/// Key header exactly as found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct KeyHeader {
    pub nbytes: i32,
    pub version: i16,
    pub obj_len: u32,
    pub datime: Datime,
    pub key_len: u16,
    pub cycle: u16,
    pub seek_key: u64,
    pub seek_pdir: u64,
    pub class_name: String,
    pub name: String,
    pub title: String,
}

/// Length-prefixed string; a leading 255 announces a 4-byte length.
pub fn tstring(i: &[u8]) -> IResult<&[u8], String> {
    let (i, short) = be_u8(i)?;
    let (i, len) = if short == 255 {
        be_u32(i)?
    } else {
        (i, short as u32)
    };
    let (i, raw) = take(len as usize)(i)?;
    let s = match raw.first() {
        None | Some(0) => String::new(),
        Some(_) => latin1(raw),
    };
    Ok((i, s))
}

fn uuid(i: &[u8]) -> IResult<&[u8], Uuid> {
    map(pair(be_u16, be_u128), |(_version, id)| Uuid::from_u128(id))(i)
}

/// Parse opening part of a root file
pub fn file_header(i: &[u8]) -> IResult<&[u8], FileHeader> {
    fn version_dep_int(i: &[u8], is_64_bit: bool) -> IResult<&[u8], u64> {
        if is_64_bit {
            be_u64(i)
        } else {
            let (i, end) = be_u32(i)?;
            Ok((i, end as u64))
        }
    }
    let (i, _) = tag("root")(i)?;
    let (i, version) = be_i32(i)?;
    let is_64_bit = version >= LARGE_FILE_VERSION;
    let (i, begin) = be_u32(i)?;
    let (i, end) = version_dep_int(i, is_64_bit)?;
    let (i, seek_free) = version_dep_int(i, is_64_bit)?;
    let (i, nbytes_free) = be_u32(i)?;
    let (i, nfree) = be_i32(i)?;
    let (i, nbytes_name) = be_u32(i)?;
    let (i, units) = be_u8(i)?;
    let (i, compression) = be_u32(i)?;
    let (i, seek_info) = version_dep_int(i, is_64_bit)?;
    let (i, nbytes_info) = be_u32(i)?;
    let (i, uuid) = opt(uuid)(i)?;
    Ok((
        i,
        FileHeader {
            version,
            begin,
            end,
            seek_free,
            nbytes_free,
            nfree,
            nbytes_name,
            units,
            compression,
            seek_info,
            nbytes_info,
            uuid,
        },
    ))
}

/// Parse a file-pointer based on the version of the record
fn versioned_pointer(input: &[u8], version: i32) -> IResult<&[u8], u64> {
    if version > 1000 {
        be_u64(input)
    } else {
        map(be_u32, |val| val as u64)(input)
    }
}

/// Directory header; every file has one for its top directory
pub fn directory_header(input: &[u8]) -> IResult<&[u8], DirectoryHeader> {
    let (input, version) = be_u16(input)?;
    let (input, c_time) = be_u32(input)?;
    let (input, m_time) = be_u32(input)?;
    let (input, nbytes_keys) = be_u32(input)?;
    let (input, nbytes_name) = be_u32(input)?;
    let (input, seek_dir) = versioned_pointer(input, version as i32)?;
    let (input, seek_parent) = versioned_pointer(input, version as i32)?;
    let (input, seek_keys) = versioned_pointer(input, version as i32)?;
    let (input, uuid) = if version % 1000 > 2 {
        opt(uuid)(input)?
    } else {
        (input, None)
    };
    Ok((
        input,
        DirectoryHeader {
            version,
            c_time: Datime(c_time),
            m_time: Datime(m_time),
            nbytes_keys,
            nbytes_name,
            seek_dir,
            seek_parent,
            seek_keys,
            uuid,
        },
    ))
}

/// Key header including its class name, name and title
pub fn tkey_header(input: &[u8]) -> IResult<&[u8], KeyHeader> {
    let (input, nbytes) = be_i32(input)?;
    let (input, version) = be_i16(input)?;
    let (input, obj_len) = be_u32(input)?;
    let (input, datime) = be_u32(input)?;
    let (input, key_len) = be_u16(input)?;
    let (input, cycle) = be_u16(input)?;
    let (input, seek_key) = versioned_pointer(input, version as i32)?;
    let (input, seek_pdir) = versioned_pointer(input, version as i32)?;
    let (input, class_name) = tstring(input)?;
    let (input, name) = tstring(input)?;
    let (input, title) = tstring(input)?;
    Ok((
        input,
        KeyHeader {
            nbytes,
            version,
            obj_len,
            datime: Datime(datime),
            key_len,
            cycle,
            seek_key,
            seek_pdir,
            class_name,
            name,
            title,
        },
    ))
}

/// Key list record of a directory: its own key header, a count, then the keys.
pub fn key_list(input: &[u8]) -> IResult<&[u8], Vec<KeyHeader>> {
    let (input, _own) = tkey_header(input)?;
    let (input, n) = be_i32(input)?;
    count(tkey_header, n.max(0) as usize)(input)
}
