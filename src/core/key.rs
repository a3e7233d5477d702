use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;
use regex::Regex;
use tracing::debug;

use crate::core::compression::decompress;
use crate::core::data_source::Source;
use crate::core::error::{Result, RootError};
use crate::core::header::{Datime, KeyHeader};

fn quotes() -> &'static Regex {
    static QUOTES: OnceLock<Regex> = OnceLock::new();
    QUOTES.get_or_init(|| Regex::new(r#"['"]"#).expect("static regex"))
}

/// Named and versioned entry of a directory, pointing at one object payload.
///
/// Keys are identified by `(name, cycle)` within their directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    /// Name with any quote characters removed
    pub name: String,
    /// Name as written, when it differed from `name`
    pub real_name: Option<String>,
    pub class_name: String,
    pub title: String,
    pub cycle: u16,
    pub version: i16,
    pub datime: Datime,
    pub seek_key: u64,
    pub seek_pdir: u64,
    pub key_len: u16,
    /// Bytes of key header plus (possibly compressed) payload
    pub nbytes: i32,
    /// Uncompressed payload length
    pub obj_len: u32,
}

impl From<KeyHeader> for Key {
    fn from(hdr: KeyHeader) -> Self {
        let name = quotes().replace_all(&hdr.name, "").into_owned();
        let real_name = if name != hdr.name {
            Some(hdr.name)
        } else {
            None
        };
        Key {
            name,
            real_name,
            class_name: hdr.class_name,
            title: hdr.title,
            cycle: hdr.cycle,
            version: hdr.version,
            datime: hdr.datime,
            seek_key: hdr.seek_key,
            seek_pdir: hdr.seek_pdir,
            key_len: hdr.key_len,
            nbytes: hdr.nbytes,
            obj_len: hdr.obj_len,
        }
    }
}

impl Key {
    pub fn is_directory(&self) -> bool {
        self.class_name == "TDirectory" || self.class_name == "TDirectoryFile"
    }

    /// Number of payload bytes stored after the key header.
    pub fn stored_len(&self) -> Result<u64> {
        (self.nbytes as i64)
            .checked_sub(self.key_len as i64)
            .filter(|n| *n >= 0)
            .map(|n| n as u64)
            .ok_or_else(|| {
                RootError::format(format!(
                    "key `{}` declares {} bytes but a {} byte header",
                    self.name, self.nbytes, self.key_len
                ))
            })
    }

    pub fn is_compressed(&self) -> Result<bool> {
        Ok(self.obj_len as u64 > self.stored_len()?)
    }

    /// Fetch the payload of this key and inflate it if needed.
    pub(crate) fn read_buffer(&self, source: &Source, max_object_len: u64) -> Result<Bytes> {
        if self.obj_len as u64 > max_object_len {
            return Err(RootError::format(format!(
                "key `{}` declares {} bytes, above the limit of {}",
                self.name, self.obj_len, max_object_len
            )));
        }
        let stored = self.stored_len()?;
        let raw = source.fetch(self.seek_key + self.key_len as u64, stored)?;
        if self.obj_len as u64 > stored {
            debug!(
                key = %self.name,
                stored,
                obj_len = self.obj_len,
                "decompressing key buffer"
            );
            Ok(decompress(&raw, self.obj_len as usize)?.into())
        } else {
            Ok(raw)
        }
    }

    /// Information about this key in human readable form
    pub fn verbose_info(&self) -> String {
        format!("{:#?}", self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{};{}` of type `{}` ({} bytes, written {})",
            self.name, self.cycle, self.class_name, self.obj_len, self.datime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::zl_envelope;

    fn key(name: &str, nbytes: i32, obj_len: u32) -> Key {
        Key::from(KeyHeader {
            nbytes,
            version: 4,
            obj_len,
            datime: Datime(0),
            key_len: 10,
            cycle: 1,
            seek_key: 0,
            seek_pdir: 0,
            class_name: "TObjString".into(),
            name: name.into(),
            title: String::new(),
        })
    }

    #[test]
    fn quotes_are_stripped_from_names() {
        let k = key("\"weird'name\"", 20, 10);
        assert_eq!(k.name, "weirdname");
        assert_eq!(k.real_name.as_deref(), Some("\"weird'name\""));
        assert_eq!(key("plain", 20, 10).real_name, None);
    }

    #[test]
    fn uncompressed_buffer_is_returned_as_is() {
        let mut data = vec![0u8; 10];
        data.extend_from_slice(b"0123456789");
        let k = key("a", 20, 10);
        assert!(!k.is_compressed().unwrap());
        let buf = k.read_buffer(&Source::new(data), 1 << 20).unwrap();
        assert_eq!(&buf[..], b"0123456789");
    }

    #[test]
    fn compressed_buffer_is_inflated() {
        let payload: Vec<u8> = (0..400u32).map(|i| (i % 5) as u8).collect();
        let packed = zl_envelope(&payload);
        let mut data = vec![0u8; 10];
        data.extend_from_slice(&packed);
        let k = key("a", 10 + packed.len() as i32, payload.len() as u32);
        assert!(k.is_compressed().unwrap());
        let buf = k.read_buffer(&Source::new(data), 1 << 20).unwrap();
        assert_eq!(&buf[..], &payload[..]);
    }

    #[test]
    fn oversized_objects_are_refused() {
        let k = key("big", 20, 5000);
        assert!(matches!(
            k.read_buffer(&Source::new(vec![0u8; 20]), 1000),
            Err(RootError::Format(_))
        ));
    }

    #[test]
    fn header_larger_than_record_is_rejected() {
        assert!(key("bad", 5, 0).stored_len().is_err());
    }
}
