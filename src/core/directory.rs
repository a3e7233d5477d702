use tracing::debug;

use crate::core::data_source::Source;
use crate::core::error::Result;
use crate::core::header::{directory_header, key_list, Datime, DirectoryHeader};
use crate::core::key::Key;

/// A directory of a file together with its keys.
///
/// The top directory has an empty `path`; sub-directories carry their full path from
/// the top, separated by `/`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Directory {
    pub path: String,
    pub cycle: u16,
    pub title: String,
    pub header: DirectoryHeader,
    pub keys: Vec<Key>,
}

impl Directory {
    /// Read a sub-directory from the payload of its key, then its key list.
    pub(crate) fn from_key(
        path: &str,
        key: &Key,
        source: &Source,
        max_object_len: u64,
    ) -> Result<Self> {
        let buf = key.read_buffer(source, max_object_len)?;
        let (_, header) = directory_header(&buf)?;
        let keys = read_keys(source, header.seek_keys, header.nbytes_keys)?;
        debug!(path, keys = keys.len(), "loaded directory");
        Ok(Directory {
            path: path.to_string(),
            cycle: key.cycle,
            title: key.title.clone(),
            header,
            keys,
        })
    }

    /// Key with the given name and cycle; the name may be the canonical or the
    /// original (quoted) one.
    pub fn find_key(&self, name: &str, cycle: u16) -> Option<&Key> {
        self.keys.iter().find(|k| {
            k.cycle == cycle && (k.name == name || k.real_name.as_deref() == Some(name))
        })
    }

    pub fn seek_dir(&self) -> u64 {
        self.header.seek_dir
    }

    pub fn seek_parent(&self) -> u64 {
        self.header.seek_parent
    }

    pub fn seek_keys(&self) -> u64 {
        self.header.seek_keys
    }

    pub fn nbytes_keys(&self) -> u32 {
        self.header.nbytes_keys
    }

    pub fn nbytes_name(&self) -> u32 {
        self.header.nbytes_name
    }

    pub fn c_time(&self) -> Datime {
        self.header.c_time
    }

    pub fn m_time(&self) -> Datime {
        self.header.m_time
    }
}

/// Key list record at `seek_keys`; a directory without one has no keys.
pub(crate) fn read_keys(source: &Source, seek_keys: u64, nbytes_keys: u32) -> Result<Vec<Key>> {
    if seek_keys == 0 {
        return Ok(Vec::new());
    }
    let buf = source.fetch(seek_keys, nbytes_keys as u64)?;
    let (_, headers) = key_list(&buf)?;
    debug!(seek_keys, n = headers.len(), "read key list");
    Ok(headers.into_iter().map(Key::from).collect())
}
