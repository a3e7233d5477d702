use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;
use std::path::PathBuf;

use bytes::Bytes;
#[cfg(not(target_arch = "wasm32"))]
use memmap::Mmap;
use tracing::debug;

use crate::core::error::{Result, RootError};

/// The source from where the Root file is read. Construct it using
/// `.into()` on a `Path`, a byte vector or a static slice, or map a file
/// with [`Source::mmap`]. Paths are not available for the `wasm32` target.
#[derive(Debug, Clone)]
pub struct Source(SourceInner);

#[derive(Debug, Clone)]
enum SourceInner {
    /// A local source, i.e. a file on disc.
    Local(PathBuf),
    /// An in-memory region of data
    InMem(Bytes),
    /// A memory-mapped file; the `Bytes` own the mapping
    #[cfg(not(target_arch = "wasm32"))]
    Mapped(Bytes),
}

impl Source {
    pub fn new<T: Into<Self>>(thing: T) -> Self {
        thing.into()
    }

    /// Map the file at `path` into memory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn mmap<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // the mapping is read-only and the file is not modified while we hold it
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self(SourceInner::Mapped(Bytes::from_owner(map))))
    }

    /// Total number of bytes available.
    pub fn len(&self) -> Result<u64> {
        Ok(match &self.0 {
            SourceInner::Local(path) => std::fs::metadata(path)?.len(),
            SourceInner::InMem(data) => data.len() as u64,
            #[cfg(not(target_arch = "wasm32"))]
            SourceInner::Mapped(map) => map.len() as u64,
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Fetch `len` bytes starting at `start`. Reads past the end of the source fail.
    pub fn fetch(&self, start: u64, len: u64) -> Result<Bytes> {
        debug!(start, len, "fetching");
        match &self.0 {
            SourceInner::Local(path) => {
                let mut f = File::open(path)?;
                let total = f.metadata()?.len();
                let (start, end) = checked_range(start, len, total as usize)?;
                f.seek(SeekFrom::Start(start as u64))?;
                let mut buf = vec![0; end - start];
                f.read_exact(&mut buf)?;
                Ok(buf.into())
            }
            SourceInner::InMem(data) => {
                let (start, end) = checked_range(start, len, data.len())?;
                Ok(data.slice(start..end))
            }
            #[cfg(not(target_arch = "wasm32"))]
            SourceInner::Mapped(map) => {
                let (start, end) = checked_range(start, len, map.len())?;
                Ok(map.slice(start..end))
            }
        }
    }
}

fn checked_range(start: u64, len: u64, total: usize) -> Result<(usize, usize)> {
    let end = start.checked_add(len).filter(|end| *end <= total as u64);
    match end {
        Some(end) => Ok((start as usize, end as usize)),
        None => Err(RootError::Truncated {
            offset: start as usize,
            need: len as usize,
            len: total,
        }),
    }
}

// Disallow the construction of a local source object on wasm since
// wasm does not have a (proper) file system.
#[cfg(not(target_arch = "wasm32"))]
impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        path.to_path_buf().into()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<PathBuf> for Source {
    fn from(path_buf: PathBuf) -> Self {
        Self(SourceInner::Local(path_buf))
    }
}

impl From<Bytes> for Source {
    fn from(buf: Bytes) -> Self {
        Self(SourceInner::InMem(buf))
    }
}

impl From<Vec<u8>> for Source {
    fn from(buf: Vec<u8>) -> Self {
        Self(SourceInner::InMem(buf.into()))
    }
}

// allow construction from slices
impl From<&'static [u8]> for Source {
    fn from(buf: &'static [u8]) -> Self {
        Self(SourceInner::InMem(Bytes::from_static(buf)))
    }
}
