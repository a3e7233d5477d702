use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::data_source::Source;
use crate::core::directory::{read_keys, Directory};
use crate::core::error::{Result, RootError};
use crate::core::header::{directory_header, file_header, tkey_header, FileHeader, FILE_HEADER_SIZE};
use crate::core::key::Key;
use crate::core::options::OpenOptions;
use crate::core::value::DecodedObject;
use crate::streamer::buffer::DecodeBuffer;
use crate::streamer::info::{StreamerInfo, StreamerRegistry, UserStreamer};

/// Bytes read for the top directory record when its name is short.
const TOP_DIRECTORY_MIN_READ: u64 = 300;

/// `RootFile` wraps the most basic information of a ROOT file: its header, the keys of
/// its top directory and the schemas needed to decode the objects behind them.
#[derive(Debug)]
pub struct RootFile {
    source: Source,
    options: OpenOptions,
    header: FileHeader,
    root: Directory,
    directories: Vec<Directory>,
    streamers: StreamerRegistry,
}

/// What a path inside a file resolves to.
#[derive(Debug)]
pub enum FileObject {
    Directory(Directory),
    Object(DecodedObject),
}

/// Decode the payload of `key` as one object of the key's class.
fn decode_key(
    source: &Source,
    options: &OpenOptions,
    key: &Key,
    streamers: &mut StreamerRegistry,
) -> Result<DecodedObject> {
    debug!(key = %key, "decoding key");
    let data = key.read_buffer(source, options.max_object_len)?;
    DecodeBuffer::new(data, key.key_len as u32, streamers, options).read_top(&key.class_name)
}

/// Split a `name;cycle` path into the name, without leading slashes, and the cycle.
fn split_cycle(path: &str, cycle: Option<u16>) -> (&str, u16) {
    let path = path.trim_start_matches('/');
    if let Some(pos) = path.rfind(';') {
        if let Ok(n) = path[pos + 1..].parse::<u16>() {
            return (&path[..pos], n);
        }
    }
    (path, cycle.unwrap_or(1))
}

impl RootFile {
    /// Open a file with the default [`OpenOptions`].
    pub fn new<S: Into<Source>>(source: S) -> Result<Self> {
        Self::with_options(source, OpenOptions::default())
    }

    pub fn with_options<S: Into<Source>>(source: S, options: OpenOptions) -> Result<Self> {
        let source = source.into();
        let total = source.len()?;
        let buf = source.fetch(0, FILE_HEADER_SIZE.min(total))?;
        let (_, header) = file_header(&buf)
            .map_err(|_| RootError::format("failed to parse file header; not a ROOT file?"))?;
        debug!(version = header.version, begin = header.begin, "opened file");

        let mut file = RootFile {
            source,
            options,
            header,
            root: Directory::default(),
            directories: Vec::new(),
            streamers: StreamerRegistry::default(),
        };
        if file.header.is_empty() {
            debug!("no streamer-info record; file is empty");
            return Ok(file);
        }
        file.root = file.read_top_directory(total)?;
        file.read_streamer_infos()?;
        Ok(file)
    }

    fn read_top_directory(&self, total: u64) -> Result<Directory> {
        let nbytes_name = self.header.nbytes_name;
        if !(10..=10000).contains(&nbytes_name) {
            return Err(RootError::format(format!(
                "implausible name length {} of the top directory",
                nbytes_name
            )));
        }
        let begin = self.header.begin as u64;
        let mut want = nbytes_name as u64 + 48;
        if self.header.version >= 40000 {
            want += 12;
        }
        let len = want
            .max(TOP_DIRECTORY_MIN_READ)
            .min(total.saturating_sub(begin));
        let buf = self.source.fetch(begin, len)?;
        let (_, key) = tkey_header(&buf)?;
        let dir_buf = buf.get(nbytes_name as usize..).ok_or(RootError::Truncated {
            offset: nbytes_name as usize,
            need: 0,
            len: buf.len(),
        })?;
        let (_, header) = directory_header(dir_buf)?;
        let keys = read_keys(&self.source, header.seek_keys, header.nbytes_keys)?;
        debug!(keys = keys.len(), title = %key.title, "read top directory");
        Ok(Directory {
            path: String::new(),
            cycle: key.cycle,
            title: key.title,
            header,
            keys,
        })
    }

    /// Read the streamer-info key, append it to the top keys and decode its list.
    fn read_streamer_infos(&mut self) -> Result<()> {
        let buf = self
            .source
            .fetch(self.header.seek_info, self.header.nbytes_info as u64)?;
        let (_, hdr) = tkey_header(&buf)?;
        let key = Key::from(hdr);
        self.root.keys.push(key.clone());
        if !self.options.read_streamer_infos {
            return Ok(());
        }
        // the list itself only needs the built-in routines
        let mut bootstrap = StreamerRegistry::default();
        let list = decode_key(&self.source, &self.options, &key, &mut bootstrap)?;
        for issue in list.issues() {
            warn!(error = %issue, "problem while reading the streamer-info list");
        }
        self.streamers.set_list(list);
        debug!(n = self.streamers.len(), "loaded streamer infos");
        Ok(())
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Keys of the top directory, including the streamer-info key
    pub fn keys(&self) -> &[Key] {
        &self.root.keys
    }

    pub fn root_directory(&self) -> &Directory {
        &self.root
    }

    /// Sub-directories loaded so far
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    /// Read the object or directory at `path`.
    ///
    /// A `;N` suffix of the path overrides `cycle`; without either, cycle 1 is read.
    /// `Ok(None)` means nothing exists at that path.
    pub fn read_object(&mut self, path: &str, cycle: Option<u16>) -> Result<Option<FileObject>> {
        let (name, cycle) = split_cycle(path, cycle);
        if let Some(key) = self.root.find_key(name, cycle).cloned() {
            return self.read_key("", &key).map(Some);
        }
        let mut split = name.rfind('/');
        while let Some(pos) = split.filter(|p| *p > 0) {
            let (dir_name, sub_name) = (&name[..pos], &name[pos + 1..]);
            match self.load_directory(dir_name) {
                Ok(Some(idx)) => {
                    let key = self.directories[idx].find_key(sub_name, cycle).cloned();
                    return match key {
                        Some(key) => self.read_key(dir_name, &key).map(Some),
                        None => Ok(None),
                    };
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(directory = dir_name, error = %err, "cannot load directory");
                }
            }
            split = name[..pos].rfind('/');
        }
        Ok(None)
    }

    /// Like [`read_object`](Self::read_object), for paths naming a directory.
    pub fn read_directory(&mut self, path: &str, cycle: Option<u16>) -> Result<Option<Directory>> {
        Ok(match self.read_object(path, cycle)? {
            Some(FileObject::Directory(dir)) => Some(dir),
            _ => None,
        })
    }

    fn read_key(&mut self, dir_path: &str, key: &Key) -> Result<FileObject> {
        if key.is_directory() {
            let path = if dir_path.is_empty() {
                key.name.clone()
            } else {
                format!("{}/{}", dir_path, key.name)
            };
            let idx = match self.directories.iter().position(|d| d.path == path) {
                Some(idx) => idx,
                None => self.push_directory(&path, key)?,
            };
            return Ok(FileObject::Directory(self.directories[idx].clone()));
        }
        let obj = decode_key(&self.source, &self.options, key, &mut self.streamers)?;
        Ok(FileObject::Object(obj))
    }

    fn push_directory(&mut self, path: &str, key: &Key) -> Result<usize> {
        let dir = Directory::from_key(path, key, &self.source, self.options.max_object_len)?;
        self.directories.push(dir);
        Ok(self.directories.len() - 1)
    }

    /// Index of the loaded directory at `path`, loading it and its parents on demand.
    fn load_directory(&mut self, path: &str) -> Result<Option<usize>> {
        if let Some(idx) = self.directories.iter().position(|d| d.path == path) {
            return Ok(Some(idx));
        }
        let (parent, name) = match path.rfind('/') {
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => ("", path),
        };
        let key = if parent.is_empty() {
            self.root.find_key(name, 1).cloned()
        } else {
            match self.load_directory(parent)? {
                Some(idx) => self.directories[idx].find_key(name, 1).cloned(),
                None => None,
            }
        };
        match key {
            Some(key) if key.is_directory() => self.push_directory(path, &key).map(Some),
            _ => Ok(None),
        }
    }

    /// Read data members of type `type_name` with `f` in every later decode.
    pub fn add_user_streamer(&mut self, type_name: &str, f: UserStreamer) {
        self.streamers.add_user_streamer(type_name, f);
    }

    /// Schema of `class_name`, translated from the streamer-info list on first use.
    pub fn streamer(&mut self, class_name: &str) -> Option<Rc<StreamerInfo>> {
        self.streamers.get(class_name)
    }

    /// Every schema stored in this file
    pub fn streamer_infos(&self) -> Vec<StreamerInfo> {
        self.streamers.all()
    }

    /// The decoded streamer-info list, unless it was not loaded.
    pub fn streamer_list(&self) -> Option<&DecodedObject> {
        self.streamers.list()
    }

    /// Translate the streamer info of this file to a YAML file
    pub fn streamer_info_as_yaml<W: fmt::Write>(&self, s: &mut W) -> fmt::Result {
        for el in &self.streamer_infos() {
            writeln!(s, "{}", el.to_yaml())?;
        }
        Ok(())
    }
}
