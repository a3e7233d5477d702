//! # rootreader
//! Reader for ROOT object files: the file index (keys, directories, streamer infos)
//! and a schema-driven decoder that rebuilds object graphs from framed buffers.
//!
//! Classes needed to read the schemas themselves have built-in routines; everything
//! else is decoded from the `TStreamerInfo` records stored in the same file.
//!
//! ```no_run
//! use rootreader::{FileObject, RootFile};
//!
//! let mut file = RootFile::new(std::path::Path::new("hsimple.root")).unwrap();
//! for key in file.keys() {
//!     println!("{}", key);
//! }
//! if let Some(FileObject::Object(obj)) = file.read_object("hpx", None).unwrap() {
//!     println!("{}", obj);
//! }
//! ```
#![allow(clippy::cognitive_complexity)]
#[macro_use]
extern crate bitflags;

pub mod core;
pub mod streamer;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

pub use crate::core::{
    DecodedObject, Directory, FileObject, Key, Object, OpenOptions, RootError, RootFile, Source,
    Value,
};
pub use crate::streamer::{reconstruct_object, StreamerRegistry, UserStreamer};
