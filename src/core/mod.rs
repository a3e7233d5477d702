//! Byte-level building blocks and the file index.
pub mod compression;
pub mod cursor;
pub mod data_source;
pub mod directory;
pub mod error;
pub mod file;
pub mod framing;
pub mod header;
pub mod key;
pub mod options;
pub mod refs;
pub mod value;

pub use self::compression::{decompress, ENVELOPE_HEADER_SIZE};
pub use self::cursor::ByteCursor;
pub use self::data_source::Source;
pub use self::directory::Directory;
pub use self::error::{Result, RootError};
pub use self::file::{FileObject, RootFile};
pub use self::framing::{check_byte_count, read_version, skip_record, VersionTag};
pub use self::header::{Datime, DirectoryHeader, FileHeader, FILE_HEADER_SIZE};
pub use self::key::Key;
pub use self::options::OpenOptions;
pub use self::refs::{ClassRef, MappedObject, ReferenceTable};
pub use self::value::{Array, DecodedObject, ObjRef, Object, ObjectGraph, ScalarKind, Value};

/// Flag marking the first word of a record as a byte count
pub const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// Flag marking a tag as a class reference
pub const K_CLASS_MASK: u32 = 0x8000_0000;
/// Tag announcing a class name written in full
pub const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
/// Offset between a record's position and its reference tag
pub const MAP_OFFSET: u32 = 2;
