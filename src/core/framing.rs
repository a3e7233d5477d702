//! Versioned record framing.
//!
//! Most records start with a 4-byte byte count (flagged by [`K_BYTE_COUNT_MASK`]) followed
//! by a 2-byte class version. Very old records carry the version alone.
use crate::core::cursor::ByteCursor;
use crate::core::error::{Result, RootError};
use crate::core::K_BYTE_COUNT_MASK;

/// Version header of one framed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTag {
    /// Bytes of the record that follow the version field, if the record is counted.
    pub byte_count: Option<u32>,
    pub version: u16,
    /// Cursor position right after the version field.
    pub header_end: usize,
}

impl VersionTag {
    /// Position of the first byte after the record, for counted records.
    pub fn expected_end(&self) -> Option<usize> {
        self.byte_count.map(|n| self.header_end + n as usize)
    }
}

/// Read a record's version header.
///
/// Without the byte-count flag the 4 bytes are rolled back and reread as the start of a
/// legacy, count-less header.
pub fn read_version(cursor: &mut ByteCursor) -> Result<VersionTag> {
    let raw = cursor.read_u32()?;
    let byte_count = if raw & K_BYTE_COUNT_MASK != 0 {
        let count = (raw & !K_BYTE_COUNT_MASK).checked_sub(2).ok_or_else(|| {
            RootError::format(format!("byte count {:#x} is shorter than a version", raw))
        })?;
        Some(count)
    } else {
        cursor.shift(-4)?;
        None
    };
    let version = cursor.read_u16()?;
    Ok(VersionTag {
        byte_count,
        version,
        header_end: cursor.pos(),
    })
}

/// Verify that the record described by `tag` was consumed exactly.
///
/// On a mismatch the cursor is moved to the declared end of the record before the
/// `FramingMismatch` is returned, so the caller may log it and keep reading. Records
/// without a byte count are trusted.
pub fn check_byte_count(cursor: &mut ByteCursor, tag: &VersionTag, context: &str) -> Result<()> {
    let end = match tag.expected_end() {
        Some(end) => end,
        None => return Ok(()),
    };
    if cursor.pos() == end {
        return Ok(());
    }
    let consumed = cursor.pos() as i64 - tag.header_end as i64;
    cursor.locate(end)?;
    Err(RootError::FramingMismatch {
        context: context.to_string(),
        expected: tag.byte_count.unwrap_or_default(),
        consumed,
    })
}

/// Jump to the declared end of a record without reading its body.
pub fn skip_record(cursor: &mut ByteCursor, tag: &VersionTag) -> Result<()> {
    match tag.expected_end() {
        Some(end) => cursor.locate(end),
        None => Err(RootError::format(format!(
            "cannot skip record at {} without a byte count",
            tag.header_end
        ))),
    }
}
