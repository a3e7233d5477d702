use std::io;

use failure::Fail;

/// Everything that can go wrong while opening a file or decoding one of its objects.
///
/// `FramingMismatch`, `UnresolvedClass` and `UnsupportedMember` are normally recovered
/// inside a decode and end up in [`DecodedObject::issues`](crate::DecodedObject::issues);
/// the remaining variants abort the read that raised them.
#[derive(Debug, Fail)]
pub enum RootError {
    /// Bad magic, corrupt header or an unsupported legacy layout.
    #[fail(display = "format error: {}", _0)]
    Format(String),

    /// A framed record did not consume exactly the bytes it declared.
    #[fail(
        display = "byte count mismatch in {}: expected {} bytes, consumed {}",
        context, expected, consumed
    )]
    FramingMismatch {
        context: String,
        expected: u32,
        consumed: i64,
    },

    /// Neither a hardcoded routine nor a streamer info exists for the class.
    #[fail(display = "no streamer found for class `{}`", _0)]
    UnresolvedClass(String),

    /// A class or object backreference points to a tag never registered in this buffer.
    #[fail(display = "{} reference tag {} not found", kind, tag)]
    UnresolvedReference { kind: &'static str, tag: u32 },

    /// A schema element whose type code or container shape cannot be decoded.
    #[fail(
        display = "cannot stream member `{}` of type `{}` (type code {})",
        member, type_name, type_code
    )]
    UnsupportedMember {
        member: String,
        type_name: String,
        type_code: i32,
    },

    /// The decompressed payload differs from the length declared by the key.
    #[fail(
        display = "decompressed {} bytes but the key declares {}",
        actual, expected
    )]
    SizeMismatch { expected: usize, actual: usize },

    /// A read would run past the end of the buffer.
    #[fail(
        display = "reading {} bytes at offset {} overruns buffer of {} bytes",
        need, offset, len
    )]
    Truncated {
        offset: usize,
        need: usize,
        len: usize,
    },

    #[fail(display = "decompression failed: {}", _0)]
    Decompress(String),

    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for RootError {
    fn from(err: io::Error) -> Self {
        RootError::Io(err)
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for RootError {
    fn from(err: nom::Err<E>) -> Self {
        RootError::Format(format!("header parser failed: {:?}", err))
    }
}

impl RootError {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Self {
        RootError::Format(msg.into())
    }

    /// Errors that only invalidate the member being read, not the enclosing record.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RootError::FramingMismatch { .. }
                | RootError::UnresolvedClass(_)
                | RootError::UnsupportedMember { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RootError>;
