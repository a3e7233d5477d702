use bytes::Bytes;
use nom::IResult;

use crate::core::error::{Result, RootError};
use crate::core::value::{Array, ScalarKind, Value};

// helper macro for reading type T in big endian at the cursor position
macro_rules! read_be {
    ($self:ident, $type:ident) => {{
        const N: usize = std::mem::size_of::<$type>();
        let at = $self.take(N)?;
        let mut raw = [0u8; N];
        raw.copy_from_slice(&$self.data[at..at + N]);
        Ok($type::from_be_bytes(raw))
    }};
}

/// Positional big-endian reader over one buffer of a ROOT file.
///
/// Every read checks its span first: a read that would run past the end fails with
/// [`RootError::Truncated`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Cursor over a binary view, starting at offset 0.
    pub fn new<B: Into<Bytes>>(data: B) -> Self {
        Self::at(data, 0)
    }

    /// Cursor over a binary view, starting at `pos`.
    pub fn at<B: Into<Bytes>>(data: B, pos: usize) -> Self {
        ByteCursor {
            data: data.into(),
            pos,
        }
    }

    /// Cursor over the compact textual encoding, where each char carries one byte in
    /// its low 8 bits.
    pub fn from_latin1(text: &str) -> Self {
        let data: Vec<u8> = text.chars().map(|c| (c as u32 & 0xff) as u8).collect();
        Self::new(data)
    }

    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute position; the end of the buffer is a valid position.
    pub fn locate(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RootError::Truncated {
                offset: pos,
                need: 0,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Move relative to the current position.
    pub fn shift(&mut self, delta: isize) -> Result<()> {
        let target = if delta < 0 {
            self.pos.checked_sub(delta.unsigned_abs())
        } else {
            self.pos.checked_add(delta as usize)
        };
        match target {
            Some(pos) => self.locate(pos),
            None => Err(RootError::Truncated {
                offset: self.pos,
                need: delta.unsigned_abs(),
                len: self.data.len(),
            }),
        }
    }

    /// Zero-copy view of `len` bytes at `off`, or `None` if the range is out of bounds.
    pub fn extract(&self, off: usize, len: usize) -> Option<Bytes> {
        let end = off.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        Some(self.data.slice(off..end))
    }

    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.data.get(pos).copied()
    }

    // Reserve `n` bytes, returning the start of the reserved span.
    fn take(&mut self, n: usize) -> Result<usize> {
        self.ensure(n)?;
        let at = self.pos;
        self.pos += n;
        Ok(at)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(RootError::Truncated {
                offset: self.pos,
                need: n,
                len: self.data.len(),
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        read_be!(self, u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        read_be!(self, u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        read_be!(self, u32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        read_be!(self, u64)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        read_be!(self, i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        read_be!(self, i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        read_be!(self, i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        read_be!(self, i64)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        read_be!(self, f32)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        read_be!(self, f64)
    }

    /// Next `n` bytes as a zero-copy view.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        let at = self.take(n)?;
        Ok(self.data.slice(at..at + n))
    }

    /// Zero-terminated string; stops at the end of the buffer if no terminator follows.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos;
        let rest = &self.data[start..];
        let (len, consumed) = match rest.iter().position(|b| *b == 0) {
            Some(nul) => (nul, nul + 1),
            None => (rest.len(), rest.len()),
        };
        let s = latin1(&rest[..len]);
        self.pos += consumed;
        Ok(s)
    }

    /// Length-prefixed string (`TString` layout): one length byte, or 255 followed by
    /// a 4-byte length.
    pub fn read_tstring(&mut self) -> Result<String> {
        let mut len = self.read_u8()? as usize;
        if len == 255 {
            len = self.read_u32()? as usize;
        }
        if len == 0 {
            return Ok(String::new());
        }
        let at = self.take(len)?;
        let raw = &self.data[at..at + len];
        if raw[0] == 0 {
            return Ok(String::new());
        }
        Ok(latin1(raw))
    }

    /// A single primitive, widened into a [`Value`].
    pub fn read_scalar(&mut self, kind: ScalarKind) -> Result<Value> {
        Ok(match kind {
            ScalarKind::Bool => Value::Bool(self.read_u8()? != 0),
            ScalarKind::I8 => Value::Int(self.read_i8()? as i64),
            ScalarKind::U8 => Value::UInt(self.read_u8()? as u64),
            ScalarKind::I16 => Value::Int(self.read_i16()? as i64),
            ScalarKind::U16 => Value::UInt(self.read_u16()? as u64),
            ScalarKind::I32 => Value::Int(self.read_i32()? as i64),
            ScalarKind::U32 => Value::UInt(self.read_u32()? as u64),
            ScalarKind::I64 => Value::Int(self.read_i64()?),
            ScalarKind::U64 => Value::UInt(self.read_u64()?),
            ScalarKind::F32 => Value::Float(self.read_f32()? as f64),
            ScalarKind::F64 => Value::Float(self.read_f64()?),
        })
    }

    /// `n` back-to-back primitives. The whole span is checked before anything is
    /// allocated, so a corrupt count fails fast.
    pub fn read_fast_array(&mut self, n: usize, kind: ScalarKind) -> Result<Array> {
        let span = n.checked_mul(kind.width()).ok_or(RootError::Truncated {
            offset: self.pos,
            need: usize::MAX,
            len: self.data.len(),
        })?;
        self.ensure(span)?;
        macro_rules! collect {
            ($cur:ident, $variant:ident, $read:ident) => {{
                let mut out = Vec::with_capacity(n);
                for _ in 0..n {
                    out.push($cur.$read()?);
                }
                Array::$variant(out)
            }};
        }
        Ok(match kind {
            ScalarKind::Bool => {
                let raw = self.read_bytes(n)?;
                Array::Bool(raw.iter().map(|b| *b != 0).collect())
            }
            ScalarKind::I8 => collect!(self, I8, read_i8),
            ScalarKind::U8 => Array::U8(self.read_bytes(n)?.to_vec()),
            ScalarKind::I16 => collect!(self, I16, read_i16),
            ScalarKind::U16 => collect!(self, U16, read_u16),
            ScalarKind::I32 => collect!(self, I32, read_i32),
            ScalarKind::U32 => collect!(self, U32, read_u32),
            ScalarKind::I64 => collect!(self, I64, read_i64),
            ScalarKind::U64 => collect!(self, U64, read_u64),
            ScalarKind::F32 => collect!(self, F32, read_f32),
            ScalarKind::F64 => collect!(self, F64, read_f64),
        })
    }

    /// `n` length-prefixed strings.
    pub fn read_tstring_array(&mut self, n: usize) -> Result<Array> {
        let mut out = Vec::new();
        for _ in 0..n {
            out.push(self.read_tstring()?);
        }
        Ok(Array::Str(out))
    }

    /// Run a `nom` parser on the remaining bytes and advance past what it consumed.
    pub fn parse_with<T, F>(&mut self, parser: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> IResult<&[u8], T>,
    {
        let rest = &self.data[self.pos..];
        let (tail, value) = parser(rest)?;
        self.pos += rest.len() - tail.len();
        Ok(value)
    }
}

/// Bytes to string, one char per byte.
pub(crate) fn latin1(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_owned(),
        Err(_) => raw.iter().map(|b| *b as char).collect(),
    }
}
