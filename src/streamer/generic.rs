//! Schema-driven streaming of classes described by a `TStreamerInfo`.
use std::sync::OnceLock;

use regex::Regex;

use crate::core::cursor::latin1;
use crate::core::error::{Result, RootError};
use crate::core::framing::skip_record;
use crate::core::value::{Array, Object, ScalarKind, Value};
use crate::streamer::buffer::DecodeBuffer;
use crate::streamer::info::{StreamerElement, StreamerInfo};
use crate::streamer::type_code::*;

/// Mantissa bits of a `Float16_t` written without a range.
const FLOAT16_MANTISSA_BITS: u32 = 12;

fn vector_of_primitive() -> &'static Regex {
    static VECTOR: OnceLock<Regex> = OnceLock::new();
    VECTOR.get_or_init(|| {
        Regex::new(
            r"^vector<\s*(bool|Bool_t|char|Char_t|unsigned char|UChar_t|short|Short_t|unsigned short|UShort_t|int|Int_t|unsigned int|UInt_t|long|Long_t|unsigned long|ULong_t|long long|Long64_t|unsigned long long|ULong64_t|float|Float_t|Double32_t|double|Double_t)\s*>$",
        )
        .expect("static regex")
    })
}

/// Element kind of a `vector<prim>` type name, in any of the ROOT spellings.
fn vector_kind(type_name: &str) -> Option<ScalarKind> {
    let caps = vector_of_primitive().captures(type_name)?;
    Some(match &caps[1] {
        "bool" | "Bool_t" => ScalarKind::Bool,
        "char" | "Char_t" => ScalarKind::I8,
        "unsigned char" | "UChar_t" => ScalarKind::U8,
        "short" | "Short_t" => ScalarKind::I16,
        "unsigned short" | "UShort_t" => ScalarKind::U16,
        "int" | "Int_t" => ScalarKind::I32,
        "unsigned int" | "UInt_t" => ScalarKind::U32,
        "long" | "Long_t" | "long long" | "Long64_t" => ScalarKind::I64,
        "unsigned long" | "ULong_t" | "unsigned long long" | "ULong64_t" => ScalarKind::U64,
        "float" | "Float_t" | "Double32_t" => ScalarKind::F32,
        _ => ScalarKind::F64,
    })
}

fn unsupported(member: &StreamerElement) -> RootError {
    RootError::UnsupportedMember {
        member: member.name.clone(),
        type_name: member.type_name.clone(),
        type_code: member.type_code,
    }
}

/// Errors of a single member after which the rest of the record cannot be trusted.
fn abandons_record(err: &RootError) -> bool {
    matches!(
        err,
        RootError::UnresolvedReference { .. }
            | RootError::Truncated { .. }
            | RootError::UnsupportedMember { .. }
    )
}

impl<'r> DecodeBuffer<'r> {
    pub(crate) fn read_generic(&mut self, obj: &mut Object, info: &StreamerInfo) -> Result<()> {
        let ver = self.read_version()?;
        for base in &info.base_classes {
            match tarray_kind(&base.name) {
                Some(kind) => {
                    let arr = self.read_tarray(kind)?;
                    obj.set("fArray", arr);
                }
                None => {
                    self.class_streamer(obj, &base.name)?;
                }
            }
        }
        for member in &info.members {
            match self.read_member(obj, member) {
                Ok(()) => {}
                Err(err) if abandons_record(&err) && ver.byte_count.is_some() && !self.strict => {
                    self.recover(err);
                    skip_record(&mut self.cursor, &ver)?;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
        self.check(&ver, &info.class_name)?;
        Ok(())
    }

    fn read_tarray(&mut self, kind: ScalarKind) -> Result<Value> {
        let n = self.cursor.read_u32()? as usize;
        Ok(Value::Array(self.cursor.read_fast_array(n, kind)?))
    }

    /// Decode one data member and store it under its name.
    ///
    /// A user streamer registered for the member's type name takes over the member.
    fn read_member(&mut self, obj: &mut Object, member: &StreamerElement) -> Result<()> {
        if let Some(user) = self.streamers.user_streamer(&member.type_name) {
            return user(self, obj, &member.name);
        }
        let code = member.type_code;
        let value = match code {
            K_BASE | K_OFFSET_L | K_OFFSET_P => return Ok(()),
            K_CHAR_STAR => {
                let len = self.cursor.read_i32()?.max(0) as usize;
                let raw = self.cursor.read_bytes(len)?;
                Value::Str(latin1(&raw))
            }
            K_FLOAT16 => Value::Float(self.read_float16()? as f64),
            c if c == K_OFFSET_L + K_FLOAT16 => {
                let mut values = Vec::new();
                for _ in 0..member.length.max(0) {
                    values.push(Value::Float(self.read_float16()? as f64));
                }
                Value::List(values)
            }
            K_TSTRING | K_STL_STRING => Value::Str(self.cursor.read_tstring()?),
            K_TOBJECT => {
                self.class_streamer(obj, "TObject")?;
                return Ok(());
            }
            K_TNAMED => {
                self.class_streamer(obj, "TNamed")?;
                return Ok(());
            }
            K_OBJECT | K_ANY | K_OBJECT_PTR | K_ANY_PTR => {
                let class_name = member.type_name.trim_end_matches('*').trim();
                match tarray_kind(class_name) {
                    Some(kind) => self.read_tarray(kind)?,
                    None => Value::Object(self.read_embedded(class_name)?),
                }
            }
            K_OBJECT_PTR_NULLABLE | K_ANY_PTR_NULLABLE => Value::from(self.read_object_any()?),
            K_STL | K_STREAMER | K_STREAM_LOOP => self.read_special(obj, member)?,
            _ => {
                if let Some(kind) = scalar_kind(code) {
                    self.cursor.read_scalar(kind)?
                } else if let Some(kind) = fixed_array_kind(code) {
                    let n = member.length.max(0) as usize;
                    Value::Array(self.cursor.read_fast_array(n, kind)?)
                } else if let Some(kind) = pointer_kind(code) {
                    self.read_counted_pointer(obj, member, kind)?
                } else {
                    self.recover(unsupported(member));
                    return Ok(());
                }
            }
        };
        obj.set(member.name.clone(), value);
        Ok(())
    }

    /// Element count of a counted member, taken from the member it names.
    fn count_of(&self, obj: &Object, member: &StreamerElement) -> Result<usize> {
        member
            .count_name
            .as_deref()
            .and_then(|name| obj.get_i64(name))
            .map(|n| n.max(0) as usize)
            .ok_or_else(|| unsupported(member))
    }

    fn read_counted_pointer(
        &mut self,
        obj: &Object,
        member: &StreamerElement,
        kind: ScalarKind,
    ) -> Result<Value> {
        let present = self.cursor.read_u8()?;
        if present != 1 {
            return Ok(Value::Array(Array::empty(kind)));
        }
        let n = self.count_of(obj, member)?;
        Ok(Value::Array(self.cursor.read_fast_array(n, kind)?))
    }

    /// Framed members of a small closed set of container shapes.
    fn read_special(&mut self, obj: &Object, member: &StreamerElement) -> Result<Value> {
        let ver = self.read_version()?;
        let type_name = member.type_name.as_str();
        let value = if type_name == "TString*" {
            let n = match self.count_of(obj, member) {
                Ok(n) => n,
                Err(err) => {
                    self.recover(err);
                    skip_record(&mut self.cursor, &ver)?;
                    return Ok(Value::Null);
                }
            };
            Value::Array(self.cursor.read_tstring_array(n)?)
        } else if let Some(kind) = vector_kind(type_name) {
            let n = self.cursor.read_i32()?.max(0) as usize;
            Value::Array(self.cursor.read_fast_array(n, kind)?)
        } else if type_name == "vector<TObject*>" {
            let n = self.cursor.read_i32()?.max(0);
            let mut items = Vec::new();
            for _ in 0..n {
                items.push(Value::from(self.read_object_any()?));
            }
            Value::List(items)
        } else if type_name.starts_with("map<TString,int") {
            let n = self.cursor.read_i32()?.max(0);
            let mut pairs = Vec::new();
            for _ in 0..n {
                let key = self.cursor.read_tstring()?;
                pairs.push((key, self.cursor.read_i32()?));
            }
            Value::Pairs(pairs)
        } else {
            self.recover(unsupported(member));
            skip_record(&mut self.cursor, &ver)?;
            return Ok(Value::Null);
        };
        if self.check(&ver, &member.name)? {
            Ok(value)
        } else {
            Ok(Value::Null)
        }
    }

    /// `Float16_t` without a range: an exponent byte, then a mantissa with the sign
    /// just above its top bit.
    fn read_float16(&mut self) -> Result<f32> {
        let exponent = self.cursor.read_u8()? as u32;
        let mantissa = self.cursor.read_u16()? as u32;
        let bits = (exponent << 23)
            | ((mantissa & ((1 << (FLOAT16_MANTISSA_BITS + 1)) - 1))
                << (23 - FLOAT16_MANTISSA_BITS));
        let value = f32::from_bits(bits);
        if mantissa & (1 << (FLOAT16_MANTISSA_BITS + 1)) != 0 {
            Ok(-value)
        } else {
            Ok(value)
        }
    }
}
