//! Member type codes of `TStreamerElement::fType`.
//!
//! Fixed-size arrays of a primitive carry `K_OFFSET_L + code`, counted pointers to a
//! primitive carry `K_OFFSET_P + code`.
use crate::core::value::ScalarKind;

pub const K_BASE: i32 = 0;
pub const K_CHAR: i32 = 1;
pub const K_SHORT: i32 = 2;
pub const K_INT: i32 = 3;
pub const K_LONG: i32 = 4;
pub const K_FLOAT: i32 = 5;
pub const K_COUNTER: i32 = 6;
pub const K_CHAR_STAR: i32 = 7;
pub const K_DOUBLE: i32 = 8;
pub const K_DOUBLE32: i32 = 9;
pub const K_LEGACY_CHAR: i32 = 10;
pub const K_UCHAR: i32 = 11;
pub const K_USHORT: i32 = 12;
pub const K_UINT: i32 = 13;
pub const K_ULONG: i32 = 14;
pub const K_BITS: i32 = 15;
pub const K_LONG64: i32 = 16;
pub const K_ULONG64: i32 = 17;
pub const K_BOOL: i32 = 18;
pub const K_FLOAT16: i32 = 19;

pub const K_OFFSET_L: i32 = 20;
pub const K_OFFSET_P: i32 = 40;

/// Object embedded by value
pub const K_OBJECT: i32 = 61;
/// Non-`TObject` embedded by value
pub const K_ANY: i32 = 62;
/// Pointer to an object that is never null (`//->`)
pub const K_OBJECT_PTR: i32 = 63;
/// Pointer to an object, possibly null or shared
pub const K_OBJECT_PTR_NULLABLE: i32 = 64;
pub const K_TSTRING: i32 = 65;
pub const K_TOBJECT: i32 = 66;
pub const K_TNAMED: i32 = 67;
pub const K_ANY_PTR: i32 = 68;
pub const K_ANY_PTR_NULLABLE: i32 = 69;
pub const K_ANY_PTR_NO_VTABLE: i32 = 70;
pub const K_STL_PTR: i32 = 71;

pub const K_STL: i32 = 300;
pub const K_STL_STRING: i32 = 365;
pub const K_STREAMER: i32 = 500;
pub const K_STREAM_LOOP: i32 = 501;

/// On-disk representation of a primitive type code.
pub fn scalar_kind(code: i32) -> Option<ScalarKind> {
    Some(match code {
        K_CHAR => ScalarKind::I8,
        K_SHORT => ScalarKind::I16,
        K_INT | K_COUNTER => ScalarKind::I32,
        K_LONG | K_LONG64 => ScalarKind::I64,
        K_FLOAT | K_DOUBLE32 => ScalarKind::F32,
        K_DOUBLE => ScalarKind::F64,
        K_LEGACY_CHAR | K_UCHAR => ScalarKind::U8,
        K_USHORT => ScalarKind::U16,
        K_UINT | K_BITS => ScalarKind::U32,
        K_ULONG | K_ULONG64 => ScalarKind::U64,
        K_BOOL => ScalarKind::Bool,
        _ => return None,
    })
}

/// Primitive kind of a fixed array (`K_OFFSET_L + code`).
pub fn fixed_array_kind(code: i32) -> Option<ScalarKind> {
    if code > K_OFFSET_L && code < K_OFFSET_P {
        scalar_kind(code - K_OFFSET_L)
    } else {
        None
    }
}

/// Primitive kind of a counted pointer (`K_OFFSET_P + code`).
pub fn pointer_kind(code: i32) -> Option<ScalarKind> {
    if code > K_OFFSET_P && code < K_OFFSET_P + K_OFFSET_L {
        scalar_kind(code - K_OFFSET_P)
    } else {
        None
    }
}

/// Element kind of a `TArray*` class, from the letter after `TArray`.
pub fn tarray_kind(class_name: &str) -> Option<ScalarKind> {
    match class_name.strip_prefix("TArray")?.chars().next()? {
        'I' => Some(ScalarKind::I32),
        'D' => Some(ScalarKind::F64),
        'F' => Some(ScalarKind::F32),
        'S' => Some(ScalarKind::I16),
        'C' => Some(ScalarKind::I8),
        'L' => Some(ScalarKind::I64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_resolve_to_the_base_kind() {
        assert_eq!(fixed_array_kind(K_OFFSET_L + K_DOUBLE), Some(ScalarKind::F64));
        assert_eq!(fixed_array_kind(K_OFFSET_L + K_DOUBLE32), Some(ScalarKind::F32));
        assert_eq!(pointer_kind(K_OFFSET_P + K_UCHAR), Some(ScalarKind::U8));
        assert_eq!(pointer_kind(K_OFFSET_P), None);
        assert_eq!(fixed_array_kind(K_OFFSET_L + K_FLOAT16), None);
    }

    #[test]
    fn tarray_letters() {
        assert_eq!(tarray_kind("TArrayD"), Some(ScalarKind::F64));
        assert_eq!(tarray_kind("TArrayL64"), Some(ScalarKind::I64));
        assert_eq!(tarray_kind("TArrayX"), None);
        assert_eq!(tarray_kind("TAxis"), None);
    }
}
