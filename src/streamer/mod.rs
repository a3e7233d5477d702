//! Reconstruction of object graphs from framed buffers: the decode session, the routine
//! dispatch and the schemas that drive it.
pub mod buffer;
pub mod dispatch;
mod generic;
mod hardcoded;
pub mod info;
pub mod type_code;

pub use self::buffer::DecodeBuffer;
pub use self::dispatch::{ClassRoutine, Hardcoded, Outcome};
pub use self::hardcoded::TObjectBits;
pub use self::info::{ElementKind, StreamerElement, StreamerInfo, StreamerRegistry, UserStreamer};

use bytes::Bytes;

use crate::core::error::Result;
use crate::core::options::OpenOptions;
use crate::core::value::DecodedObject;

/// Decode an object of `class_name` held outside any file.
///
/// `obj_data` is the bare object record and `sinfo_data` the streamer-info `TList`
/// describing it, each serialized on its own so that tags count from its first byte.
pub fn reconstruct_object<O, S>(class_name: &str, obj_data: O, sinfo_data: S) -> Result<DecodedObject>
where
    O: Into<Bytes>,
    S: Into<Bytes>,
{
    let options = OpenOptions::new();
    let mut streamers = StreamerRegistry::from_buffer(sinfo_data, &options)?;
    DecodeBuffer::new(obj_data, 0, &mut streamers, &options).read_top(class_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RootError;
    use crate::streamer::type_code::{K_DOUBLE, K_INT};
    use crate::test_utils::{El, Info, Writer};

    const POINT: &[El] = &[
        El::Base("TObject", 1),
        El::Basic("fId", K_INT, "Int_t"),
        El::Basic("fX", K_DOUBLE, "Double_t"),
    ];

    fn schema() -> Vec<u8> {
        let mut w = Writer::new();
        w.streamer_info_list(&[Info {
            class_name: "TPoint",
            version: 3,
            elements: POINT,
        }]);
        w.into_inner()
    }

    #[test]
    fn standalone_object_with_its_schema() {
        let mut w = Writer::new();
        let rec = w.begin_record(3);
        w.tobject().i32(17).f64(0.75);
        w.end_record(rec);
        let obj = reconstruct_object("TPoint", w.into_inner(), schema()).unwrap();
        assert!(obj.issues().is_empty(), "{:?}", obj.issues());
        let root = obj.root();
        assert_eq!(root.class_name, "TPoint");
        assert_eq!(root.get_i64("fId"), Some(17));
        assert_eq!(root.get("fX"), Some(&crate::core::value::Value::Float(0.75)));
    }

    #[test]
    fn standalone_object_without_schema_is_unresolved() {
        let mut w = Writer::new();
        let rec = w.begin_record(3);
        w.tobject().i32(17).f64(0.75);
        w.end_record(rec);
        let mut empty = Writer::new();
        empty.streamer_info_list(&[]);
        assert!(matches!(
            reconstruct_object("TPoint", w.into_inner(), empty.into_inner()),
            Err(RootError::UnresolvedClass(ref c)) if c == "TPoint"
        ));
    }
}
