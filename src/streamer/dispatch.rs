//! Choice of the routine that streams a class.
use std::rc::Rc;

use crate::streamer::info::{StreamerInfo, StreamerRegistry};

/// Classes with a built-in routine. These are needed to read the streamer-info list
/// itself, so they never depend on a schema from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hardcoded {
    /// `TObject` and `TMethodCall`
    TObject,
    /// `TQObject`, which has no payload
    TQObject,
    TNamed,
    TObjString,
    /// `TList` and `THashList`
    TList,
    TObjArray,
    TClonesArray,
    TCollection,
    TPolyMarker3D,
    TCanvas,
    TStreamerInfo,
    TStreamerElement,
    TStreamerBase,
    /// `TStreamerBasicPointer` and `TStreamerLoop`
    TStreamerBasicPointer,
    TStreamerSTL,
    TStreamerSTLstring,
    /// Elements without members of their own
    TStreamerSubElement,
    TStreamerObjectAnyPointer,
    TBasket,
}

impl Hardcoded {
    pub fn lookup(class_name: &str) -> Option<Self> {
        Some(match class_name {
            "TObject" | "TMethodCall" => Hardcoded::TObject,
            "TQObject" => Hardcoded::TQObject,
            "TNamed" => Hardcoded::TNamed,
            "TObjString" => Hardcoded::TObjString,
            "TList" | "THashList" => Hardcoded::TList,
            "TObjArray" => Hardcoded::TObjArray,
            "TClonesArray" => Hardcoded::TClonesArray,
            "TCollection" => Hardcoded::TCollection,
            "TPolyMarker3D" => Hardcoded::TPolyMarker3D,
            "TCanvas" => Hardcoded::TCanvas,
            "TStreamerInfo" => Hardcoded::TStreamerInfo,
            "TStreamerElement" => Hardcoded::TStreamerElement,
            "TStreamerBase" => Hardcoded::TStreamerBase,
            "TStreamerBasicPointer" | "TStreamerLoop" => Hardcoded::TStreamerBasicPointer,
            "TStreamerSTL" => Hardcoded::TStreamerSTL,
            "TStreamerSTLstring" => Hardcoded::TStreamerSTLstring,
            "TStreamerObject" | "TStreamerBasicType" | "TStreamerObjectAny"
            | "TStreamerString" | "TStreamerObjectPointer" => Hardcoded::TStreamerSubElement,
            "TStreamerObjectAnyPointer" => Hardcoded::TStreamerObjectAnyPointer,
            "TBasket" => Hardcoded::TBasket,
            _ => return None,
        })
    }
}

/// How one class is streamed.
#[derive(Debug, Clone)]
pub enum ClassRoutine {
    Hardcoded(Hardcoded),
    Generic(Rc<StreamerInfo>),
}

impl ClassRoutine {
    /// Built-in routines take precedence over schemas from the file.
    pub fn resolve(class_name: &str, streamers: &mut StreamerRegistry) -> Option<Self> {
        match Hardcoded::lookup(class_name) {
            Some(h) => Some(ClassRoutine::Hardcoded(h)),
            None => streamers.get(class_name).map(ClassRoutine::Generic),
        }
    }
}

/// Result of streaming one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Streamed,
    /// No routine was found; the record was skipped by its byte count.
    Skipped,
}
