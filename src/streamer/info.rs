//! Class schemas (`TStreamerInfo`) and the per-file registry that builds them lazily
//! from the decoded streamer-info list.
use std::collections::HashMap;
use std::fmt::Write;
use std::rc::Rc;

use bytes::Bytes;

use crate::core::error::Result;
use crate::core::options::OpenOptions;
use crate::core::value::{Array, DecodedObject, Object, Value};
use crate::streamer::buffer::DecodeBuffer;

/// Which `TStreamer*` class an element was written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Element,
    Base,
    BasicType,
    BasicPointer,
    Loop,
    Object,
    ObjectAny,
    ObjectPointer,
    ObjectAnyPointer,
    String,
    Stl,
    StlString,
}

impl ElementKind {
    fn from_class(class_name: &str) -> Option<Self> {
        Some(match class_name {
            "TStreamerElement" => ElementKind::Element,
            "TStreamerBase" => ElementKind::Base,
            "TStreamerBasicType" => ElementKind::BasicType,
            "TStreamerBasicPointer" => ElementKind::BasicPointer,
            "TStreamerLoop" => ElementKind::Loop,
            "TStreamerObject" => ElementKind::Object,
            "TStreamerObjectAny" => ElementKind::ObjectAny,
            "TStreamerObjectPointer" => ElementKind::ObjectPointer,
            "TStreamerObjectAnyPointer" => ElementKind::ObjectAnyPointer,
            "TStreamerString" => ElementKind::String,
            "TStreamerSTL" => ElementKind::Stl,
            "TStreamerSTLstring" => ElementKind::StlString,
            _ => return None,
        })
    }
}

/// Description of one base class or data member.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamerElement {
    pub name: String,
    pub title: String,
    pub kind: ElementKind,
    pub type_code: i32,
    pub size: i32,
    /// Total number of elements of a fixed array, 0 for scalars
    pub length: i32,
    pub dim: i32,
    pub max_index: Vec<i32>,
    pub type_name: String,
    /// Member holding the element count of a counted pointer
    pub count_name: Option<String>,
    pub count_class: Option<String>,
    pub base_version: Option<i32>,
    pub stl_type: Option<i32>,
    pub ctype: Option<i32>,
}

fn opt_str(obj: &Object, field: &str) -> Option<String> {
    obj.get_str(field).map(str::to_string)
}

fn opt_i32(obj: &Object, field: &str) -> Option<i32> {
    obj.get_i64(field).map(|v| v as i32)
}

impl StreamerElement {
    /// Read back an element decoded by one of the `TStreamer*` routines.
    pub(crate) fn from_object(obj: &Object) -> Option<Self> {
        let kind = ElementKind::from_class(&obj.class_name)?;
        let max_index = match obj.get("fMaxIndex").and_then(Value::as_array) {
            Some(Array::I32(v)) => v.clone(),
            _ => Vec::new(),
        };
        Some(StreamerElement {
            name: opt_str(obj, "fName")?,
            title: opt_str(obj, "fTitle").unwrap_or_default(),
            kind,
            type_code: opt_i32(obj, "fType")?,
            size: opt_i32(obj, "fSize").unwrap_or_default(),
            length: opt_i32(obj, "fArrayLength").unwrap_or_default(),
            dim: opt_i32(obj, "fArrayDim").unwrap_or_default(),
            max_index,
            type_name: opt_str(obj, "fTypeName").unwrap_or_default(),
            count_name: opt_str(obj, "fCountName"),
            count_class: opt_str(obj, "fCountClass"),
            base_version: opt_i32(obj, "fBaseVersion"),
            stl_type: opt_i32(obj, "fSTLtype"),
            ctype: opt_i32(obj, "fCtype"),
        })
    }

    pub fn is_base(&self) -> bool {
        self.type_name == "BASE"
    }
}

/// Schema of one class: bases first, then members, both in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamerInfo {
    pub class_name: String,
    pub title: String,
    pub class_version: i32,
    pub checksum: u32,
    pub base_classes: Vec<StreamerElement>,
    pub members: Vec<StreamerElement>,
}

impl StreamerInfo {
    fn from_decoded(list: &DecodedObject, obj: &Object) -> Option<Self> {
        let mut info = StreamerInfo {
            class_name: opt_str(obj, "fName")?,
            title: opt_str(obj, "fTitle").unwrap_or_default(),
            class_version: opt_i32(obj, "fClassVersion").unwrap_or_default(),
            checksum: obj.get("fCheckSum").and_then(Value::as_u64).unwrap_or_default() as u32,
            base_classes: Vec::new(),
            members: Vec::new(),
        };
        let elements = obj
            .get("fElements")
            .and_then(|v| list.deref(v))
            .and_then(|arr| arr.get("arr"))
            .and_then(Value::as_list)
            .unwrap_or_default();
        for element in elements.iter().filter_map(|v| list.deref(v)) {
            if let Some(el) = StreamerElement::from_object(element) {
                if el.is_base() {
                    info.base_classes.push(el);
                } else {
                    info.members.push(el);
                }
            }
        }
        Some(info)
    }

    /// YAML-like dump of the schema
    pub fn to_yaml(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{}:", self.class_name);
        let _ = writeln!(s, "  version: {}", self.class_version);
        let _ = writeln!(s, "  checksum: {:#010x}", self.checksum);
        if !self.title.is_empty() {
            let _ = writeln!(s, "  title: {:?}", self.title);
        }
        if !self.base_classes.is_empty() {
            let _ = writeln!(s, "  bases:");
            for base in &self.base_classes {
                let _ = writeln!(
                    s,
                    "    - {} (version {})",
                    base.name,
                    base.base_version.unwrap_or_default()
                );
            }
        }
        if !self.members.is_empty() {
            let _ = writeln!(s, "  members:");
            for m in &self.members {
                let _ = write!(s, "    - {}: {} [type {}", m.name, m.type_name, m.type_code);
                if m.length > 0 {
                    let _ = write!(s, ", length {}", m.length);
                }
                if let Some(count) = &m.count_name {
                    let _ = write!(s, ", count {}", count);
                }
                let _ = write!(s, "]");
                if !m.title.is_empty() {
                    let _ = write!(s, " # {}", m.title);
                }
                let _ = writeln!(s);
            }
        }
        s
    }
}

/// Custom reader for data members of one type name. It receives the decode session
/// positioned at the member, the object being filled and the member name.
pub type UserStreamer = fn(&mut DecodeBuffer<'_>, &mut Object, &str) -> Result<()>;

/// Schemas of one file, translated from the streamer-info list on first use.
#[derive(Default)]
pub struct StreamerRegistry {
    list: Option<DecodedObject>,
    cache: HashMap<String, Rc<StreamerInfo>>,
    user: HashMap<String, UserStreamer>,
}

impl std::fmt::Debug for StreamerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamerRegistry")
            .field("list", &self.list)
            .field("cached", &self.cache.keys().collect::<Vec<_>>())
            .field("user", &self.user.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StreamerRegistry {
    pub(crate) fn from_list(list: DecodedObject) -> Self {
        let mut registry = StreamerRegistry::default();
        registry.set_list(list);
        registry
    }

    /// Registry over a standalone streamer-info buffer: a `TList` serialized on its
    /// own, with tags counted from its first byte.
    pub fn from_buffer<B: Into<Bytes>>(data: B, options: &OpenOptions) -> Result<Self> {
        let mut bootstrap = StreamerRegistry::default();
        let list = DecodeBuffer::new(data, 0, &mut bootstrap, options).read_top("TList")?;
        Ok(StreamerRegistry::from_list(list))
    }

    /// Replace the streamer-info list. Cached schemas are dropped, user streamers kept.
    pub(crate) fn set_list(&mut self, list: DecodedObject) {
        self.list = Some(list);
        self.cache.clear();
    }

    /// Read every data member whose type name is `type_name` with `f` instead of its
    /// schema. A later registration for the same name replaces the earlier one.
    pub fn add_user_streamer(&mut self, type_name: &str, f: UserStreamer) {
        self.user.insert(type_name.to_string(), f);
    }

    pub(crate) fn user_streamer(&self, type_name: &str) -> Option<UserStreamer> {
        self.user.get(type_name).copied()
    }

    /// The decoded streamer-info list, if one was loaded.
    pub fn list(&self) -> Option<&DecodedObject> {
        self.list.as_ref()
    }

    fn entries(&self) -> impl Iterator<Item = &Object> {
        let list = self.list.as_ref();
        list.and_then(|l| l.root().get("arr"))
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(move |v| list.and_then(|l| l.deref(v)))
            .filter(|obj| obj.class_name == "TStreamerInfo")
    }

    fn entry_ref(&self, class_name: &str) -> Option<&Object> {
        self.entries()
            .find(|obj| obj.get_str("fName") == Some(class_name))
    }

    /// Schema of `class_name`, built and cached on first request. The schemas of its
    /// base classes are built at the same time.
    pub fn get(&mut self, class_name: &str) -> Option<Rc<StreamerInfo>> {
        if let Some(info) = self.cache.get(class_name) {
            return Some(Rc::clone(info));
        }
        let list = self.list.as_ref()?;
        let info = Rc::new(StreamerInfo::from_decoded(list, self.entry_ref(class_name)?)?);
        self.cache
            .insert(class_name.to_string(), Rc::clone(&info));
        for base in &info.base_classes {
            self.get(&base.name);
        }
        Some(info)
    }

    /// Every schema in the list, in file order
    pub fn all(&self) -> Vec<StreamerInfo> {
        let list = match &self.list {
            Some(list) => list,
            None => return Vec::new(),
        };
        self.entries()
            .filter_map(|obj| StreamerInfo::from_decoded(list, obj))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, class_name: &str) -> bool {
        self.cache.contains_key(class_name)
    }
}
