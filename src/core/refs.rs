use std::collections::HashMap;

use crate::core::value::ObjRef;

/// Entry of the object map. Tag 0 always maps to `Null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedObject {
    Null,
    Object(ObjRef),
}

impl MappedObject {
    pub fn object(self) -> Option<ObjRef> {
        match self {
            MappedObject::Null => None,
            MappedObject::Object(r) => Some(r),
        }
    }
}

/// What a class reference in the buffer turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassRef {
    /// A backreference to an object already read in this buffer.
    Object(u32),
    /// A new or previously seen class; an object of this class follows.
    Class(String),
}

/// Tag tables of one decode session.
///
/// Every object and every class name streamed into a buffer gets a tag derived from its
/// position, and later occurrences in the same buffer refer back to it by that tag.
#[derive(Debug)]
pub struct ReferenceTable {
    objects: HashMap<u32, MappedObject>,
    classes: HashMap<u32, String>,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        let mut table = ReferenceTable {
            objects: HashMap::new(),
            classes: HashMap::new(),
        };
        table.clear();
        table
    }
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_object(&mut self, tag: u32, obj: ObjRef) {
        self.objects.insert(tag, MappedObject::Object(obj));
    }

    /// Register a class name; an existing mapping for `tag` is kept.
    pub fn map_class(&mut self, tag: u32, class_name: &str) {
        self.classes
            .entry(tag)
            .or_insert_with(|| class_name.to_string());
    }

    /// `None` if nothing was registered at `tag`, which is not the same as a mapped null.
    pub fn get_mapped_object(&self, tag: u32) -> Option<MappedObject> {
        self.objects.get(&tag).copied()
    }

    pub fn get_mapped_class(&self, tag: u32) -> Option<&str> {
        self.classes.get(&tag).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.classes.clear();
        self.objects.insert(0, MappedObject::Null);
    }
}
