//! In-memory form of decoded objects.
//!
//! Objects of one decode live in an [`ObjectGraph`] arena and point at each other through
//! [`ObjRef`] handles, so a list holding the same object twice, or an object holding
//! itself, is just a repeated handle.
use std::collections::HashSet;
use std::fmt;

use crate::core::error::RootError;

/// Primitive element kinds that can be read in bulk from a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    /// Width of one element on disk
    pub fn width(self) -> usize {
        match self {
            ScalarKind::Bool | ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }
}

/// Homogeneous sequence of primitives (or strings).
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Str(Vec<String>),
}

impl Array {
    pub fn empty(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Array::Bool(Vec::new()),
            ScalarKind::I8 => Array::I8(Vec::new()),
            ScalarKind::U8 => Array::U8(Vec::new()),
            ScalarKind::I16 => Array::I16(Vec::new()),
            ScalarKind::U16 => Array::U16(Vec::new()),
            ScalarKind::I32 => Array::I32(Vec::new()),
            ScalarKind::U32 => Array::U32(Vec::new()),
            ScalarKind::I64 => Array::I64(Vec::new()),
            ScalarKind::U64 => Array::U64(Vec::new()),
            ScalarKind::F32 => Array::F32(Vec::new()),
            ScalarKind::F64 => Array::F64(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Bool(v) => v.len(),
            Array::I8(v) => v.len(),
            Array::U8(v) => v.len(),
            Array::I16(v) => v.len(),
            Array::U16(v) => v.len(),
            Array::I32(v) => v.len(),
            Array::U32(v) => v.len(),
            Array::I64(v) => v.len(),
            Array::U64(v) => v.len(),
            Array::F32(v) => v.len(),
            Array::F64(v) => v.len(),
            Array::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `idx` widened to `f64`, for numeric arrays
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            Array::Bool(v) => v.get(idx).map(|b| if *b { 1.0 } else { 0.0 }),
            Array::I8(v) => v.get(idx).map(|x| *x as f64),
            Array::U8(v) => v.get(idx).map(|x| *x as f64),
            Array::I16(v) => v.get(idx).map(|x| *x as f64),
            Array::U16(v) => v.get(idx).map(|x| *x as f64),
            Array::I32(v) => v.get(idx).map(|x| *x as f64),
            Array::U32(v) => v.get(idx).map(|x| *x as f64),
            Array::I64(v) => v.get(idx).map(|x| *x as f64),
            Array::U64(v) => v.get(idx).map(|x| *x as f64),
            Array::F32(v) => v.get(idx).map(|x| *x as f64),
            Array::F64(v) => v.get(idx).copied(),
            Array::Str(_) => None,
        }
    }
}

/// Handle of an object inside an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub(crate) usize);

impl ObjRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Array(Array),
    List(Vec<Value>),
    Object(ObjRef),
    Pairs(Vec<(String, i32)>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            Value::Bool(b) => Some(b as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) => u64::try_from(v).ok(),
            Value::Bool(b) => Some(b as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjRef> {
        match *self {
            Value::Object(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Option<ObjRef>> for Value {
    fn from(obj: Option<ObjRef>) -> Self {
        obj.map_or(Value::Null, Value::Object)
    }
}

/// One decoded instance: its class name and its fields in streaming order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    pub class_name: String,
    fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new<S: Into<String>>(class_name: S) -> Self {
        Object {
            class_name: class_name.into(),
            fields: Vec::new(),
        }
    }

    /// Set a field, replacing an earlier value of the same name in place.
    pub fn set<S: Into<String>>(&mut self, name: S, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Arena owning every object produced by one decode.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an empty placeholder; its handle is valid before the body is decoded.
    pub(crate) fn reserve(&mut self, class_name: &str) -> ObjRef {
        self.objects.push(Object::new(class_name));
        ObjRef(self.objects.len() - 1)
    }

    pub(crate) fn fill(&mut self, at: ObjRef, obj: Object) {
        self.objects[at.0] = obj;
    }

    pub fn get(&self, at: ObjRef) -> Option<&Object> {
        self.objects.get(at.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Result of decoding one key: the object arena, the top-level object and the problems
/// that were recovered from on the way.
#[derive(Debug)]
pub struct DecodedObject {
    pub(crate) graph: ObjectGraph,
    pub(crate) root: ObjRef,
    pub(crate) issues: Vec<RootError>,
}

impl DecodedObject {
    pub fn root(&self) -> &Object {
        &self.graph.objects[self.root.0]
    }

    pub fn root_ref(&self) -> ObjRef {
        self.root
    }

    pub fn class_name(&self) -> &str {
        &self.root().class_name
    }

    pub fn get(&self, at: ObjRef) -> Option<&Object> {
        self.graph.get(at)
    }

    /// Follow an `Object` value to the object it points at.
    pub fn deref(&self, value: &Value) -> Option<&Object> {
        value.as_object().and_then(|r| self.graph.get(r))
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn issues(&self) -> &[RootError] {
        &self.issues
    }

    fn fmt_object(
        &self,
        f: &mut fmt::Formatter<'_>,
        at: ObjRef,
        indent: usize,
        seen: &mut HashSet<ObjRef>,
    ) -> fmt::Result {
        let obj = match self.graph.get(at) {
            Some(o) => o,
            None => return writeln!(f, "<dangling #{}>", at.0),
        };
        if !seen.insert(at) {
            return writeln!(f, "<{} #{} (seen)>", obj.class_name, at.0);
        }
        writeln!(f, "{} #{}", obj.class_name, at.0)?;
        for (name, value) in obj.fields() {
            write!(f, "{:width$}{}: ", "", name, width = indent + 2)?;
            self.fmt_value(f, value, indent + 2, seen)?;
        }
        Ok(())
    }

    fn fmt_value(
        &self,
        f: &mut fmt::Formatter<'_>,
        value: &Value,
        indent: usize,
        seen: &mut HashSet<ObjRef>,
    ) -> fmt::Result {
        match value {
            Value::Object(r) => self.fmt_object(f, *r, indent, seen),
            Value::List(items) => {
                writeln!(f, "[{} items]", items.len())?;
                for item in items {
                    write!(f, "{:width$}- ", "", width = indent + 2)?;
                    self.fmt_value(f, item, indent + 4, seen)?;
                }
                Ok(())
            }
            Value::Array(arr) if arr.len() > 16 => writeln!(f, "<array of {}>", arr.len()),
            other => writeln!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for DecodedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = HashSet::new();
        self.fmt_object(f, self.root, 0, &mut seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut obj = Object::new("TNamed");
        obj.set("fName", Value::Str("a".into()));
        obj.set("fTitle", Value::Str("t".into()));
        obj.set("fName", Value::Str("b".into()));
        let names: Vec<_> = obj.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["fName", "fTitle"]);
        assert_eq!(obj.get_str("fName"), Some("b"));
    }

    #[test]
    fn cyclic_graph_display_terminates() {
        let mut graph = ObjectGraph::new();
        let root = graph.reserve("TList");
        let mut list = Object::new("TList");
        list.set("arr", Value::List(vec![Value::Object(root)]));
        graph.fill(root, list);
        let decoded = DecodedObject {
            graph,
            root,
            issues: Vec::new(),
        };
        let text = decoded.to_string();
        assert!(text.contains("(seen)"));
    }
}
