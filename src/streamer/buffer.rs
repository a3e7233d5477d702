//! Decode session over one object buffer.
use bytes::Bytes;
use tracing::{trace, warn};

use crate::core::cursor::ByteCursor;
use crate::core::error::{Result, RootError};
use crate::core::framing::{check_byte_count, read_version, skip_record, VersionTag};
use crate::core::options::OpenOptions;
use crate::core::refs::{ClassRef, ReferenceTable};
use crate::core::value::{DecodedObject, ObjRef, Object, ObjectGraph};
use crate::core::{K_BYTE_COUNT_MASK, K_CLASS_MASK, K_NEW_CLASS_TAG, MAP_OFFSET};
use crate::streamer::dispatch::{ClassRoutine, Outcome};
use crate::streamer::info::StreamerRegistry;

/// Cursor, reference table and object arena of one decode.
///
/// A buffer lives for exactly one top-level read; its tags are only meaningful
/// within the bytes it was created over.
pub struct DecodeBuffer<'r> {
    pub(crate) cursor: ByteCursor,
    refs: ReferenceTable,
    /// Position of the payload within its record, added to every tag
    tag_offset: u32,
    pub(crate) graph: ObjectGraph,
    pub(crate) streamers: &'r mut StreamerRegistry,
    pub(crate) issues: Vec<RootError>,
    pub(crate) strict: bool,
    depth: usize,
    max_depth: usize,
}

impl<'r> DecodeBuffer<'r> {
    pub fn new<B: Into<Bytes>>(
        data: B,
        tag_offset: u32,
        streamers: &'r mut StreamerRegistry,
        options: &OpenOptions,
    ) -> Self {
        DecodeBuffer {
            cursor: ByteCursor::new(data),
            refs: ReferenceTable::new(),
            tag_offset,
            graph: ObjectGraph::new(),
            streamers,
            issues: Vec::new(),
            strict: options.strict_framing,
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    pub fn cursor(&mut self) -> &mut ByteCursor {
        &mut self.cursor
    }

    fn tag_at(&self, pos: usize) -> u32 {
        self.tag_offset
            .wrapping_add(pos as u32)
            .wrapping_add(MAP_OFFSET)
    }

    /// Decode the whole buffer as one object of `class_name`, registered at tag 1.
    pub fn read_top(mut self, class_name: &str) -> Result<DecodedObject> {
        let root = self.graph.reserve(class_name);
        self.refs.map_object(1, root);
        let mut obj = Object::new(class_name);
        let outcome = self.class_streamer(&mut obj, class_name)?;
        self.graph.fill(root, obj);
        match outcome {
            Outcome::Streamed => Ok(self.finish(root)),
            Outcome::Skipped => Err(RootError::UnresolvedClass(class_name.to_string())),
        }
    }

    pub(crate) fn finish(self, root: ObjRef) -> DecodedObject {
        DecodedObject {
            graph: self.graph,
            root,
            issues: self.issues,
        }
    }

    /// Keep a recoverable problem and carry on.
    pub(crate) fn recover(&mut self, err: RootError) {
        warn!(error = %err, pos = self.cursor.pos(), "recovered decode error");
        self.issues.push(err);
    }

    /// Byte-count check of a record. Returns `false` when the record had to be
    /// realigned; in strict mode the mismatch is an error instead.
    pub(crate) fn check(&mut self, tag: &VersionTag, context: &str) -> Result<bool> {
        match check_byte_count(&mut self.cursor, tag, context) {
            Ok(()) => Ok(true),
            Err(err @ RootError::FramingMismatch { .. }) if !self.strict => {
                self.recover(err);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn read_version(&mut self) -> Result<VersionTag> {
        read_version(&mut self.cursor)
    }

    /// Read a class reference.
    pub fn read_class(&mut self) -> Result<ClassRef> {
        let bcnt = self.cursor.read_u32()?;
        let start = self.cursor.pos();
        let tag = if bcnt & K_BYTE_COUNT_MASK == 0 || bcnt == K_NEW_CLASS_TAG {
            bcnt
        } else {
            self.cursor.read_u32()?
        };
        if tag & K_CLASS_MASK == 0 {
            return Ok(ClassRef::Object(tag));
        }
        if tag == K_NEW_CLASS_TAG {
            let name = self.cursor.read_cstring()?;
            let class_tag = self.tag_at(start);
            trace!(class = %name, tag = class_tag, "new class");
            self.refs.map_class(class_tag, &name);
            return Ok(ClassRef::Class(name));
        }
        let class_tag = tag & !K_CLASS_MASK;
        match self.refs.get_mapped_class(class_tag) {
            Some(name) => Ok(ClassRef::Class(name.to_string())),
            None => Err(RootError::UnresolvedReference {
                kind: "class",
                tag: class_tag,
            }),
        }
    }

    /// Read a possibly shared, possibly null object pointer.
    ///
    /// A new object is registered under its tag before its body is read, so references
    /// to it from inside its own body resolve to the same handle.
    ///
    /// A counted cell whose class tag cannot be resolved is skipped as a whole and
    /// reads as null; without a byte count there is no way past it.
    pub fn read_object_any(&mut self) -> Result<Option<ObjRef>> {
        let start = self.cursor.pos();
        let cell_end = self.counted_end()?;
        let class = match (self.read_class(), cell_end) {
            (Ok(class), _) => class,
            (Err(err @ RootError::UnresolvedReference { kind: "class", .. }), Some(end)) => {
                self.recover(err);
                self.cursor.locate(end)?;
                return Ok(None);
            }
            (Err(err), _) => return Err(err),
        };
        match class {
            ClassRef::Object(tag) => match self.refs.get_mapped_object(tag) {
                Some(mapped) => Ok(mapped.object()),
                None => Err(RootError::UnresolvedReference {
                    kind: "object",
                    tag,
                }),
            },
            ClassRef::Class(class_name) => {
                let at = self.graph.reserve(&class_name);
                let tag = self.tag_at(start);
                self.refs.map_object(tag, at);
                let mut obj = Object::new(class_name.as_str());
                self.class_streamer(&mut obj, &class_name)?;
                self.graph.fill(at, obj);
                Ok(Some(at))
            }
        }
    }

    /// End of the object cell at the cursor, if it carries a byte count.
    fn counted_end(&mut self) -> Result<Option<usize>> {
        let bcnt = self.cursor.read_u32()?;
        self.cursor.shift(-4)?;
        if bcnt & K_BYTE_COUNT_MASK == 0 || bcnt == K_NEW_CLASS_TAG {
            return Ok(None);
        }
        Ok(Some(self.cursor.pos() + 4 + (bcnt & !K_BYTE_COUNT_MASK) as usize))
    }

    /// Read an object embedded by value into a fresh arena slot.
    pub(crate) fn read_embedded(&mut self, class_name: &str) -> Result<ObjRef> {
        let at = self.graph.reserve(class_name);
        let mut obj = Object::new(class_name);
        self.class_streamer(&mut obj, class_name)?;
        self.graph.fill(at, obj);
        Ok(at)
    }

    /// Stream the data of class `class_name` into `obj`.
    ///
    /// Without a routine for the class its record is skipped and an
    /// [`RootError::UnresolvedClass`] is kept as an issue.
    pub fn class_streamer(&mut self, obj: &mut Object, class_name: &str) -> Result<Outcome> {
        if self.depth >= self.max_depth {
            return Err(RootError::format(format!(
                "object nesting deeper than {} while reading `{}`",
                self.max_depth, class_name
            )));
        }
        self.depth += 1;
        let res = self.dispatch(obj, class_name);
        self.depth -= 1;
        res
    }

    fn dispatch(&mut self, obj: &mut Object, class_name: &str) -> Result<Outcome> {
        match ClassRoutine::resolve(class_name, self.streamers) {
            Some(ClassRoutine::Hardcoded(routine)) => {
                self.read_hardcoded(routine, obj)?;
                Ok(Outcome::Streamed)
            }
            Some(ClassRoutine::Generic(info)) => {
                self.read_generic(obj, &info)?;
                Ok(Outcome::Streamed)
            }
            None => {
                let tag = self.read_version()?;
                skip_record(&mut self.cursor, &tag)?;
                self.recover(RootError::UnresolvedClass(class_name.to_string()));
                Ok(Outcome::Skipped)
            }
        }
    }
}
