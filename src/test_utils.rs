//! Writers that synthesise ROOT byte layouts for the tests.
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::core::{K_BYTE_COUNT_MASK, K_CLASS_MASK, K_NEW_CLASS_TAG, MAP_OFFSET};

/// Big-endian byte writer mirroring what the decoder reads.
#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

macro_rules! put_be {
    ($($name:ident: $type:ty),*) => {
        $(
            pub(crate) fn $name(&mut self, v: $type) -> &mut Self {
                self.buf.extend_from_slice(&v.to_be_bytes());
                self
            }
        )*
    };
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn pos(&self) -> usize {
        self.buf.len()
    }

    put_be!(u8: u8, u16: u16, u32: u32, u64: u64, i16: i16, i32: i32, i64: i64, f32: f32, f64: f64);

    pub(crate) fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub(crate) fn tstring(&mut self, s: &str) -> &mut Self {
        if s.len() < 255 {
            self.u8(s.len() as u8);
        } else {
            self.u8(255).u32(s.len() as u32);
        }
        self.raw(s.as_bytes())
    }

    pub(crate) fn cstring(&mut self, s: &str) -> &mut Self {
        self.raw(s.as_bytes()).u8(0)
    }

    /// Start a counted record; returns the position to hand to [`end_record`](Self::end_record).
    pub(crate) fn begin_record(&mut self, version: u16) -> usize {
        let at = self.pos();
        self.u32(0).u16(version);
        at
    }

    /// Patch the byte count of the record or object started at `at`.
    pub(crate) fn end_record(&mut self, at: usize) {
        let count = (self.pos() - at - 4) as u32 | K_BYTE_COUNT_MASK;
        self.buf[at..at + 4].copy_from_slice(&count.to_be_bytes());
    }

    pub(crate) fn tobject(&mut self) -> &mut Self {
        self.u16(1).u32(0).u32(0x0300_0000)
    }

    pub(crate) fn tnamed(&mut self, name: &str, title: &str) -> &mut Self {
        let at = self.begin_record(1);
        self.tobject().tstring(name).tstring(title);
        self.end_record(at);
        self
    }

    pub(crate) fn tobjstring(&mut self, s: &str) -> &mut Self {
        let at = self.begin_record(1);
        self.tobject().tstring(s);
        self.end_record(at);
        self
    }

    /// Object pointer introducing a class by name; the body follows.
    pub(crate) fn new_object(&mut self, class_name: &str) -> usize {
        let at = self.pos();
        self.u32(0).u32(K_NEW_CLASS_TAG).cstring(class_name);
        at
    }

    /// Object pointer whose class was introduced by the object written at `first`.
    pub(crate) fn known_object(&mut self, first: usize, tag_offset: u32) -> usize {
        let class_tag = tag_offset + first as u32 + 4 + MAP_OFFSET;
        let at = self.pos();
        self.u32(0).u32(K_CLASS_MASK | class_tag);
        at
    }

    /// Reference tag of the object written at `first`.
    pub(crate) fn object_tag(&self, first: usize, tag_offset: u32) -> u32 {
        tag_offset + first as u32 + MAP_OFFSET
    }

    pub(crate) fn streamer_element(&mut self, name: &str, type_code: i32, type_name: &str) {
        self.element_body(name, type_code, type_name, 0);
    }

    fn element_body(&mut self, name: &str, type_code: i32, type_name: &str, length: i32) {
        let at = self.begin_record(4);
        self.tnamed(name, "");
        self.i32(type_code).i32(0).i32(length);
        self.i32(if length > 0 { 1 } else { 0 });
        self.i32(length).i32(0).i32(0).i32(0).i32(0);
        self.tstring(type_name);
        self.end_record(at);
    }

    fn element(&mut self, el: &El) {
        let at = self.new_object(el.class_name());
        match *el {
            El::Base(name, version) => {
                let rec = self.begin_record(3);
                self.element_body(name, 0, "BASE", 0);
                self.i32(version);
                self.end_record(rec);
            }
            El::Basic(name, code, type_name) => {
                let rec = self.begin_record(2);
                self.element_body(name, code, type_name, 0);
                self.end_record(rec);
            }
            El::Array(name, code, type_name, length) => {
                let rec = self.begin_record(2);
                self.element_body(name, code, type_name, length);
                self.end_record(rec);
            }
            El::Pointer(name, code, type_name, count) => {
                let rec = self.begin_record(2);
                self.element_body(name, code, type_name, 0);
                self.i32(1).tstring(count).tstring("");
                self.end_record(rec);
            }
            El::Object(name, code, type_name) => {
                let rec = self.begin_record(2);
                self.element_body(name, code, type_name, 0);
                self.end_record(rec);
            }
            El::String(name) => {
                let rec = self.begin_record(2);
                self.element_body(name, 65, "TString", 0);
                self.end_record(rec);
            }
            El::Stl(name, type_name) => {
                let rec = self.begin_record(3);
                self.element_body(name, 300, type_name, 0);
                self.i32(1).i32(3);
                self.end_record(rec);
            }
        }
        self.end_record(at);
    }

    /// Body of a `TList` of `TStreamerInfo`s, as stored under the streamer-info key.
    pub(crate) fn streamer_info_list(&mut self, infos: &[Info]) -> &mut Self {
        let list = self.begin_record(5);
        self.tobject().tstring("").u32(infos.len() as u32);
        for info in infos {
            let at = self.new_object("TStreamerInfo");
            let rec = self.begin_record(9);
            self.tnamed(info.class_name, "");
            self.u32(0x1234_5678).u32(info.version as u32);
            let arr_at = self.new_object("TObjArray");
            let arr = self.begin_record(3);
            self.tobject().tstring("").u32(info.elements.len() as u32).u32(0);
            for el in info.elements {
                self.element(el);
            }
            self.end_record(arr);
            self.end_record(arr_at);
            self.end_record(rec);
            self.end_record(at);
            self.tstring("");
        }
        self.end_record(list);
        self
    }
}

/// One element of a synthetic streamer info.
#[derive(Debug, Clone, Copy)]
pub(crate) enum El<'a> {
    /// base class name and version
    Base(&'a str, i32),
    Basic(&'a str, i32, &'a str),
    /// fixed array with its length
    Array(&'a str, i32, &'a str, i32),
    /// counted pointer with the name of its count member
    Pointer(&'a str, i32, &'a str, &'a str),
    Object(&'a str, i32, &'a str),
    String(&'a str),
    Stl(&'a str, &'a str),
}

impl El<'_> {
    fn class_name(&self) -> &'static str {
        match self {
            El::Base(..) => "TStreamerBase",
            El::Basic(..) | El::Array(..) => "TStreamerBasicType",
            El::Pointer(..) => "TStreamerBasicPointer",
            El::Object(..) => "TStreamerObject",
            El::String(..) => "TStreamerString",
            El::Stl(..) => "TStreamerSTL",
        }
    }
}

/// A synthetic streamer info.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Info<'a> {
    pub(crate) class_name: &'a str,
    pub(crate) version: i32,
    pub(crate) elements: &'a [El<'a>],
}

fn tstring_len(s: &str) -> usize {
    if s.len() < 255 {
        1 + s.len()
    } else {
        5 + s.len()
    }
}

/// Length of a small key header with the given strings.
pub(crate) fn key_len(class_name: &str, name: &str, title: &str) -> u16 {
    (26 + tstring_len(class_name) + tstring_len(name) + tstring_len(title)) as u16
}

/// Small key header (4-byte pointers) for a record of `data_len` payload bytes.
#[allow(clippy::too_many_arguments)]
pub(crate) fn key_header(
    w: &mut Writer,
    class_name: &str,
    name: &str,
    title: &str,
    obj_len: u32,
    cycle: u16,
    seek_key: u32,
    data_len: u32,
) {
    let key_len = key_len(class_name, name, title);
    w.i32(key_len as i32 + data_len as i32).i16(4).u32(obj_len);
    // 2020-01-01 00:00:00
    w.u32((25 << 26) | (1 << 22) | (1 << 17));
    w.u16(key_len).u16(cycle).u32(seek_key).u32(100);
    w.tstring(class_name).tstring(name).tstring(title);
}

/// One zlib chunk of the compression envelope.
pub(crate) fn zl_envelope(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    let packed = enc.finish().unwrap();
    envelope(b"ZL", 8, &[], &packed, data.len())
}

/// One LZ4 chunk of the compression envelope, with a zeroed checksum.
pub(crate) fn l4_envelope(data: &[u8]) -> Vec<u8> {
    let packed = lz4_compress::compress(data);
    envelope(b"L4", 1, &[0u8; 8], &packed, data.len())
}

fn envelope(magic: &[u8], method: u8, prefix: &[u8], packed: &[u8], raw_len: usize) -> Vec<u8> {
    let c_len = (prefix.len() + packed.len()) as u32;
    let mut out = magic.to_vec();
    out.push(method);
    out.extend_from_slice(&c_len.to_le_bytes()[..3]);
    out.extend_from_slice(&(raw_len as u32).to_le_bytes()[..3]);
    out.extend_from_slice(prefix);
    out.extend_from_slice(packed);
    out
}

/// Start of the top directory record in synthetic files
const BEGIN: u32 = 100;
/// Start of the first data record; the top record is written in front of it
const DATA_START: usize = 500;

#[derive(Debug)]
struct KeySpec {
    class_name: String,
    name: String,
    cycle: u16,
    stored: Vec<u8>,
    obj_len: u32,
    subdir: Option<usize>,
}

#[derive(Debug)]
struct DirSpec {
    name: String,
    keys: Vec<KeySpec>,
}

/// Written key: everything needed to repeat its header in a key list.
struct KeyRec {
    class_name: String,
    name: String,
    obj_len: u32,
    cycle: u16,
    seek_key: u32,
    data_len: u32,
}

/// Assemble a complete small-pointer ROOT file in memory.
#[derive(Debug)]
pub(crate) struct FileBuilder {
    dirs: Vec<DirSpec>,
    streamer_list: Vec<u8>,
}

impl FileBuilder {
    pub(crate) const TOP_DIR: usize = 0;

    pub(crate) fn new() -> Self {
        let mut list = Writer::new();
        list.streamer_info_list(&[]);
        FileBuilder {
            dirs: vec![DirSpec {
                name: "test.root".into(),
                keys: Vec::new(),
            }],
            streamer_list: list.into_inner(),
        }
    }

    /// Header of a file without any records.
    pub(crate) fn empty() -> Vec<u8> {
        let mut w = Writer::new();
        w.raw(b"root").i32(62206).u32(BEGIN);
        w.u32(BEGIN).u32(0).u32(0).i32(0).u32(0).u8(4).u32(1);
        w.u32(0).u32(0);
        w.u16(1).raw(&[0u8; 16]);
        w.into_inner()
    }

    pub(crate) fn streamers(&mut self, infos: &[Info]) -> &mut Self {
        let mut list = Writer::new();
        list.streamer_info_list(infos);
        self.streamer_list = list.into_inner();
        self
    }

    /// Add an uncompressed object to directory `dir`.
    pub(crate) fn object(&mut self, dir: usize, name: &str, class_name: &str, payload: Vec<u8>) -> &mut Self {
        self.object_cycle(dir, name, class_name, 1, payload)
    }

    pub(crate) fn object_cycle(
        &mut self,
        dir: usize,
        name: &str,
        class_name: &str,
        cycle: u16,
        payload: Vec<u8>,
    ) -> &mut Self {
        self.dirs[dir].keys.push(KeySpec {
            class_name: class_name.into(),
            name: name.into(),
            cycle,
            obj_len: payload.len() as u32,
            stored: payload,
            subdir: None,
        });
        self
    }

    /// Add an object stored in a zlib envelope.
    pub(crate) fn compressed_object(&mut self, dir: usize, name: &str, class_name: &str, payload: Vec<u8>) -> &mut Self {
        let stored = zl_envelope(&payload);
        assert!(stored.len() < payload.len(), "payload does not compress");
        self.dirs[dir].keys.push(KeySpec {
            class_name: class_name.into(),
            name: name.into(),
            cycle: 1,
            obj_len: payload.len() as u32,
            stored,
            subdir: None,
        });
        self
    }

    /// Add a sub-directory to `parent`; returns its id.
    pub(crate) fn directory(&mut self, parent: usize, name: &str) -> usize {
        let id = self.dirs.len();
        self.dirs.push(DirSpec {
            name: name.into(),
            keys: Vec::new(),
        });
        self.dirs[parent].keys.push(KeySpec {
            class_name: "TDirectoryFile".into(),
            name: name.into(),
            cycle: 1,
            stored: Vec::new(),
            obj_len: 0,
            subdir: Some(id),
        });
        id
    }

    fn write_key(w: &mut Writer, class_name: &str, name: &str, cycle: u16, stored: &[u8], obj_len: u32) -> KeyRec {
        let seek_key = w.pos() as u32;
        key_header(w, class_name, name, "", obj_len, cycle, seek_key, stored.len() as u32);
        w.raw(stored);
        KeyRec {
            class_name: class_name.into(),
            name: name.into(),
            obj_len,
            cycle,
            seek_key,
            data_len: stored.len() as u32,
        }
    }

    /// Write the key list of a directory; returns its position and length.
    fn write_key_list(w: &mut Writer, dir_name: &str, keys: &[KeyRec]) -> (u32, u32) {
        let mut body = Writer::new();
        body.i32(keys.len() as i32);
        for k in keys {
            key_header(&mut body, &k.class_name, &k.name, "", k.obj_len, k.cycle, k.seek_key, k.data_len);
        }
        let at = w.pos() as u32;
        key_header(w, "TDirectory", dir_name, "", 0, 1, at, body.pos() as u32);
        w.raw(body.bytes());
        (at, w.pos() as u32 - at)
    }

    fn dir_header(w: &mut Writer, seek_dir: u32, seek_keys: u32, nbytes_keys: u32, nbytes_name: u32) {
        w.u16(5).u32(0).u32(0).u32(nbytes_keys).u32(nbytes_name);
        w.u32(seek_dir).u32(0).u32(seek_keys);
        w.u16(1).raw(&[9u8; 16]);
    }

    pub(crate) fn finish(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.raw(&[0u8; DATA_START]);
        // children are created after their parents, so walking backwards writes every
        // key list before the directory record pointing at it
        let mut lists = vec![(0u32, 0u32); self.dirs.len()];
        for id in (0..self.dirs.len()).rev() {
            let dir = &self.dirs[id];
            let mut recs = Vec::new();
            for key in &dir.keys {
                let rec = match key.subdir {
                    Some(sub) => {
                        let mut payload = Writer::new();
                        let (seek_keys, nbytes_keys) = lists[sub];
                        Self::dir_header(&mut payload, 0, seek_keys, nbytes_keys, 0);
                        let payload = payload.into_inner();
                        Self::write_key(&mut w, &key.class_name, &key.name, key.cycle, &payload, payload.len() as u32)
                    }
                    None => Self::write_key(&mut w, &key.class_name, &key.name, key.cycle, &key.stored, key.obj_len),
                };
                recs.push(rec);
            }
            lists[id] = Self::write_key_list(&mut w, &dir.name, &recs);
        }

        let info = Self::write_key(
            &mut w,
            "TList",
            "StreamerInfo",
            1,
            &self.streamer_list,
            self.streamer_list.len() as u32,
        );
        let nbytes_info = info.data_len + key_len("TList", "StreamerInfo", "") as u32;
        let end = w.pos() as u32;
        let mut data = w.into_inner();

        let (file_name, file_title) = ("test.root", "a test file");
        let nbytes_name = (key_len("TFile", file_name, file_title) as usize
            + tstring_len(file_name)
            + tstring_len(file_title)) as u32;
        let mut top = Writer::new();
        let mut dir = Writer::new();
        dir.tstring(file_name).tstring(file_title);
        Self::dir_header(&mut dir, BEGIN, lists[0].0, lists[0].1, nbytes_name);
        key_header(&mut top, "TFile", file_name, file_title, dir.pos() as u32, 1, BEGIN, dir.pos() as u32);
        top.raw(dir.bytes());

        let mut head = Writer::new();
        head.raw(b"root").i32(62206).u32(BEGIN);
        head.u32(end).u32(0).u32(0).i32(0).u32(nbytes_name).u8(4).u32(1);
        head.u32(info.seek_key).u32(nbytes_info);
        head.u16(1).raw(&[3u8; 16]);

        data[..head.pos()].copy_from_slice(head.bytes());
        let begin = BEGIN as usize;
        data[begin..begin + top.pos()].copy_from_slice(top.bytes());
        data
    }
}
