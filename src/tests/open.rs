use super::read;
use crate::core::error::RootError;
use crate::core::file::{FileObject, RootFile};
use crate::core::options::OpenOptions;
use crate::core::value::Value;
use crate::test_utils::{FileBuilder, Writer};

fn objstring(s: &str) -> Vec<u8> {
    let mut w = Writer::new();
    w.tobjstring(s);
    w.into_inner()
}

fn unknown_record() -> Vec<u8> {
    let mut w = Writer::new();
    let at = w.begin_record(3);
    w.raw(&[0x11; 40]);
    w.end_record(at);
    w.into_inner()
}

#[test]
fn header_only_file_is_empty() {
    let file = RootFile::new(FileBuilder::empty()).unwrap();
    assert!(file.header().is_empty());
    assert!(file.keys().is_empty());
    assert!(file.streamer_infos().is_empty());
    assert!(file.streamer_list().is_none());
}

#[test]
fn keys_of_the_top_directory() {
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "hpx", "TH1F", unknown_record());
    fb.object(FileBuilder::TOP_DIR, "note", "TObjString", objstring("hello"));
    let file = RootFile::new(fb.finish()).unwrap();
    assert_eq!(file.header().version, 62206);
    assert_eq!(file.root_directory().title, "a test file");
    let names: Vec<_> = file.keys().iter().map(|k| k.name.as_str()).collect();
    assert_eq!(names, vec!["hpx", "note", "StreamerInfo"]);
    assert_eq!(file.keys()[0].class_name, "TH1F");
    assert!(file.streamer_list().is_some());
}

#[test]
fn class_without_schema_fails_but_sibling_decodes() {
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "hpx", "TH1F", unknown_record());
    fb.object(FileBuilder::TOP_DIR, "note", "TObjString", objstring("hello"));
    let mut file = RootFile::new(fb.finish()).unwrap();
    match file.read_object("hpx", None) {
        Err(RootError::UnresolvedClass(class)) => assert_eq!(class, "TH1F"),
        other => panic!("unexpected {:?}", other),
    }
    let note = read(&mut file, "note");
    assert_eq!(note.class_name(), "TObjString");
    assert_eq!(note.root().get_str("fString"), Some("hello"));
    assert!(note.issues().is_empty());
}

#[test]
fn missing_paths_are_none() {
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "note", "TObjString", objstring("hello"));
    let mut file = RootFile::new(fb.finish()).unwrap();
    assert!(file.read_object("nothing", None).unwrap().is_none());
    assert!(file.read_object("no/such/thing", None).unwrap().is_none());
    assert!(file.read_object("note", Some(2)).unwrap().is_none());
}

#[test]
fn cycles_select_between_versions() {
    let mut fb = FileBuilder::new();
    fb.object_cycle(FileBuilder::TOP_DIR, "h", "TObjString", 1, objstring("first"));
    fb.object_cycle(FileBuilder::TOP_DIR, "h", "TObjString", 2, objstring("second"));
    let mut file = RootFile::new(fb.finish()).unwrap();
    assert_eq!(read(&mut file, "h").root().get_str("fString"), Some("first"));
    assert_eq!(read(&mut file, "/h;2").root().get_str("fString"), Some("second"));
    match file.read_object("h", Some(2)).unwrap() {
        Some(FileObject::Object(obj)) => assert_eq!(obj.root().get_str("fString"), Some("second")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn compressed_payload_is_inflated() {
    let text = "abc".repeat(700);
    let mut fb = FileBuilder::new();
    fb.compressed_object(FileBuilder::TOP_DIR, "long", "TObjString", objstring(&text));
    let mut file = RootFile::new(fb.finish()).unwrap();
    assert!(file.keys()[0].is_compressed().unwrap());
    let obj = read(&mut file, "long");
    assert_eq!(obj.root().get_str("fString"), Some(text.as_str()));
}

#[test]
fn sub_directories_load_on_demand() {
    let mut fb = FileBuilder::new();
    let sub = fb.directory(FileBuilder::TOP_DIR, "sub");
    let deeper = fb.directory(sub, "deeper");
    fb.object(sub, "inner", "TObjString", objstring("in sub"));
    fb.object(deeper, "leaf", "TObjString", objstring("in deeper"));
    let mut file = RootFile::new(fb.finish()).unwrap();
    assert!(file.directories().is_empty());

    let inner = read(&mut file, "sub/inner");
    assert_eq!(inner.root().get_str("fString"), Some("in sub"));
    assert_eq!(file.directories().len(), 1);
    assert_eq!(file.directories()[0].path, "sub");

    let leaf = read(&mut file, "sub/deeper/leaf");
    assert_eq!(leaf.root().get_str("fString"), Some("in deeper"));
    assert_eq!(file.directories().len(), 2);

    let dir = file.read_directory("sub/deeper", None).unwrap().unwrap();
    assert_eq!(dir.path, "sub/deeper");
    assert_eq!(dir.keys.len(), 1);
    assert!(dir.find_key("leaf", 1).is_some());
    assert_eq!(file.directories().len(), 2);
    assert!(file.read_object("sub/missing", None).unwrap().is_none());
}

#[test]
fn streamer_infos_can_be_skipped() {
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "note", "TObjString", objstring("hello"));
    let mut opts = OpenOptions::new();
    opts.read_streamer_infos(false);
    let mut file = opts.open(fb.finish()).unwrap();
    assert!(file.streamer_list().is_none());
    assert_eq!(file.keys().last().map(|k| k.name.as_str()), Some("StreamerInfo"));
    assert_eq!(read(&mut file, "note").root().get_str("fString"), Some("hello"));
}

#[test]
fn oversized_objects_are_refused() {
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "big", "TObjString", objstring(&"z".repeat(500)));
    let mut opts = OpenOptions::new();
    opts.max_object_len(100);
    let mut file = opts.open(fb.finish()).unwrap();
    assert!(matches!(
        file.read_object("big", None),
        Err(RootError::Format(_))
    ));
}

#[test]
fn framing_mismatch_is_recovered_unless_strict() {
    let mut w = Writer::new();
    let at = w.begin_record(1);
    w.tobject().tstring("padded").raw(&[0; 3]);
    w.end_record(at);
    let mut fb = FileBuilder::new();
    fb.object(FileBuilder::TOP_DIR, "s", "TObjString", w.into_inner());
    let bytes = fb.finish();

    let mut lenient = RootFile::new(bytes.clone()).unwrap();
    let obj = read(&mut lenient, "s");
    assert_eq!(obj.root().get("fString"), Some(&Value::Str("padded".into())));
    assert!(matches!(
        obj.issues()[0],
        RootError::FramingMismatch { expected: 20, consumed: 17, .. }
    ));

    let mut opts = OpenOptions::new();
    opts.strict_framing(true);
    let mut strict = opts.open(bytes).unwrap();
    assert!(matches!(
        strict.read_object("s", None),
        Err(RootError::FramingMismatch { .. })
    ));
}
