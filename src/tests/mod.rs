mod open;

use crate::core::file::{FileObject, RootFile};
use crate::core::value::DecodedObject;

fn read(file: &mut RootFile, path: &str) -> DecodedObject {
    match file.read_object(path, None).unwrap() {
        Some(FileObject::Object(obj)) => obj,
        other => panic!("expected an object at `{}`, got {:?}", path, other),
    }
}
