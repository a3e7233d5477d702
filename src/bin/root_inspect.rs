//! Print the header, keys and schemas of a ROOT file, and optionally one decoded object.
//!
//! Usage: `root_inspect <file> [object path[;cycle]]`. Set `RUST_LOG=debug` to trace reads.
use std::env;
use std::path::Path;

use failure::format_err;
use rootreader::{FileObject, RootFile, Source};
use tracing_subscriber::EnvFilter;

// ROOT file format
// from https://github.com/root-project/root/blob/master/io/io/src/TFile.cxx
// Byte Range      | Record Name | Description
// ----------------|-------------|------------
// 1->4            | "root"      | Root file identifier
// 5->8            | fVersion    | File format version
// 9->12           | fBEGIN      | Pointer to first data record
// 13->16 [13->20] | fEND        | Pointer to first free word at the EOF
// 17->20 [21->28] | fSeekFree   | Pointer to FREE data record
// 21->24 [29->32] | fNbytesFree | Number of bytes in FREE data record
// 25->28 [33->36] | nfree       | Number of free data records
// 29->32 [37->40] | fNbytesName | Number of bytes in TNamed at creation time
// 33->33 [41->41] | fUnits      | Number of bytes for file pointers
// 34->37 [42->45] | fCompress   | Compression level and algorithm
// 38->41 [46->53] | fSeekInfo   | Pointer to TStreamerInfo record
// 42->45 [54->57] | fNbytesInfo | Number of bytes in TStreamerInfo record
// 46->63 [58->75] | fUUID       | Universal Unique ID

// The key structure is as follows; if a key is located past the 32 bit file
// limit (> 2 GB) then some fields will be 8 instead of 4 bytes (see parts marked
// with square brackets below):

// Byte Range      | Member Name | Description
// ----------------|-----------|--------------
// 1->4            | Nbytes    | Length of compressed object (in bytes)
// 5->6            | Version   | TKey version identifier
// 7->10           | ObjLen    | Length of uncompressed object
// 11->14          | Datime    | Date and time when object was written to file
// 15->16          | KeyLen    | Length of the key structure (in bytes)
// 17->18          | Cycle     | Cycle of key
// 19->22 [19->26] | SeekKey   | Pointer to record itself (consistency check)
// 23->26 [27->34] | SeekPdir  | Pointer to directory header
// 27->27 [35->35] | lname     | Number of bytes in the class name
// 28->.. [36->..] | ClassName | Object Class Name
// ..->..          | lname     | Number of bytes in the object name
// ..->..          | Name      | lName bytes with the name of the object
// ..->..          | lTitle    | Number of bytes in the object title
// ..->..          | Title     | Title of the object
// ----->          | DATA      | Data bytes associated to the object

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), failure::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let filename = args
        .get(1)
        .ok_or_else(|| format_err!("usage: root_inspect <file> [object path]"))?;
    let path = Path::new(filename);
    println!("Opening file: {}", filename);
    let source = match Source::mmap(path) {
        Ok(source) => source,
        Err(err) => {
            tracing::warn!(error = %err, "cannot map file, reading it on demand");
            Source::new(path)
        }
    };
    let mut rf = RootFile::new(source)?;

    let header = rf.header();
    println!(
        "version {}, begin {}, end {}, compression {}",
        header.version, header.begin, header.end, header.compression
    );
    println!("keys:");
    for key in rf.keys() {
        println!("  {}", key);
    }

    let mut yaml = String::new();
    rf.streamer_info_as_yaml(&mut yaml)?;
    if !yaml.is_empty() {
        println!("streamer infos:\n{}", yaml);
    }

    if let Some(obj_path) = args.get(2) {
        match rf.read_object(obj_path, None)? {
            Some(FileObject::Object(obj)) => {
                println!("{}", obj);
                for issue in obj.issues() {
                    println!("issue: {}", issue);
                }
            }
            Some(FileObject::Directory(dir)) => {
                println!("directory {} ({} keys):", dir.path, dir.keys.len());
                for key in &dir.keys {
                    println!("  {}", key);
                }
            }
            None => return Err(format_err!("{} not found in {}", obj_path, filename)),
        }
    }
    Ok(())
}

// dummy main for wasm
#[cfg(target_arch = "wasm32")]
fn main() {}
