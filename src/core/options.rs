use crate::core::data_source::Source;
use crate::core::error::Result;
use crate::core::file::RootFile;

/// Runtime knobs for opening a file.
///
/// ```no_run
/// use rootreader::OpenOptions;
///
/// let file = OpenOptions::new()
///     .strict_framing(true)
///     .max_depth(64)
///     .open(std::path::Path::new("hsimple.root"))
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub(crate) strict_framing: bool,
    pub(crate) max_object_len: u64,
    pub(crate) max_depth: usize,
    pub(crate) read_streamer_infos: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            strict_framing: false,
            max_object_len: 1 << 30,
            max_depth: 256,
            read_streamer_infos: true,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail a decode on the first byte-count mismatch instead of realigning.
    pub fn strict_framing(&mut self, yes: bool) -> &mut Self {
        self.strict_framing = yes;
        self
    }

    /// Largest uncompressed object a key may declare.
    pub fn max_object_len(&mut self, len: u64) -> &mut Self {
        self.max_object_len = len;
        self
    }

    /// Deepest nesting of objects within one decode.
    pub fn max_depth(&mut self, depth: usize) -> &mut Self {
        self.max_depth = depth;
        self
    }

    /// Skip loading the streamer-info list; only hardcoded classes can then be decoded.
    pub fn read_streamer_infos(&mut self, yes: bool) -> &mut Self {
        self.read_streamer_infos = yes;
        self
    }

    pub fn open<S: Into<Source>>(&self, source: S) -> Result<RootFile> {
        RootFile::with_options(source, self.clone())
    }
}
