use std::{fs, io, path::Path, path::PathBuf, sync::Arc};

use itertools::Itertools;
use tracing::debug;

/// A seed input provided before the run begins. Used verbatim as a test case
/// and as the base buffer for every mutation stage.
#[derive(Debug, Clone)]
pub struct Example {
    pub path: PathBuf,
    pub data: Arc<[u8]>,
    /// Extension including the leading dot, or empty. Only used to name
    /// persisted findings.
    pub file_extension: String,
}

impl Example {
    pub fn from_file(path: PathBuf) -> io::Result<Self> {
        let data = fs::read(&path)?;
        let file_extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Ok(Self {
            path,
            data: data.into(),
            file_extension,
        })
    }

    /// Loads every regular file directly under `directory`, sorted by name.
    ///
    /// Findings folders accumulate under the same root across runs; they are
    /// directories and get skipped here.
    pub fn load_all(directory: &Path) -> io::Result<Vec<Self>> {
        let mut paths: Vec<_> = fs::read_dir(directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        let examples: Vec<_> = paths.into_iter().map(Self::from_file).try_collect()?;
        for example in &examples {
            debug!(path = %example.path.display(), bytes = example.data.len(), "Loaded example");
        }
        Ok(examples)
    }
}

/// One input to feed the target, labelled with the stage that produced it.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub data: Vec<u8>,
    /// Extension (with leading dot) used to name a persisted finding.
    pub file_extension: String,
    /// `Some` iff this is an unmutated example. Crashes on seed inputs are
    /// not worth recording; this field suppresses them.
    pub source_file: Option<PathBuf>,
    /// Name of the producing stage.
    pub stage: Arc<str>,
}
