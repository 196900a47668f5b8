use std::{
    error::Error,
    fmt::Display,
    fs::read_to_string,
    path::{Path, PathBuf},
};

pub mod nbo;
pub mod orca;
pub mod respect;

#[derive(Debug, PartialEq, Eq)]
pub enum ExtractError {
    FileNotFound(String),
    ReadFileError(String, std::io::ErrorKind),
    WriteFileError(String, std::io::ErrorKind),
    /// a section marker the format guarantees never appeared
    MissingSection(String, &'static str),
    /// NORMAL MODES blocks with mismatched row counts
    InconsistentModes(String),
    /// the side-input table is unusable (missing filename column)
    BadTable(String),
    /// a reference config file failed to parse
    BadConfig(String),
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for ExtractError {}

/// read `path` to a string, mapping io errors onto [`ExtractError`]
pub fn read_out(path: impl AsRef<Path>) -> Result<String, ExtractError> {
    let path = path.as_ref();
    read_to_string(path).map_err(|e| {
        let name = path.display().to_string();
        match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound(name),
            k => ExtractError::ReadFileError(name, k),
        }
    })
}

/// collect the regular files in `dir` whose names satisfy `keep`, sorted by
/// name so the output row order doesn't depend on the filesystem
pub(crate) fn files_in(
    dir: impl AsRef<Path>,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, ExtractError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        let name = dir.display().to_string();
        match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound(name),
            k => ExtractError::ReadFileError(name, k),
        }
    })?;
    let mut ret: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .map(|f| keep(&f.to_string_lossy()))
                    .unwrap_or(false)
        })
        .collect();
    ret.sort();
    Ok(ret)
}

/// the file name (with extension) of `path` as an owned String
pub(crate) fn basename(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_default()
}
