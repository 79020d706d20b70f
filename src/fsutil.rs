use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Error that occurs when reading an opened file fails.
#[derive(Debug, thiserror::Error)]
pub enum FileReadError {
    #[error(transparent)]
    Open(#[from] FileOpenError),
    #[error("failed to read file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cgroup_metrics_validator::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountinfo")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads the whole file into a string, treating a missing file as `Ok(None)`.
///
/// Cgroup controller files disappear whenever a controller is disabled or not
/// delegated, so absence is an expected outcome rather than a failure.
///
/// # Errors
///
/// Returns a [`FileReadError`] for any I/O failure other than [`io::ErrorKind::NotFound`].
pub fn read_optional_to_string(path: impl AsRef<Path>) -> Result<Option<String>, FileReadError> {
    let path = path.as_ref();
    let mut reader = match open_file_reader(path) {
        Ok(reader) => reader,
        Err(err) if err.source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|source| FileReadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(contents))
}
