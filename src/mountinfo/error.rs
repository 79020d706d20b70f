use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] fsutil::FileReadError),
    #[error("mountinfo file `{path}` does not exist")]
    Missing { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
