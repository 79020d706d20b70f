mod error;
mod parser;
mod topology;

pub use error::{Error, Result};
pub use parser::{MountInfo, MountInfoField, ParseError, parse_mount_info_line};
pub use topology::{MountEntry, parse_mount_entries, read_mount_entries};
