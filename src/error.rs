use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("couldn't parse stored value: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("couldn't serialize value: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("couldn't determine the project directories for this platform")]
    NoProjectDirs,
}
