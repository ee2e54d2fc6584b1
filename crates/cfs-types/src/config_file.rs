use std::fmt::Debug;
use std::io::Error as IoError;
use std::io::Write;
use std::path::Path;
use std::fs::{File, read_to_string};

use tracing::debug;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("config io error: {0}")]
    Io(#[from] IoError),
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config encode error: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// TOML backed configuration files
pub trait SaveLoadConfig: Sized {
    fn save_to<T: AsRef<Path>>(&self, path: T) -> Result<(), LoadConfigError>;

    fn load_from<T: AsRef<Path>>(path: T) -> Result<Self, LoadConfigError>;

    fn load_str(config: &str) -> Result<Self, LoadConfigError>;
}

impl<S> SaveLoadConfig for S
where
    S: Serialize + DeserializeOwned + Debug,
{
    fn save_to<T: AsRef<Path>>(&self, path: T) -> Result<(), LoadConfigError> {
        let path_ref = path.as_ref();
        debug!(?path_ref, "saving config");
        let toml = toml::to_string(self)?;

        let mut file = File::create(path_ref)?;
        file.write_all(toml.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn load_from<T: AsRef<Path>>(path: T) -> Result<Self, LoadConfigError> {
        let path_ref = path.as_ref();
        debug!(?path_ref, "loading config");
        let file_str = read_to_string(path_ref)?;
        Self::load_str(&file_str)
    }

    fn load_str(config: &str) -> Result<Self, LoadConfigError> {
        Ok(toml::from_str(config)?)
    }
}
