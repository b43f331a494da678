use crate::types::error::{Error, Result};
use std::path::PathBuf;

pub fn get_config_path() -> Result<PathBuf> {
    let config_path = dirs::config_dir().ok_or(Error::ConfigDirNotFound)?;
    Ok(config_path.join("pwctl"))
}
