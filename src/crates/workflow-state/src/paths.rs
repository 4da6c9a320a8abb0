//! Well-known locations of persisted workflow state

use crate::error::{Result, StateError};
use std::path::{Path, PathBuf};

/// Directory holding workflow state, inside the project or the home directory
pub const WELL_KNOWN_DIR_NAME: &str = ".mobile-native";

pub const DEFAULT_STATE_FILE: &str = "workflow-state.json";

pub const DEFAULT_DATABASE_FILE: &str = "workflow-state.db";

/// `<project_path>/.mobile-native` when a project is given, else `~/.mobile-native`.
///
/// Nothing is created here; persistence creates the directory on first write.
pub fn well_known_dir(project_path: Option<&Path>) -> Result<PathBuf> {
    let base = match project_path {
        Some(project) => project.to_path_buf(),
        None => dirs::home_dir()
            .ok_or_else(|| StateError::Config("Cannot determine home directory".to_string()))?,
    };
    Ok(base.join(WELL_KNOWN_DIR_NAME))
}
