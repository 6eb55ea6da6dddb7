use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model files not found under {}: {}", base_dir.display(), missing.join(", "))]
    Missing {
        base_dir: PathBuf,
        missing: Vec<String>,
    },
    #[error("models directory {0} does not exist")]
    NoModelsDir(PathBuf),
    #[error("could not determine default models directory")]
    NoDataDir,
}

/// Platform-specific default models directory.
///
/// - macOS: `~/Library/Application Support/FaceCloak/models/`
/// - Linux: `$XDG_DATA_HOME/FaceCloak/models/` or `~/.local/share/FaceCloak/models/`
/// - Windows: `%APPDATA%/FaceCloak/models/`
pub fn default_models_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoDataDir)
}

/// Searches `base_dir` recursively for a file called `name`.
///
/// Unreadable subdirectories are skipped. When several files match, the
/// shallowest one wins; ties go to the lexicographically first path so the
/// result does not depend on directory iteration order.
pub fn find_in_dir(base_dir: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(base_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_str() == Some(name))
        .min_by_key(|e| e.depth())
        .map(|e| e.into_path())
}

/// Resolves every file in `names`, failing with the full list of missing
/// names if any is absent. Paths are returned in the order requested.
pub fn resolve_all(base_dir: &Path, names: &[&str]) -> Result<Vec<PathBuf>, ModelResolveError> {
    if !base_dir.is_dir() {
        return Err(ModelResolveError::NoModelsDir(base_dir.to_path_buf()));
    }

    let mut found = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match find_in_dir(base_dir, name) {
            Some(path) => {
                log::debug!("Resolved {name} -> {}", path.display());
                found.push(path);
            }
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(ModelResolveError::Missing {
            base_dir: base_dir.to_path_buf(),
            missing,
        })
    }
}
