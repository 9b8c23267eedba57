use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{RegistryError, Result};

/// Definition groups holding non-component definitions.
pub const EXCLUDED_GROUPS: [&str; 2] = ["relationships", "policies"];

/// Version label used when none is configured.
pub const DEFAULT_DEFINITION_VERSION: &str = "v1.0.0";

const COMPONENTS_DIR: &str = "components";

/// How version directories beneath a definition group are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// A single, known version label.
    Fixed(String),
    /// Every subdirectory of the definition group.
    Discover,
}

impl Default for VersionSelector {
    fn default() -> Self {
        VersionSelector::Fixed(DEFAULT_DEFINITION_VERSION.to_string())
    }
}

/// Validates the catalog root and makes it absolute.
pub fn resolve_root(path: &Path) -> Result<PathBuf> {
    let root = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let metadata = fs::metadata(&root).map_err(|_| RegistryError::MissingInput(root.clone()))?;
    if !metadata.is_dir() {
        return Err(RegistryError::NotADirectory(root));
    }
    Ok(root)
}

/// Locates the directory of a model, if present.
pub fn model_dir(root: &Path, model: &str) -> Option<PathBuf> {
    let path = root.join(model);
    path.is_dir().then_some(path)
}

/// A definition group directory of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionGroup {
    pub name: String,
    pub path: PathBuf,
}

/// Lists the definition groups of a model, skipping excluded groups and
/// plain files.
pub fn definition_groups(model_dir: &Path) -> Result<Vec<DefinitionGroup>> {
    let mut groups = Vec::new();
    for (name, path) in subdirectories(model_dir)? {
        if EXCLUDED_GROUPS.contains(&name.as_str()) {
            debug!(group = %name, "skipping excluded definition group");
            continue;
        }
        groups.push(DefinitionGroup { name, path });
    }
    Ok(groups)
}

/// A version directory of a definition group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir {
    pub label: String,
    pub path: PathBuf,
}

impl VersionDir {
    pub fn components_dir(&self) -> PathBuf {
        self.path.join(COMPONENTS_DIR)
    }

    /// Expected location of a component definition.
    ///
    /// The name must be a single path component, so a record can never
    /// address a file outside the components directory.
    pub fn component_path(&self, component: &str) -> Result<PathBuf> {
        if matches!(component.trim(), "" | "." | "..") || component.contains(['/', '\\', '\0']) {
            return Err(RegistryError::InvalidComponentName(component.to_string()));
        }
        Ok(self.components_dir().join(format!("{component}.json")))
    }

    /// Counts the component definitions present on disk.
    pub fn count_components(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.components_dir()) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .count()
    }
}

/// Resolves the version directories of a group.
///
/// A fixed label always yields one entry, even when the directory is absent,
/// so the group still shows up in the summary.
pub fn version_dirs(
    group: &DefinitionGroup,
    selector: &VersionSelector,
) -> Result<Vec<VersionDir>> {
    match selector {
        VersionSelector::Fixed(label) => {
            let path = group.path.join(label);
            if !path.is_dir() {
                warn!(path = %path.display(), "version directory not found");
            }
            Ok(vec![VersionDir {
                label: label.clone(),
                path,
            }])
        }
        VersionSelector::Discover => Ok(subdirectories(&group.path)?
            .into_iter()
            .map(|(label, path)| VersionDir { label, path })
            .collect()),
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        dirs.push((name, entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}
