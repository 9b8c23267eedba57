use std::path::PathBuf;

use crate::catalog::VersionSelector;
use crate::error::{RegistryError, Result};

/// Where curated component metadata is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Directory of CSV exports.
    CsvDir(PathBuf),
    /// Live spreadsheet with its base64 encoded credential.
    Spreadsheet { id: String, credential: String },
}

/// Validated parameters of one update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Catalog root holding one directory per model.
    pub input: PathBuf,
    pub source: SourceConfig,
    /// Restricts the run to a single model.
    pub model: Option<String>,
    pub versions: VersionSelector,
    /// Directory receiving the run log.
    pub log_dir: PathBuf,
}

/// Unvalidated parameters as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub input: PathBuf,
    pub csv_dir: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub spreadsheet_cred: Option<String>,
    pub model: Option<String>,
    pub definition_version: Option<String>,
    pub discover_versions: bool,
    pub log_dir: Option<PathBuf>,
}

impl UpdateOptions {
    /// Checks the parameter combination.
    ///
    /// A CSV directory wins over spreadsheet settings; without one, the
    /// spreadsheet id and credential are both required.
    pub fn new(raw: RawOptions) -> Result<Self> {
        let spreadsheet_id = non_empty(raw.spreadsheet_id);
        let spreadsheet_cred = non_empty(raw.spreadsheet_cred);

        let source = match (raw.csv_dir, spreadsheet_id, spreadsheet_cred) {
            (Some(dir), _, _) if !dir.as_os_str().is_empty() => SourceConfig::CsvDir(dir),
            (_, Some(id), Some(credential)) => SourceConfig::Spreadsheet { id, credential },
            _ => {
                return Err(RegistryError::Config(
                    "please provide a CSV directory or both spreadsheet-id and spreadsheet-cred"
                        .into(),
                ));
            }
        };

        let versions = if raw.discover_versions {
            VersionSelector::Discover
        } else {
            match non_empty(raw.definition_version) {
                Some(label) => VersionSelector::Fixed(label),
                None => VersionSelector::default(),
            }
        };

        let log_dir = match raw.log_dir {
            Some(dir) => dir,
            None => default_log_dir()?,
        };

        Ok(Self {
            input: raw.input,
            source,
            model: non_empty(raw.model),
            versions,
            log_dir,
        })
    }
}

/// `$HOME/.meshery/logs/registry`.
pub fn default_log_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RegistryError::Config("cannot determine home directory".into()))?;
    Ok(home.join(".meshery").join("logs").join("registry"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
