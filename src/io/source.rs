use std::fs;
use std::path::PathBuf;

use tracing::{error, info, instrument};

use crate::error::{RegistryError, Result, SourceFailure};
use crate::io::csv_read::{self, COMPONENTS_SHEET};
use crate::io::sheet::SheetClient;
use crate::merge::merge_all;
use crate::model::CatalogInput;

/// A curated source of component metadata.
pub trait ComponentSource {
    /// Reads the source into normalized catalog input.
    fn parse(&self) -> Result<CatalogInput>;
}

/// Every `.csv` file directly inside a directory.
#[derive(Debug, Clone)]
pub struct LocalCsvDir {
    dir: PathBuf,
    model_filter: Option<String>,
}

impl LocalCsvDir {
    pub fn new(dir: impl Into<PathBuf>, model_filter: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            model_filter,
        }
    }

    fn csv_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ComponentSource for LocalCsvDir {
    /// Parses every file even when some fail; failures are reported together.
    #[instrument(level = "info", skip_all, fields(dir = %self.dir.display()))]
    fn parse(&self) -> Result<CatalogInput> {
        let mut parsed = Vec::new();
        let mut failures = Vec::new();

        for path in self.csv_files()? {
            match csv_read::read_components_file(&path, self.model_filter.as_deref()) {
                Ok(input) => {
                    info!(
                        path = %path.display(),
                        records = input.record_count(),
                        "parsed components file"
                    );
                    parsed.push(input);
                }
                Err(error) => {
                    error!(path = %path.display(), %error, "failed to parse components file");
                    failures.push(SourceFailure { path, error });
                }
            }
        }

        if !failures.is_empty() {
            return Err(RegistryError::ParseFailures(failures));
        }
        Ok(merge_all(parsed))
    }
}

/// The "Components" worksheet of a remote spreadsheet.
pub struct GoogleSheet<C> {
    spreadsheet_id: String,
    client: C,
    model_filter: Option<String>,
}

impl<C: SheetClient> GoogleSheet<C> {
    pub fn new(spreadsheet_id: impl Into<String>, client: C, model_filter: Option<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            client,
            model_filter,
        }
    }
}

impl<C: SheetClient> ComponentSource for GoogleSheet<C> {
    /// Any failure while fetching or parsing fails the whole source.
    #[instrument(level = "info", skip_all, fields(spreadsheet = %self.spreadsheet_id))]
    fn parse(&self) -> Result<CatalogInput> {
        let metadata = self.client.fetch_metadata(&self.spreadsheet_id)?;
        let sheet_id = metadata
            .sheet_id(COMPONENTS_SHEET)
            .ok_or_else(|| RegistryError::MissingSheet(COMPONENTS_SHEET.to_string()))?;

        let data = self.client.export_csv(&self.spreadsheet_id, sheet_id)?;
        let input = csv_read::read_components(data.as_slice(), self.model_filter.as_deref())?;
        info!(
            registrants = input.registrants().count(),
            records = input.record_count(),
            "parsed components sheet"
        );
        Ok(input)
    }
}
