use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{self, DefinitionGroup, VersionDir, VersionSelector};
use crate::config::{SourceConfig, UpdateOptions};
use crate::error::{RegistryError, Result};
use crate::io::sheet::{HttpSheetClient, SheetCredential};
use crate::io::source::{ComponentSource, GoogleSheet, LocalCsvDir};
use crate::logging::{self, LogSink};
use crate::model::{CatalogInput, ComponentDefinition, ComponentRecord, UpdateTracker};
use crate::store::ThreadSafeStore;
use crate::summary::{UpdateSummary, summarize};

/// Result of patching one component definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The definition on disk was rewritten.
    Updated,
    /// The patch produced identical bytes; nothing was written.
    Unchanged,
}

/// State of one update run over a catalog.
///
/// Per-model work only shares state through the tracker store.
#[derive(Debug)]
pub struct RunContext {
    catalog_root: PathBuf,
    versions: VersionSelector,
    trackers: ThreadSafeStore<Vec<UpdateTracker>>,
}

impl RunContext {
    /// Validates the catalog root; a missing root aborts the run.
    pub fn new(catalog_root: &Path, versions: VersionSelector) -> Result<Self> {
        let catalog_root = catalog::resolve_root(catalog_root)?;
        Ok(Self {
            catalog_root,
            versions,
            trackers: ThreadSafeStore::new(),
        })
    }

    pub fn catalog_root(&self) -> &Path {
        &self.catalog_root
    }

    pub fn trackers(&self) -> &ThreadSafeStore<Vec<UpdateTracker>> {
        &self.trackers
    }

    /// Applies every record onto the catalog.
    ///
    /// Failures below the model level are logged and skipped.
    #[instrument(level = "info", skip_all, fields(root = %self.catalog_root.display()))]
    pub fn apply(&self, input: &CatalogInput) {
        for (registrant, models) in input.registrants() {
            if registrant.is_empty() {
                debug!(models = models.len(), "skipping records without registrant");
                continue;
            }
            for (model, records) in models {
                self.update_model(model, records);
            }
        }
    }

    /// Updates one model and stores its trackers.
    ///
    /// A model without a directory under the root records nothing.
    pub fn update_model(&self, model: &str, records: &[ComponentRecord]) {
        let Some(model_path) = catalog::model_dir(&self.catalog_root, model) else {
            warn!("no models found corresponding to {model}");
            return;
        };
        info!(%model, path = %model_path.display(), "starting to update components of model");

        let groups = match catalog::definition_groups(&model_path) {
            Ok(groups) => groups,
            Err(error) => {
                error!(%model, %error, "failed to list model contents");
                return;
            }
        };

        let mut trackers = Vec::new();
        for group in &groups {
            trackers.extend(self.update_group(model, group, records));
        }
        self.trackers.set(model, trackers);
    }

    fn update_group(
        &self,
        model: &str,
        group: &DefinitionGroup,
        records: &[ComponentRecord],
    ) -> Vec<UpdateTracker> {
        match catalog::version_dirs(group, &self.versions) {
            Ok(versions) => versions
                .iter()
                .map(|version| update_version(model, version, records))
                .collect(),
            Err(error) => {
                error!(%model, group = %group.name, %error, "failed to list versions");
                Vec::new()
            }
        }
    }
}

fn update_version(model: &str, version: &VersionDir, records: &[ComponentRecord]) -> UpdateTracker {
    let total_components = version.count_components();
    let mut total_updated = 0;

    if version.path.is_dir() {
        info!(
            %model,
            version = %version.label,
            path = %version.path.display(),
            "looking for components"
        );
        for record in records {
            match apply_record(record, version) {
                Ok(PatchOutcome::Updated) => {
                    total_updated += 1;
                    info!(%model, component = %record.component, "component updated");
                }
                Ok(PatchOutcome::Unchanged) => {
                    info!(%model, component = %record.component, "no changes detected");
                }
                Err(error) => {
                    let error = RegistryError::component(model, &record.component, error);
                    error!(%error);
                }
            }
        }
    }

    UpdateTracker {
        total_components,
        total_updated,
        version: version.label.clone(),
    }
}

/// Patches one component definition and rewrites it only when it changes.
///
/// A patch that leaves the parsed document equal is a no-op and never
/// touches the file. Otherwise the candidate is staged in a uniquely named
/// temporary file next to the target, removed on every return path, and
/// written back only when its bytes differ.
pub fn apply_record(record: &ComponentRecord, version: &VersionDir) -> Result<PatchOutcome> {
    let path = version.component_path(&record.component)?;
    let existing = fs::read(&path)?;

    let mut definition = ComponentDefinition::from_slice(&existing)?;
    let original = definition.document.clone();
    record.apply_to(&mut definition)?;
    if definition.document == original {
        debug!(
            kind = definition.kind().unwrap_or(&record.component),
            "patch leaves definition unchanged"
        );
        return Ok(PatchOutcome::Unchanged);
    }

    let mut staged = tempfile::Builder::new()
        .prefix(&format!(".{}.", record.component))
        .suffix(".json.tmp")
        .tempfile_in(version.components_dir())?;
    staged.write_all(&definition.to_vec()?)?;
    staged.flush()?;

    let rendered = fs::read(staged.path())?;
    if rendered == existing {
        debug!(
            kind = definition.kind().unwrap_or(&record.component),
            "definition unchanged"
        );
        return Ok(PatchOutcome::Unchanged);
    }

    fs::write(&path, &rendered)?;
    Ok(PatchOutcome::Updated)
}

/// Applies parsed input and produces the run summary.
pub fn update_registry(context: &RunContext, input: &CatalogInput) -> UpdateSummary {
    context.apply(input);
    let summary = summarize(context.trackers());
    summary.log();
    summary
}

/// Builds the component source selected by the options.
pub fn build_source(options: &UpdateOptions) -> Result<Box<dyn ComponentSource>> {
    match &options.source {
        SourceConfig::CsvDir(dir) => {
            info!(dir = %dir.display(), "using local CSV directory");
            Ok(Box::new(LocalCsvDir::new(dir.clone(), options.model.clone())))
        }
        SourceConfig::Spreadsheet { id, credential } => {
            info!(spreadsheet = %id, "using Google Sheet");
            let client = HttpSheetClient::new(SheetCredential::decode(credential)?)?;
            Ok(Box::new(GoogleSheet::new(
                id.clone(),
                client,
                options.model.clone(),
            )))
        }
    }
}

/// Runs a complete update: validate, parse, apply, summarize.
///
/// Log output goes to the run log while the catalog is processed and returns
/// to stdout afterwards, including on failure.
#[instrument(level = "info", skip_all, fields(input = %options.input.display()))]
pub fn run_update(options: &UpdateOptions, sink: &LogSink) -> Result<UpdateSummary> {
    let context = RunContext::new(&options.input, options.versions.clone())?;
    debug!(root = %context.catalog_root().display(), "input directory check completed");

    let (log_file, log_path) = logging::create_run_log(&options.log_dir)?;
    debug!(path = %log_path.display(), "run log created");

    let source = build_source(options)?;
    run_with_source(&context, source.as_ref(), sink, log_file, &options.log_dir)
}

/// Runs an update against an already constructed source.
pub fn run_with_source(
    context: &RunContext,
    source: &dyn ComponentSource,
    sink: &LogSink,
    log_file: fs::File,
    log_dir: &Path,
) -> Result<UpdateSummary> {
    let input = source.parse().inspect_err(|error| error!(%error))?;
    info!(records = input.record_count(), "component source parsed");

    let summary = {
        let _redirect = sink.redirect(log_file);
        update_registry(context, &input)
    };

    info!(
        "Updated {} models and {} components",
        summary.models, summary.total_updated
    );
    info!("refer {} for detailed registry update logs", log_dir.display());
    Ok(summary)
}
