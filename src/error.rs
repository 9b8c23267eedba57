use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Error type covering the failure cases of a registry update run: reading
/// the component source, walking the catalog, and patching definitions.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a CSV row cannot be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the HTTP client talking to the spreadsheet service.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when the spreadsheet credential is not valid base64.
    #[error("invalid spreadsheet credential: {0}")]
    Credential(#[from] base64::DecodeError),

    /// Raised when the run parameters are missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input path not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a path that must be a directory is something else.
    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Raised when a component sheet lacks one of the identifying columns.
    #[error("missing required column '{column}' in components sheet")]
    MissingColumn { column: &'static str },

    /// Aggregate of every source file that failed to parse.
    #[error("{}", ParseFailuresDisplay(.0))]
    ParseFailures(Vec<SourceFailure>),

    /// Raised when the spreadsheet service answers with a non-success status.
    #[error("failed to get google sheet: status {status}")]
    SheetStatus { status: u16 },

    /// Raised when the spreadsheet has no worksheet with the requested title.
    #[error("spreadsheet has no worksheet named '{0}'")]
    MissingSheet(String),

    /// Raised when a patch field cannot be applied onto a definition.
    #[error("cannot patch field '{field}': {reason}")]
    Patch { field: String, reason: String },

    /// Raised when a component definition is not a JSON object.
    #[error("invalid component definition: {0}")]
    InvalidDefinition(String),

    /// Component name that cannot be used as a file name.
    #[error("invalid component name '{0}'")]
    InvalidComponentName(String),

    /// Per-component failure with the identity of the component attached.
    #[error("failed to update component {component} of model {model}: {source}")]
    Component {
        model: String,
        component: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// Raised when the tracing subscriber or the run log fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl RegistryError {
    /// Attaches the component identity to a lower level failure.
    pub fn component(model: &str, component: &str, source: RegistryError) -> Self {
        RegistryError::Component {
            model: model.to_string(),
            component: component.to_string(),
            source: Box::new(source),
        }
    }
}

/// One source file that could not be parsed.
#[derive(Debug)]
pub struct SourceFailure {
    pub path: PathBuf,
    pub error: RegistryError,
}

struct ParseFailuresDisplay<'a>(&'a [SourceFailure]);

impl fmt::Display for ParseFailuresDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} source file(s)", self.0.len())?;
        for failure in self.0 {
            write!(f, "\n  {}: {}", failure.path.display(), failure.error)?;
        }
        Ok(())
    }
}
