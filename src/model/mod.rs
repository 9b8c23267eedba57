mod json;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::error::{RegistryError, Result};
use json::HtmlEscaping;

/// One row of curated component metadata.
///
/// The identifying columns select the definition on disk; every other column
/// is a patch field keyed by its header. Records are immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub registrant: String,
    pub model: String,
    pub component: String,
    /// Header → raw cell text, in column order.
    pub fields: Vec<(String, String)>,
}

impl ComponentRecord {
    /// Creates a record without patch fields.
    pub fn new(
        registrant: impl Into<String>,
        model: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self {
            registrant: registrant.into(),
            model: model.into(),
            component: component.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a patch field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Applies the non-empty patch fields onto the definition.
    ///
    /// Dotted keys address nested objects, creating missing intermediates.
    /// Empty cells leave the existing value untouched.
    pub fn apply_to(&self, definition: &mut ComponentDefinition) -> Result<()> {
        for (key, raw) in &self.fields {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            set_path(&mut definition.document, key, cell_to_value(raw))?;
        }
        Ok(())
    }
}

fn set_path(document: &mut Value, key: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = key.split('.').map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(RegistryError::Patch {
            field: key.to_string(),
            reason: "empty path segment".into(),
        });
    }

    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };

    let mut cursor = document;
    for segment in parents {
        let object = cursor.as_object_mut().ok_or_else(|| RegistryError::Patch {
            field: key.to_string(),
            reason: format!("'{segment}' is not inside an object"),
        })?;
        cursor = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let object = cursor.as_object_mut().ok_or_else(|| RegistryError::Patch {
        field: key.to_string(),
        reason: format!("parent of '{last}' is not an object"),
    })?;
    object.insert(last.to_string(), value);
    Ok(())
}

fn cell_to_value(raw: &str) -> Value {
    if raw.starts_with('{') || raw.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
            return parsed;
        }
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

/// Normalized source input: registrant → model → records in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogInput {
    registrants: BTreeMap<String, BTreeMap<String, Vec<ComponentRecord>>>,
}

impl CatalogInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record under its registrant and model.
    pub fn push(&mut self, record: ComponentRecord) {
        self.registrants
            .entry(record.registrant.clone())
            .or_default()
            .entry(record.model.clone())
            .or_default()
            .push(record);
    }

    /// Appends a batch of records for one (registrant, model) pair.
    pub fn extend(&mut self, registrant: &str, model: &str, records: Vec<ComponentRecord>) {
        self.registrants
            .entry(registrant.to_string())
            .or_default()
            .entry(model.to_string())
            .or_default()
            .extend(records);
    }

    /// Records for one (registrant, model) pair, empty when unknown.
    pub fn records(&self, registrant: &str, model: &str) -> &[ComponentRecord] {
        self.registrants
            .get(registrant)
            .and_then(|models| models.get(model))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterates registrants with their model maps in sorted order.
    pub fn registrants(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeMap<String, Vec<ComponentRecord>>)> {
        self.registrants.iter()
    }

    pub fn into_registrants(
        self,
    ) -> impl Iterator<Item = (String, BTreeMap<String, Vec<ComponentRecord>>)> {
        self.registrants.into_iter()
    }

    /// Total number of records across all registrants and models.
    pub fn record_count(&self) -> usize {
        self.registrants
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}

/// Layout of a definition file, kept so unchanged documents re-serialize to
/// the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLayout {
    /// Indent unit of a pretty printed file, `None` when compact.
    pub indent: Option<Vec<u8>>,
    pub trailing_newline: bool,
}

impl JsonLayout {
    /// Infers the layout from existing file contents.
    ///
    /// The indent unit is the whitespace opening the second line; a pretty
    /// file without one falls back to two spaces.
    pub fn detect(bytes: &[u8]) -> Self {
        let trimmed = bytes.trim_ascii();
        let indent = trimmed
            .iter()
            .position(|&byte| byte == b'\n')
            .map(|newline| {
                let unit: Vec<u8> = trimmed[newline + 1..]
                    .iter()
                    .take_while(|&&byte| byte == b' ' || byte == b'\t')
                    .copied()
                    .collect();
                if unit.is_empty() { b"  ".to_vec() } else { unit }
            });
        Self {
            indent,
            trailing_newline: bytes.ends_with(b"\n"),
        }
    }
}

/// An on-disk component definition, treated as an opaque JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub document: Value,
    pub layout: JsonLayout,
}

impl ComponentDefinition {
    /// Deserializes a definition, remembering the layout of the source bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let document: Value = serde_json::from_slice(bytes)?;
        if !document.is_object() {
            return Err(RegistryError::InvalidDefinition(
                "expected a JSON object at the top level".into(),
            ));
        }
        Ok(Self {
            document,
            layout: JsonLayout::detect(bytes),
        })
    }

    /// Serializes the definition using its original layout.
    ///
    /// Markup characters in strings are written as `\u003c`-style escapes,
    /// which is how the catalog files are generated.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match &self.layout.indent {
            Some(indent) => {
                let formatter = HtmlEscaping(PrettyFormatter::with_indent(indent));
                let mut ser = Serializer::with_formatter(&mut bytes, formatter);
                self.document.serialize(&mut ser)?;
            }
            None => {
                let formatter = HtmlEscaping(CompactFormatter);
                let mut ser = Serializer::with_formatter(&mut bytes, formatter);
                self.document.serialize(&mut ser)?;
            }
        }
        if self.layout.trailing_newline {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }

    /// The `component.kind` of the definition, when present.
    pub fn kind(&self) -> Option<&str> {
        self.document
            .get("component")
            .and_then(|component| component.get("kind"))
            .and_then(Value::as_str)
    }
}

/// Update counts for one (model, version) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTracker {
    pub total_components: usize,
    pub total_updated: usize,
    pub version: String,
}
