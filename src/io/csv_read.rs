use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::model::{CatalogInput, ComponentRecord};

/// Name of the worksheet holding component metadata.
pub const COMPONENTS_SHEET: &str = "Components";

const REGISTRANT_COLUMN: &str = "registrant";
const MODEL_COLUMN: &str = "model";
const COMPONENT_COLUMN: &str = "component";

/// Reads component records from a CSV file on disk.
pub fn read_components_file(path: &Path, model_filter: Option<&str>) -> Result<CatalogInput> {
    let file = File::open(path)?;
    read_components(BufReader::new(file), model_filter)
}

/// Reads component records from CSV data whose first row is the header.
///
/// Rows lacking a model or component name are skipped. When `model_filter`
/// is set only rows for that model are kept.
pub fn read_components<R: Read>(reader: R, model_filter: Option<&str>) -> Result<CatalogInput> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut input = CatalogInput::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let row = result?;
        let row_num = row_idx + 2;

        let model = cell(&row, columns.model);
        let component = cell(&row, columns.component);
        if model.is_empty() || component.is_empty() {
            debug!(row = row_num, "skipping row without model or component");
            continue;
        }
        if model_filter.is_some_and(|filter| filter != model) {
            continue;
        }

        let mut record = ComponentRecord::new(cell(&row, columns.registrant), model, component);
        for (col_idx, header) in &columns.patch_fields {
            record
                .fields
                .push((header.clone(), cell(&row, *col_idx).to_string()));
        }
        input.push(record);
    }

    Ok(input)
}

struct ColumnMap {
    registrant: usize,
    model: usize,
    component: usize,
    patch_fields: Vec<(usize, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
                .ok_or(RegistryError::MissingColumn { column: name })
        };
        let registrant = find(REGISTRANT_COLUMN)?;
        let model = find(MODEL_COLUMN)?;
        let component = find(COMPONENT_COLUMN)?;

        let patch_fields = headers
            .iter()
            .enumerate()
            .filter(|(idx, header)| {
                !header.trim().is_empty() && ![registrant, model, component].contains(idx)
            })
            .map(|(idx, header)| (idx, header.trim().to_string()))
            .collect();

        Ok(Self {
            registrant,
            model,
            component,
            patch_fields,
        })
    }
}

fn cell(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_columns_are_matched_case_insensitively() {
        let data = "Registrant,Model,Component,shape,styles.primaryColor\n\
                    meshery,kubernetes,Pod,rectangle,#326CE5\n\
                    meshery,kubernetes,,circle,\n";
        let input = read_components(data.as_bytes(), None).unwrap();

        let records = input.records("meshery", "kubernetes");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].fields,
            vec![
                ("shape".to_string(), "rectangle".to_string()),
                ("styles.primaryColor".to_string(), "#326CE5".to_string()),
            ]
        );
    }

    #[test]
    fn model_filter_drops_other_models() {
        let data = "registrant,model,component\nmeshery,kubernetes,Pod\nmeshery,istio,Gateway\n";
        let input = read_components(data.as_bytes(), Some("istio")).unwrap();
        assert_eq!(input.record_count(), 1);
        assert_eq!(input.records("meshery", "istio").len(), 1);
    }

    #[test]
    fn missing_identity_column_is_an_error() {
        let data = "registrant,component\nmeshery,Pod\n";
        let err = read_components(data.as_bytes(), None).unwrap_err();
        assert!(matches!(err, RegistryError::MissingColumn { column: "model" }));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let data = "registrant,model,component\nmeshery,kubernetes\n";
        assert!(matches!(
            read_components(data.as_bytes(), None),
            Err(RegistryError::Csv(_))
        ));
    }
}
