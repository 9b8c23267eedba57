use tracing::{debug, info};

use crate::model::CatalogInput;

/// Folds a per-file input into the accumulated one.
///
/// Records for a (registrant, model) pair already present are appended after
/// the existing ones; nothing is replaced or deduplicated.
pub fn merge_into(target: &mut CatalogInput, source: CatalogInput) {
    for (registrant, models) in source.into_registrants() {
        info!(%registrant, models = models.len(), "merging registrant");
        for (model, records) in models {
            debug!(%registrant, %model, components = records.len(), "appending records");
            target.extend(&registrant, &model, records);
        }
    }
}

/// Merges several inputs in order.
pub fn merge_all(inputs: impl IntoIterator<Item = CatalogInput>) -> CatalogInput {
    let mut merged = CatalogInput::new();
    for input in inputs {
        merge_into(&mut merged, input);
    }
    merged
}
