use crate::entities::RawEntity;
use quotekit_core::model::{DescriptiveItem, MaterialAnnotations};

/// Collects `DESCRIPTIVE_REPRESENTATION_ITEM('name','value')` records with two
/// non-empty strings. This is a text heuristic, not a reading of the product
/// data model.
pub fn scan_material_annotations(entities: &[RawEntity]) -> MaterialAnnotations {
    let items = entities
        .iter()
        .filter(|e| e.keyword == "DESCRIPTIVE_REPRESENTATION_ITEM" && e.params.len() == 2)
        .filter_map(|e| {
            let name = e.str_param(0)?;
            let value = e.str_param(1)?;
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(DescriptiveItem {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect::<Vec<_>>();

    if !items.is_empty() {
        log::debug!("found {} descriptive items", items.len());
    }
    MaterialAnnotations { items }
}
