//! Schema inference
//!
//! A cached table's column list is derived from the collection's resource
//! metadata model: identifier names sorted lexicographically (the provider
//! guarantees no order, sorting makes the layout deterministic), followed by
//! attribute names in shape-declared order. No deduplication happens here; a
//! name collision between identifiers and attributes is a provider-model
//! defect and propagates into the CREATE TABLE, where SQLite rejects it.

use crate::error::{CloudqError, Result};
use crate::provider::{ResourceModel, ServiceModel};

/// A relational column of a cached table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
}

/// Derive the ordered column list for a resource/collection pair.
///
/// Pure; fails only when the model's shape is missing from the service-level
/// registry.
pub fn columns(service: &ServiceModel, model: &ResourceModel) -> Result<Vec<Column>> {
    let mut identifiers = model.identifiers.clone();
    identifiers.sort();

    let attributes = service.shape(&model.shape).ok_or_else(|| {
        CloudqError::schema(format!(
            "shape `{}` not found in service model",
            model.shape
        ))
    })?;

    Ok(identifiers
        .into_iter()
        .chain(attributes.iter().cloned())
        .map(|name| Column { name })
        .collect())
}
