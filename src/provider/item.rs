//! Resource items and the tag overlay
//!
//! A [`ResourceItem`] is one enumerated cloud object, flattened to a map of
//! JSON field values. Providers report tags in the inconvenient
//! `[{"Key": k, "Value": v}, ...]` list shape; [`normalize_tags`] presents
//! them as a `{k: v}` object instead so they are queryable through the JSON
//! accessor. Tags may be a read-only/computed field on the original object,
//! so normalization never mutates the item: it returns an overlay view that
//! answers `tags` from an override map and forwards every other field.

use serde_json::{Map, Value};

/// Read access to an item's fields by name.
///
/// Implemented by both [`ResourceItem`] and [`FieldView`], so normalization
/// composes: normalizing an already-normalized view is a no-op.
pub trait Fields {
    fn field(&self, name: &str) -> Option<&Value>;
}

/// One enumerated resource, as a flat map of JSON field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceItem {
    fields: Map<String, Value>,
}

impl ResourceItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Set a field while building an item. Providers use this when
    /// converting SDK output.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl Fields for ResourceItem {
    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// An overlay over some item: overridden fields first, everything else
/// forwarded to the base.
pub struct FieldView<'a> {
    base: &'a dyn Fields,
    overrides: Map<String, Value>,
}

impl Fields for FieldView<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.overrides.get(name).or_else(|| self.base.field(name))
    }
}

/// Present a list-of-`{Key, Value}` `tags` field as a `{key: value}` object.
///
/// Entries that are not objects carrying both `Key` (a string) and `Value`
/// are skipped; duplicate keys resolve last-write-wins. If the item has no
/// `tags` field, or `tags` is not a list, the view forwards everything
/// unchanged.
pub fn normalize_tags(item: &dyn Fields) -> FieldView<'_> {
    let mut overrides = Map::new();
    if let Some(Value::Array(entries)) = item.field("tags") {
        let mut tags = Map::new();
        for entry in entries {
            if let Value::Object(kv) = entry {
                if let (Some(Value::String(key)), Some(value)) = (kv.get("Key"), kv.get("Value")) {
                    tags.insert(key.clone(), value.clone());
                }
            }
        }
        overrides.insert("tags".to_string(), Value::Object(tags));
    }
    FieldView {
        base: item,
        overrides,
    }
}
