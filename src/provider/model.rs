//! Resource metadata models
//!
//! A [`ResourceModel`] describes one collection's resource: its identifier
//! field names plus the name of the service-level shape that lists its
//! attributes. The [`ServiceModel`] is the shape registry for one provider
//! service; attribute order inside a shape is the declared order and is
//! preserved all the way into the relational column list.

use std::collections::HashMap;

/// Metadata model for one resource kind, as exposed by a collection.
#[derive(Debug, Clone)]
pub struct ResourceModel {
    /// Identifier field names. The provider does not guarantee an order;
    /// schema inference sorts them.
    pub identifiers: Vec<String>,
    /// Name of the shape (in the owning service's [`ServiceModel`]) that
    /// declares this resource's attributes.
    pub shape: String,
}

impl ResourceModel {
    pub fn new(identifiers: &[&str], shape: &str) -> Self {
        Self {
            identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
            shape: shape.to_string(),
        }
    }
}

/// Service-level registry of attribute shapes.
#[derive(Debug, Clone, Default)]
pub struct ServiceModel {
    shapes: HashMap<String, Vec<String>>,
}

impl ServiceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape and its attribute names in declared order.
    pub fn with_shape(mut self, name: &str, attributes: &[&str]) -> Self {
        self.shapes.insert(
            name.to_string(),
            attributes.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Look up a shape's attribute names; `None` if the shape is unknown.
    pub fn shape(&self, name: &str) -> Option<&[String]> {
        self.shapes.get(name).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_lookup_preserves_declared_order() {
        let service = ServiceModel::new().with_shape("Widget", &["zeta", "alpha", "mid"]);
        let attrs = service.shape("Widget").unwrap();
        assert_eq!(attrs, &["zeta", "alpha", "mid"]);
        assert!(service.shape("Gadget").is_none());
    }
}
