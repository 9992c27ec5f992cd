//! Testing utilities
//!
//! [`FakeProvider`] is an in-memory [`CloudProvider`] for exercising the
//! engine without network access: tests declare resource kinds, shapes and
//! collections, seed items per region, and can inject a one-shot provider
//! failure or count how often a collection was enumerated.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{CloudqError, Result};
use crate::provider::{
    CloudProvider, ResourceCollection, ResourceHandle, ResourceItem, ResourceModel, ServiceModel,
};
use crate::region::Region;

#[derive(Default)]
struct FakeState {
    resources: HashMap<String, FakeResource>,
}

#[derive(Default)]
struct FakeResource {
    service: ServiceModel,
    collections: HashMap<String, FakeCollectionState>,
}

struct FakeCollectionState {
    model: ResourceModel,
    /// Items keyed by region schema name.
    items: HashMap<String, Vec<ResourceItem>>,
    fetches: usize,
    fail_next: Option<String>,
}

/// An in-memory provider with a declarative catalog.
pub struct FakeProvider {
    default_region: Region,
    state: Arc<Mutex<FakeState>>,
}

impl FakeProvider {
    pub fn new(default_region: &str) -> Self {
        Self {
            default_region: Region::new(default_region),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Declare a collection: its identifiers, the shape it resolves against,
    /// and that shape's attributes.
    pub fn define_collection(
        &self,
        kind: &str,
        collection: &str,
        identifiers: &[&str],
        shape: &str,
        attributes: &[&str],
    ) {
        let mut state = self.state.lock();
        let resource = state.resources.entry(kind.to_string()).or_default();
        resource.service = resource.service.clone().with_shape(shape, attributes);
        resource.collections.insert(
            collection.to_string(),
            FakeCollectionState {
                model: ResourceModel::new(identifiers, shape),
                items: HashMap::new(),
                fetches: 0,
                fail_next: None,
            },
        );
    }

    /// Seed the items a region's collection enumerates.
    pub fn seed(&self, kind: &str, collection: &str, region: &str, items: Vec<ResourceItem>) {
        let mut state = self.state.lock();
        if let Some(coll) = state
            .resources
            .get_mut(kind)
            .and_then(|r| r.collections.get_mut(collection))
        {
            coll.items.insert(Region::new(region).schema_name().to_string(), items);
        }
    }

    /// Make the next enumeration of the collection fail with a provider
    /// error.
    pub fn fail_next_fetch(&self, kind: &str, collection: &str, message: &str) {
        let mut state = self.state.lock();
        if let Some(coll) = state
            .resources
            .get_mut(kind)
            .and_then(|r| r.collections.get_mut(collection))
        {
            coll.fail_next = Some(message.to_string());
        }
    }

    /// How many times the collection has been enumerated.
    pub fn fetch_count(&self, kind: &str, collection: &str) -> usize {
        let state = self.state.lock();
        state
            .resources
            .get(kind)
            .and_then(|r| r.collections.get(collection))
            .map(|c| c.fetches)
            .unwrap_or(0)
    }
}

impl CloudProvider for FakeProvider {
    fn default_region(&self) -> Region {
        self.default_region.clone()
    }

    fn resource(&self, kind: &str, region: &Region) -> Result<Box<dyn ResourceHandle>> {
        let state = self.state.lock();
        let resource = state.resources.get(kind).ok_or_else(|| {
            CloudqError::provider("resource", format!("unsupported resource kind `{}`", kind))
        })?;
        Ok(Box::new(FakeHandle {
            state: self.state.clone(),
            kind: kind.to_string(),
            region: region.clone(),
            service: resource.service.clone(),
        }))
    }
}

struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
    kind: String,
    region: Region,
    service: ServiceModel,
}

impl ResourceHandle for FakeHandle {
    fn service_model(&self) -> &ServiceModel {
        &self.service
    }

    fn collection(&self, name: &str) -> Option<Box<dyn ResourceCollection>> {
        let state = self.state.lock();
        let model = state
            .resources
            .get(&self.kind)?
            .collections
            .get(name)?
            .model
            .clone();
        Some(Box::new(FakeCollection {
            state: self.state.clone(),
            kind: self.kind.clone(),
            name: name.to_string(),
            region: self.region.clone(),
            model,
        }))
    }
}

struct FakeCollection {
    state: Arc<Mutex<FakeState>>,
    kind: String,
    name: String,
    region: Region,
    model: ResourceModel,
}

impl ResourceCollection for FakeCollection {
    fn model(&self) -> &ResourceModel {
        &self.model
    }

    fn items(&self) -> Result<Vec<ResourceItem>> {
        let mut state = self.state.lock();
        let coll = state
            .resources
            .get_mut(&self.kind)
            .and_then(|r| r.collections.get_mut(&self.name))
            .ok_or_else(|| CloudqError::provider("enumerate", "collection removed"))?;
        coll.fetches += 1;
        if let Some(message) = coll.fail_next.take() {
            return Err(CloudqError::provider("enumerate", message));
        }
        Ok(coll
            .items
            .get(self.region.schema_name())
            .cloned()
            .unwrap_or_default())
    }
}

/// Build a [`ResourceItem`] from field pairs.
pub fn item(fields: &[(&str, Value)]) -> ResourceItem {
    let mut item = ResourceItem::default();
    for (name, value) in fields {
        item.set(name, value.clone());
    }
    item
}
