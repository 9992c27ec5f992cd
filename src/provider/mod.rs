//! Cloud provider abstraction
//!
//! The query engine is provider-agnostic: it consumes these capability traits
//! and never touches an SDK type. A [`CloudProvider`] is a factory over
//! resource kinds (`ec2`, `s3`, ...); a [`ResourceHandle`] exposes the
//! service-level shape registry and opens named collections; a
//! [`ResourceCollection`] enumerates items (paging handled internally) and
//! exposes the resource metadata model that drives schema inference.
//!
//! The AWS implementation lives in [`aws`]; tests use
//! [`FakeProvider`](crate::testing::FakeProvider).

pub mod aws;
mod item;
mod model;

pub use item::{normalize_tags, FieldView, Fields, ResourceItem};
pub use model::{ResourceModel, ServiceModel};

use crate::error::Result;
use crate::region::Region;

/// A cloud provider: session/credential state plus a factory over resource
/// kinds, keyed by the kind segment of a table name.
pub trait CloudProvider: Send + Sync {
    /// The region queries default to when they name none.
    fn default_region(&self) -> Region;

    /// Construct the resource object for `kind` scoped to `region`.
    ///
    /// Fails with a provider error for kinds the provider does not serve.
    fn resource(&self, kind: &str, region: &Region) -> Result<Box<dyn ResourceHandle>>;
}

/// One resource kind in one region.
pub trait ResourceHandle {
    /// The service-level shape registry attributes resolve against.
    fn service_model(&self) -> &ServiceModel;

    /// Open a named collection, or `None` if this resource has no such
    /// collection.
    fn collection(&self, name: &str) -> Option<Box<dyn ResourceCollection>>;
}

/// A named, enumerable group of same-kind resources.
pub trait ResourceCollection {
    /// The metadata model for this collection's resource.
    fn model(&self) -> &ResourceModel;

    /// Enumerate all items. Implementations page through the provider API
    /// internally; there is no cutoff.
    fn items(&self) -> Result<Vec<ResourceItem>>;
}
