//! S3 collections: buckets
//!
//! `ListBuckets` returns the full bucket list in one call, so there is no
//! paginator here. Buckets are identified by name rather than an id.

use std::sync::Arc;

use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{DateTime, DateTimeFormat};
use aws_sdk_s3::types::Bucket;
use aws_sdk_s3::Client;
use serde_json::Value;
use tokio::runtime::Runtime;

use crate::error::{CloudqError, Result};
use crate::provider::{ResourceCollection, ResourceHandle, ResourceItem, ResourceModel, ServiceModel};

pub struct S3Resource {
    client: Client,
    runtime: Arc<Runtime>,
    service: ServiceModel,
}

impl S3Resource {
    pub fn new(config: &SdkConfig, runtime: Arc<Runtime>) -> Self {
        Self {
            client: Client::new(config),
            runtime,
            service: ServiceModel::new().with_shape("Bucket", &["creation_date"]),
        }
    }
}

impl ResourceHandle for S3Resource {
    fn service_model(&self) -> &ServiceModel {
        &self.service
    }

    fn collection(&self, name: &str) -> Option<Box<dyn ResourceCollection>> {
        match name {
            "buckets" => Some(Box::new(Buckets {
                client: self.client.clone(),
                runtime: self.runtime.clone(),
                model: ResourceModel::new(&["name"], "Bucket"),
            })),
            _ => None,
        }
    }
}

struct Buckets {
    client: Client,
    runtime: Arc<Runtime>,
    model: ResourceModel,
}

impl ResourceCollection for Buckets {
    fn model(&self) -> &ResourceModel {
        &self.model
    }

    fn items(&self) -> Result<Vec<ResourceItem>> {
        self.runtime.block_on(fetch_buckets(&self.client))
    }
}

async fn fetch_buckets(client: &Client) -> Result<Vec<ResourceItem>> {
    let output = client.list_buckets().send().await.map_err(|e| {
        CloudqError::provider("list_buckets", format!("{}", DisplayErrorContext(&e)))
    })?;
    Ok(output.buckets().iter().map(bucket_item).collect())
}

fn bucket_item(bucket: &Bucket) -> ResourceItem {
    let mut item = ResourceItem::default();
    item.set(
        "name",
        bucket.name().map(Value::from).unwrap_or(Value::Null),
    );
    item.set("creation_date", datetime(bucket.creation_date()));
    item
}

fn datetime(value: Option<&DateTime>) -> Value {
    value
        .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}
