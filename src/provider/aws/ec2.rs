//! EC2 collections: instances, volumes, vpcs
//!
//! Each collection enumerates through the SDK's paginator and flattens the
//! typed output into [`ResourceItem`] field maps. Tags keep the provider's
//! raw `[{Key, Value}]` list shape; the loader's tag normalizer turns them
//! into a queryable map at insert time. Nested structures (like instance
//! state) become JSON objects so the `json_get` accessor can reach into them.

use std::sync::Arc;

use aws_config::SdkConfig;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::primitives::{DateTime, DateTimeFormat};
use aws_sdk_ec2::types::{Instance, Tag, Volume, Vpc};
use aws_sdk_ec2::Client;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use crate::error::{CloudqError, Result};
use crate::provider::{ResourceCollection, ResourceHandle, ResourceItem, ResourceModel, ServiceModel};

pub struct Ec2Resource {
    client: Client,
    runtime: Arc<Runtime>,
    service: ServiceModel,
}

impl Ec2Resource {
    pub fn new(config: &SdkConfig, runtime: Arc<Runtime>) -> Self {
        Self {
            client: Client::new(config),
            runtime,
            service: service_model(),
        }
    }
}

/// Attribute shapes for the EC2 resources we serve, in declared order.
fn service_model() -> ServiceModel {
    ServiceModel::new()
        .with_shape(
            "Instance",
            &[
                "image_id",
                "instance_type",
                "key_name",
                "launch_time",
                "private_ip_address",
                "public_ip_address",
                "state",
                "subnet_id",
                "tags",
                "vpc_id",
            ],
        )
        .with_shape(
            "Volume",
            &[
                "availability_zone",
                "create_time",
                "encrypted",
                "iops",
                "size",
                "snapshot_id",
                "state",
                "tags",
                "volume_type",
            ],
        )
        .with_shape("Vpc", &["cidr_block", "is_default", "state", "tags"])
}

impl ResourceHandle for Ec2Resource {
    fn service_model(&self) -> &ServiceModel {
        &self.service
    }

    fn collection(&self, name: &str) -> Option<Box<dyn ResourceCollection>> {
        let model = match name {
            "instances" => ResourceModel::new(&["id"], "Instance"),
            "volumes" => ResourceModel::new(&["id"], "Volume"),
            "vpcs" => ResourceModel::new(&["id"], "Vpc"),
            _ => return None,
        };
        Some(Box::new(Ec2Collection {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            name: name.to_string(),
            model,
        }))
    }
}

struct Ec2Collection {
    client: Client,
    runtime: Arc<Runtime>,
    name: String,
    model: ResourceModel,
}

impl ResourceCollection for Ec2Collection {
    fn model(&self) -> &ResourceModel {
        &self.model
    }

    fn items(&self) -> Result<Vec<ResourceItem>> {
        match self.name.as_str() {
            "instances" => self.runtime.block_on(fetch_instances(&self.client)),
            "volumes" => self.runtime.block_on(fetch_volumes(&self.client)),
            "vpcs" => self.runtime.block_on(fetch_vpcs(&self.client)),
            other => Err(CloudqError::provider(
                "enumerate",
                format!("no fetcher for ec2 collection `{}`", other),
            )),
        }
    }
}

async fn fetch_instances(client: &Client) -> Result<Vec<ResourceItem>> {
    let mut items = Vec::new();
    let mut pages = client.describe_instances().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| {
            CloudqError::provider("describe_instances", format!("{}", DisplayErrorContext(&e)))
        })?;
        for reservation in page.reservations() {
            for instance in reservation.instances() {
                items.push(instance_item(instance));
            }
        }
    }
    Ok(items)
}

async fn fetch_volumes(client: &Client) -> Result<Vec<ResourceItem>> {
    let mut items = Vec::new();
    let mut pages = client.describe_volumes().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| {
            CloudqError::provider("describe_volumes", format!("{}", DisplayErrorContext(&e)))
        })?;
        for volume in page.volumes() {
            items.push(volume_item(volume));
        }
    }
    Ok(items)
}

async fn fetch_vpcs(client: &Client) -> Result<Vec<ResourceItem>> {
    let mut items = Vec::new();
    let mut pages = client.describe_vpcs().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.map_err(|e| {
            CloudqError::provider("describe_vpcs", format!("{}", DisplayErrorContext(&e)))
        })?;
        for vpc in page.vpcs() {
            items.push(vpc_item(vpc));
        }
    }
    Ok(items)
}

fn instance_item(instance: &Instance) -> ResourceItem {
    let mut item = ResourceItem::default();
    item.set("id", opt_str(instance.instance_id()));
    item.set("image_id", opt_str(instance.image_id()));
    item.set(
        "instance_type",
        instance
            .instance_type()
            .map(|t| Value::from(t.as_str()))
            .unwrap_or(Value::Null),
    );
    item.set("key_name", opt_str(instance.key_name()));
    item.set("launch_time", datetime(instance.launch_time()));
    item.set("private_ip_address", opt_str(instance.private_ip_address()));
    item.set("public_ip_address", opt_str(instance.public_ip_address()));
    item.set(
        "state",
        instance
            .state()
            .map(|s| json!({"Code": s.code(), "Name": s.name().map(|n| n.as_str())}))
            .unwrap_or(Value::Null),
    );
    item.set("subnet_id", opt_str(instance.subnet_id()));
    item.set("tags", tags_value(instance.tags()));
    item.set("vpc_id", opt_str(instance.vpc_id()));
    item
}

fn volume_item(volume: &Volume) -> ResourceItem {
    let mut item = ResourceItem::default();
    item.set("id", opt_str(volume.volume_id()));
    item.set("availability_zone", opt_str(volume.availability_zone()));
    item.set("create_time", datetime(volume.create_time()));
    item.set("encrypted", json!(volume.encrypted()));
    item.set("iops", json!(volume.iops()));
    item.set("size", json!(volume.size()));
    item.set("snapshot_id", opt_str(volume.snapshot_id()));
    item.set(
        "state",
        volume
            .state()
            .map(|s| Value::from(s.as_str()))
            .unwrap_or(Value::Null),
    );
    item.set("tags", tags_value(volume.tags()));
    item.set(
        "volume_type",
        volume
            .volume_type()
            .map(|t| Value::from(t.as_str()))
            .unwrap_or(Value::Null),
    );
    item
}

fn vpc_item(vpc: &Vpc) -> ResourceItem {
    let mut item = ResourceItem::default();
    item.set("id", opt_str(vpc.vpc_id()));
    item.set("cidr_block", opt_str(vpc.cidr_block()));
    item.set("is_default", json!(vpc.is_default()));
    item.set(
        "state",
        vpc.state()
            .map(|s| Value::from(s.as_str()))
            .unwrap_or(Value::Null),
    );
    item.set("tags", tags_value(vpc.tags()));
    item
}

/// Keep the provider's list-of-{Key,Value} shape; normalization happens at
/// load time.
fn tags_value(tags: &[Tag]) -> Value {
    Value::Array(
        tags.iter()
            .map(|t| json!({"Key": t.key(), "Value": t.value()}))
            .collect(),
    )
}

fn opt_str(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn datetime(value: Option<&DateTime>) -> Value {
    value
        .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}
