//! AWS provider
//!
//! Credential and default-region resolution go through `aws-config`; each
//! resource kind maps to one SDK client. The SDK is async but the query core
//! is synchronous, so the provider owns a current-thread tokio runtime and
//! blocks on each enumeration. Per-region `SdkConfig`s are cached for the
//! provider's lifetime.

mod ec2;
mod s3;

use std::collections::HashMap;
use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::error::{CloudqError, Result};
use crate::provider::{CloudProvider, ResourceHandle};
use crate::region::Region;

/// AWS implementation of [`CloudProvider`].
pub struct AwsProvider {
    runtime: Arc<Runtime>,
    configs: Mutex<HashMap<String, SdkConfig>>,
    default_region: Region,
}

impl AwsProvider {
    /// Resolve credentials and the default region from the environment
    /// (profile, env vars, instance metadata). `region_override` takes
    /// precedence over the discovered default.
    pub fn connect(region_override: Option<&str>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudqError::provider("runtime", e.to_string()))?;

        let base = runtime.block_on(aws_config::defaults(BehaviorVersion::latest()).load());
        let default_region = match region_override {
            Some(name) => Region::new(name),
            None => base
                .region()
                .map(|r| Region::new(r.as_ref()))
                .ok_or_else(|| {
                    CloudqError::config(
                        "no default region configured; set AWS_REGION or pass --region",
                    )
                })?,
        };

        let mut configs = HashMap::new();
        let base_matches_default = base
            .region()
            .map(|r| r.as_ref() == default_region.provider_name())
            .unwrap_or(false);
        if base_matches_default {
            configs.insert(default_region.schema_name().to_string(), base);
        }

        info!(region = %default_region, "AWS session established");
        Ok(Self {
            runtime: Arc::new(runtime),
            configs: Mutex::new(configs),
            default_region,
        })
    }

    fn sdk_config(&self, region: &Region) -> SdkConfig {
        let mut configs = self.configs.lock();
        if let Some(config) = configs.get(region.schema_name()) {
            return config.clone();
        }
        debug!(region = %region, "Loading AWS config for region");
        let config = self.runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(region.provider_name()))
                .load(),
        );
        configs.insert(region.schema_name().to_string(), config.clone());
        config
    }
}

impl CloudProvider for AwsProvider {
    fn default_region(&self) -> Region {
        self.default_region.clone()
    }

    fn resource(&self, kind: &str, region: &Region) -> Result<Box<dyn ResourceHandle>> {
        let config = self.sdk_config(region);
        match kind {
            "ec2" => Ok(Box::new(ec2::Ec2Resource::new(
                &config,
                self.runtime.clone(),
            ))),
            "s3" => Ok(Box::new(s3::S3Resource::new(&config, self.runtime.clone()))),
            other => Err(CloudqError::provider(
                "resource",
                format!("unsupported resource kind `{}`", other),
            )),
        }
    }
}
