//! Template artifacts in the management bucket
//!
//! Templates are stored as `<name>/<version>` objects. The bucket itself is
//! found through a well-known parameter written by the management stack.

use bettercf_core::{Increment, TemplateRef, Version, resolve_latest_version};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::provider::CloudProvider;
use crate::settings::management_parameter;

/// Region of a bucket with no location constraint
pub const DEFAULT_BUCKET_REGION: &str = "us-east-1";

/// Handle on the management bucket
pub struct ArtifactStore<'a, P: CloudProvider + ?Sized> {
    provider: &'a P,
    bucket: String,
}

impl<'a, P: CloudProvider + ?Sized> ArtifactStore<'a, P> {
    /// Resolve the management bucket of `product`
    pub async fn locate(provider: &'a P, product: &str) -> Result<Self> {
        let bucket = provider.get_parameter(&management_parameter(product)).await?;
        debug!(product, bucket = %bucket, "located management bucket");
        Ok(Self { provider, bucket })
    }

    /// Use a known bucket
    pub fn with_bucket(provider: &'a P, bucket: impl Into<String>) -> Self {
        Self {
            provider,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Region of the bucket
    pub async fn region(&self) -> Result<String> {
        Ok(self
            .provider
            .get_bucket_region(&self.bucket)
            .await?
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_BUCKET_REGION.to_string()))
    }

    /// `https://<bucket>.s3.<region>.amazonaws.com`
    pub async fn bucket_url(&self) -> Result<String> {
        Ok(format!(
            "https://{}.s3.{}.amazonaws.com",
            self.bucket,
            self.region().await?
        ))
    }

    /// Object URL of a stored template
    pub async fn template_url(&self, template: &TemplateRef) -> Result<String> {
        Ok(format!("{}/{}", self.bucket_url().await?, template.object_key()))
    }

    /// Version strings stored for `name`, placeholder keys dropped
    pub async fn versions(&self, name: &str) -> Result<Vec<String>> {
        let keys = self
            .provider
            .list_object_keys(&self.bucket, &format!("{name}/"))
            .await?;

        Ok(keys
            .iter()
            .filter_map(|key| key.rsplit('/').next())
            .filter(|version| !version.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Latest stored version of `name`
    pub async fn latest_version(&self, name: &str) -> Result<Version> {
        let versions = self.versions(name).await?;
        if versions.is_empty() {
            return Err(CloudError::NoVersions {
                name: name.to_string(),
                bucket: self.bucket.clone(),
            });
        }
        Ok(resolve_latest_version(&versions)?)
    }

    /// Store a template body
    ///
    /// Without an explicit version the latest stored version is bumped by
    /// `increment`.
    pub async fn push(
        &self,
        name: &str,
        template: &JsonValue,
        version: Option<Version>,
        increment: Increment,
    ) -> Result<TemplateRef> {
        let version = match version {
            Some(version) => version,
            None => {
                let mut version = self.latest_version(name).await?;
                version.increment(increment)?;
                version
            }
        };

        let template_ref = TemplateRef::new(name, version);
        let body = serde_json::to_vec(template)?;
        self.provider
            .put_object(&self.bucket, &template_ref.object_key(), body)
            .await?;

        info!(template = name, version = %template_ref.version, bucket = %self.bucket, "pushed template");
        Ok(template_ref)
    }

    /// Read a stored template body
    pub async fn fetch(&self, template: &TemplateRef) -> Result<JsonValue> {
        let body = self
            .provider
            .get_object(&self.bucket, &template.object_key())
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
