//! AWS-backed provider
//!
//! CloudFormation for stacks, S3 for template artifacts and SSM for the
//! management bucket parameter.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types as cfn;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use tracing::debug;

use super::{CloudProvider, StackRequest, StackSummary, TemplateSource};
use crate::error::{CloudError, Result};
use crate::settings::AwsSettings;

/// Max keys per S3 DeleteObjects call
const DELETE_BATCH_SIZE: usize = 1000;

/// Provider backed by the AWS SDK
#[derive(Clone)]
pub struct AwsProvider {
    cloudformation: aws_sdk_cloudformation::Client,
    s3: aws_sdk_s3::Client,
    ssm: aws_sdk_ssm::Client,
}

impl AwsProvider {
    /// Load credentials and region from the environment, with optional overrides
    pub async fn from_settings(settings: &AwsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        debug!(region = ?config.region(), "loaded AWS configuration");

        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            ssm: aws_sdk_ssm::Client::new(&config),
        }
    }
}

/// Map an SDK error, treating CloudFormation's "does not exist" validation error as not-found
fn stack_error<E>(operation: &str, stack: &str, err: E) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let missing = err.code() == Some("ValidationError")
        && err.message().is_some_and(|m| m.contains("does not exist"));
    if missing {
        CloudError::NotFound {
            kind: "stack",
            name: stack.to_string(),
        }
    } else {
        sdk_error(operation, err)
    }
}

fn sdk_error<E: std::error::Error + 'static>(operation: &str, err: E) -> CloudError {
    CloudError::provider(operation, DisplayErrorContext(err).to_string())
}

fn cfn_capability(capability: super::Capability) -> cfn::Capability {
    match capability {
        super::Capability::Iam => cfn::Capability::CapabilityIam,
        super::Capability::NamedIam => cfn::Capability::CapabilityNamedIam,
        super::Capability::AutoExpand => cfn::Capability::CapabilityAutoExpand,
    }
}

fn cfn_on_failure(on_failure: super::OnFailure) -> cfn::OnFailure {
    match on_failure {
        super::OnFailure::DoNothing => cfn::OnFailure::DoNothing,
        super::OnFailure::Rollback => cfn::OnFailure::Rollback,
        super::OnFailure::Delete => cfn::OnFailure::Delete,
    }
}

fn cfn_parameters(request: &StackRequest) -> Option<Vec<cfn::Parameter>> {
    if request.parameters.is_empty() {
        return None;
    }
    Some(
        request
            .parameters
            .iter()
            .map(|p| {
                cfn::Parameter::builder()
                    .parameter_key(&p.key)
                    .parameter_value(&p.value)
                    .use_previous_value(p.use_previous_value)
                    .build()
            })
            .collect(),
    )
}

fn cfn_capabilities(request: &StackRequest) -> Option<Vec<cfn::Capability>> {
    if request.capabilities.is_empty() {
        None
    } else {
        Some(request.capabilities.iter().copied().map(cfn_capability).collect())
    }
}

fn split_template(template: &TemplateSource) -> (Option<String>, Option<String>) {
    match template {
        TemplateSource::Url(url) => (Some(url.clone()), None),
        TemplateSource::Body(body) => (None, Some(body.clone())),
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn get_stack_template(&self, stack_name: &str) -> Result<String> {
        let output = self
            .cloudformation
            .get_template()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| stack_error("GetTemplate", stack_name, e))?;
        Ok(output.template_body().unwrap_or_default().to_string())
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<()> {
        let (url, body) = split_template(&request.template);
        self.cloudformation
            .create_stack()
            .stack_name(&request.stack_name)
            .set_template_url(url)
            .set_template_body(body)
            .set_timeout_in_minutes(request.timeout_in_minutes.map(|m| m as i32))
            .set_capabilities(cfn_capabilities(request))
            .set_on_failure(request.on_failure.map(cfn_on_failure))
            .set_parameters(cfn_parameters(request))
            .set_role_arn(request.role_arn.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateStack", e))?;
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<()> {
        let (url, body) = split_template(&request.template);
        self.cloudformation
            .update_stack()
            .stack_name(&request.stack_name)
            .set_template_url(url)
            .set_template_body(body)
            .set_capabilities(cfn_capabilities(request))
            .set_parameters(cfn_parameters(request))
            .set_role_arn(request.role_arn.clone())
            .send()
            .await
            .map_err(|e| stack_error("UpdateStack", &request.stack_name, e))?;
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        self.cloudformation
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteStack", e))?;
        Ok(())
    }

    async fn describe_stack_status(&self, stack: &str) -> Result<String> {
        let output = self
            .cloudformation
            .describe_stacks()
            .stack_name(stack)
            .send()
            .await
            .map_err(|e| stack_error("DescribeStacks", stack, e))?;

        output
            .stacks()
            .first()
            .and_then(|s| s.stack_status())
            .map(|status| status.as_str().to_string())
            .ok_or_else(|| CloudError::NotFound {
                kind: "stack",
                name: stack.to_string(),
            })
    }

    async fn list_stacks_by_name(&self, stack_name: &str) -> Result<Vec<StackSummary>> {
        let output = match self
            .cloudformation
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return match stack_error("DescribeStacks", stack_name, e) {
                    err if err.is_not_found() => Ok(Vec::new()),
                    err => Err(err),
                };
            }
        };

        Ok(output
            .stacks()
            .iter()
            .map(|s| StackSummary {
                id: s.stack_id().unwrap_or_default().to_string(),
                name: s.stack_name().unwrap_or_default().to_string(),
                status: s
                    .stack_status()
                    .map(|status| status.as_str().to_string())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error("PutObject", e))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .s3
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    CloudError::NotFound {
                        kind: "object",
                        name: format!("{bucket}/{key}"),
                    }
                } else {
                    sdk_error("GetObject", e)
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| CloudError::provider("GetObject", e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn list_object_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .s3
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("ListObjectsV2", e))?;
            keys.extend(page.contents().iter().filter_map(|o| o.key()).map(str::to_string));
        }
        Ok(keys)
    }

    async fn get_parameter(&self, name: &str) -> Result<String> {
        let output = self
            .ssm
            .get_parameter()
            .name(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_parameter_not_found()) {
                    CloudError::NotFound {
                        kind: "parameter",
                        name: name.to_string(),
                    }
                } else {
                    sdk_error("GetParameter", e)
                }
            })?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| CloudError::NotFound {
                kind: "parameter",
                name: name.to_string(),
            })
    }

    async fn get_bucket_region(&self, bucket: &str) -> Result<Option<String>> {
        let output = self
            .s3
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| sdk_error("GetBucketLocation", e))?;
        Ok(output.location_constraint().map(|c| c.as_str().to_string()))
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        let mut removed = 0;
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let page = self
                .s3
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_marker.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListObjectVersions", e))?;

            let versions = page
                .versions()
                .iter()
                .map(|v| (v.key(), v.version_id()))
                .chain(page.delete_markers().iter().map(|m| (m.key(), m.version_id())));

            let mut identifiers = Vec::new();
            for (key, version_id) in versions {
                let Some(key) = key else { continue };
                let identifier = ObjectIdentifier::builder()
                    .key(key)
                    .set_version_id(version_id.map(str::to_string))
                    .build()
                    .map_err(|e| sdk_error("DeleteObjects", e))?;
                identifiers.push(identifier);
            }

            for batch in identifiers.chunks(DELETE_BATCH_SIZE) {
                let delete = Delete::builder()
                    .set_objects(Some(batch.to_vec()))
                    .quiet(true)
                    .build()
                    .map_err(|e| sdk_error("DeleteObjects", e))?;
                self.s3
                    .delete_objects()
                    .bucket(bucket)
                    .delete(delete)
                    .send()
                    .await
                    .map_err(|e| sdk_error("DeleteObjects", e))?;
                removed += batch.len();
            }
            debug!(bucket, removed, "deleted object versions");

            if !page.is_truncated().unwrap_or(false) {
                return Ok(removed);
            }
            key_marker = page.next_key_marker().map(str::to_string);
            version_marker = page.next_version_id_marker().map(str::to_string);
        }
    }
}
