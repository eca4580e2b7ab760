//! Stack reconciliation
//!
//! Deploying a [`StackSpec`] is create-or-update: the stack's existence is
//! checked first, the matching mutation is issued once, and the stack is
//! polled until it settles. Deletion follows the same poll-until-settled
//! pattern, addressing the stack by id once the delete is issued.

use bettercf_core::StackSpec;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::error::{CloudError, Result};
use crate::poll::{PollConfig, wait_until_settled};
use crate::provider::{
    CloudProvider, DEFAULT_STACK_TIMEOUT_MINUTES, DEPLOY_CAPABILITIES, OnFailure, StackAction,
    StackRequest, TemplateSource,
};
use crate::settings::DEFAULT_PRODUCT;

/// Callback receiving `(stack, status)` for every polled status
pub type StatusObserver = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Options for a deploy
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Deploy this template body instead of the stored artifact
    pub local_template: Option<JsonValue>,
}

impl DeployOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a local template body
    pub fn with_local_template(mut self, template: JsonValue) -> Self {
        self.local_template = Some(template);
        self
    }
}

/// How a stack operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOutcome {
    pub stack_name: String,
    pub action: StackAction,
    pub status: String,
}

/// Converges stacks on a provider
pub struct StackReconciler<P: CloudProvider> {
    provider: P,
    product: String,
    poll: PollConfig,
    observer: Option<StatusObserver>,
}

impl<P: CloudProvider> StackReconciler<P> {
    /// Create a reconciler for the default product
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            product: DEFAULT_PRODUCT.to_string(),
            poll: PollConfig::default(),
            observer: None,
        }
    }

    /// Set the product whose management bucket holds the templates
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Set status polling
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Report every polled status
    pub fn with_observer(mut self, observer: StatusObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    /// Handle on the management bucket
    pub async fn artifacts(&self) -> Result<ArtifactStore<'_, P>> {
        ArtifactStore::locate(&self.provider, &self.product).await
    }

    /// Deploy a stack spec and wait for it to settle
    pub async fn deploy(&self, spec: &StackSpec, options: &DeployOptions) -> Result<StackOutcome> {
        let request = self.build_request(spec, options).await?;
        self.create_or_update(request).await
    }

    /// Build the create request for a stack spec
    ///
    /// The template is referenced by URL unless a local body is given or
    /// overrides must be applied, in which case it is sent inline.
    pub async fn build_request(
        &self,
        spec: &StackSpec,
        options: &DeployOptions,
    ) -> Result<StackRequest> {
        let stack_name = spec.stack_name();
        let template = self.template_source(spec, options).await?;

        let mut request = StackRequest::new(stack_name, template)
            .timeout_minutes(DEFAULT_STACK_TIMEOUT_MINUTES)
            .capabilities(DEPLOY_CAPABILITIES)
            .on_failure(OnFailure::Rollback);

        for (key, value) in &spec.template_parameters {
            request = request.parameter(key, value);
        }
        if let Some(role_arn) = &spec.role_arn {
            request = request.role_arn(role_arn);
        }

        Ok(request)
    }

    async fn template_source(
        &self,
        spec: &StackSpec,
        options: &DeployOptions,
    ) -> Result<TemplateSource> {
        if !spec.has_overrides() {
            return match &options.local_template {
                Some(body) => Ok(TemplateSource::Body(serde_json::to_string(body)?)),
                None => {
                    let url = self.artifacts().await?.template_url(&spec.template).await?;
                    Ok(TemplateSource::Url(url))
                }
            };
        }

        // Overrides need the body itself, never the URL
        let original = match &options.local_template {
            Some(body) => body.clone(),
            None => self.artifacts().await?.fetch(&spec.template).await?,
        };

        info!(
            stack = %spec.stack_name(),
            overrides = spec.resource_overrides.count(),
            "applying resource overrides"
        );
        let overridden = spec.resource_overrides.applied_to(original)?;
        Ok(TemplateSource::Body(serde_json::to_string(&overridden)?))
    }

    /// Create the stack if it does not exist, else update it, then wait
    pub async fn create_or_update(&self, request: StackRequest) -> Result<StackOutcome> {
        let stack_name = request.stack_name.clone();

        let action = if self.provider.stack_exists(&stack_name).await? {
            info!(stack = %stack_name, "updating stack");
            self.provider.update_stack(&request.for_update()).await?;
            StackAction::Update
        } else {
            info!(stack = %stack_name, "creating stack");
            self.provider.create_stack(&request).await?;
            StackAction::Create
        };

        let status = self.settle(&stack_name, &stack_name, action).await?;
        Ok(StackOutcome {
            stack_name,
            action,
            status,
        })
    }

    /// Delete the one stack with this name and wait for it to go
    pub async fn delete(&self, stack_name: &str) -> Result<StackOutcome> {
        let stacks = self.provider.list_stacks_by_name(stack_name).await?;
        let [stack] = stacks.as_slice() else {
            return Err(CloudError::AmbiguousStack {
                name: stack_name.to_string(),
                count: stacks.len(),
            });
        };

        info!(stack = stack_name, id = %stack.id, "deleting stack");
        self.provider.delete_stack(stack_name).await?;

        // The name stops resolving once deleted; the id keeps working
        let status = self
            .settle(&stack.id, stack_name, StackAction::Delete)
            .await?;
        Ok(StackOutcome {
            stack_name: stack_name.to_string(),
            action: StackAction::Delete,
            status,
        })
    }

    async fn settle(&self, stack_ref: &str, stack_name: &str, action: StackAction) -> Result<String> {
        let status = wait_until_settled(&self.provider, stack_ref, &self.poll, |status| {
            if let Some(observer) = &self.observer {
                observer(stack_name, status);
            }
        })
        .await?;

        action.check(stack_name, &status)?;
        info!(stack = stack_name, status = %status, "stack {action} successfully");
        Ok(status)
    }
}
