//! Cloud provider contract
//!
//! Everything the reconciler and the artifact store need from the outside
//! world goes through [`CloudProvider`]:
//! - **Stacks**: template lookup, create/update/delete and status queries
//! - **Objects**: template artifact storage in the management bucket
//! - **Parameters**: locating the management bucket
//!
//! [`AwsProvider`] talks to the real services. [`MockProvider`] keeps
//! everything in memory for tests.

mod aws;
mod mock;

pub use aws::AwsProvider;
pub use mock::{MockProvider, OperationCounts};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::error::{CloudError, Result};

/// Stack creation timeout applied to every deploy
pub const DEFAULT_STACK_TIMEOUT_MINUTES: u32 = 30;

/// Capabilities acknowledged for every deployed stack
pub const DEPLOY_CAPABILITIES: [Capability; 2] = [Capability::AutoExpand, Capability::NamedIam];

/// Provider contract for stack and artifact operations
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Fetch the current template body of a stack
    ///
    /// Returns [`CloudError::NotFound`] when the stack does not exist.
    async fn get_stack_template(&self, stack_name: &str) -> Result<String>;

    /// Create a stack
    async fn create_stack(&self, request: &StackRequest) -> Result<()>;

    /// Update an existing stack
    async fn update_stack(&self, request: &StackRequest) -> Result<()>;

    /// Request deletion of a stack
    async fn delete_stack(&self, stack_name: &str) -> Result<()>;

    /// Current status string of a stack, addressed by name or id
    async fn describe_stack_status(&self, stack: &str) -> Result<String>;

    /// All live stacks with this name
    async fn list_stacks_by_name(&self, stack_name: &str) -> Result<Vec<StackSummary>>;

    /// Store an object
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;

    /// Read an object, [`CloudError::NotFound`] if absent
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// All object keys under a prefix
    async fn list_object_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Read a parameter value, [`CloudError::NotFound`] if absent
    async fn get_parameter(&self, name: &str) -> Result<String>;

    /// Raw location constraint of a bucket
    ///
    /// `None` or an empty string means `us-east-1`.
    async fn get_bucket_region(&self, bucket: &str) -> Result<Option<String>>;

    /// Delete every object version in a bucket, returning how many were removed
    async fn empty_bucket(&self, bucket: &str) -> Result<usize>;

    /// Check if a stack exists
    async fn stack_exists(&self, stack_name: &str) -> Result<bool> {
        match self.get_stack_template(stack_name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Where the provider reads the template from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateSource {
    /// Object URL in the management bucket
    Url(String),
    /// Inline template body
    Body(String),
}

/// Stack capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    #[serde(rename = "CAPABILITY_IAM")]
    Iam,
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,
    #[serde(rename = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iam => "CAPABILITY_IAM",
            Self::NamedIam => "CAPABILITY_NAMED_IAM",
            Self::AutoExpand => "CAPABILITY_AUTO_EXPAND",
        }
    }
}

/// What the provider does when stack creation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnFailure {
    DoNothing,
    Rollback,
    Delete,
}

impl OnFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoNothing => "DO_NOTHING",
            Self::Rollback => "ROLLBACK",
            Self::Delete => "DELETE",
        }
    }
}

/// A template parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackParameter {
    pub key: String,
    pub value: String,
    pub use_previous_value: bool,
}

impl StackParameter {
    /// Explicit value, never the previous one
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            use_previous_value: false,
        }
    }
}

/// A create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackRequest {
    pub stack_name: String,
    pub template: TemplateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_in_minutes: Option<u32>,
    pub capabilities: Vec<Capability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<OnFailure>,
    pub parameters: Vec<StackParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl StackRequest {
    /// Bare request with no timeout, capabilities or parameters
    pub fn new(stack_name: impl Into<String>, template: TemplateSource) -> Self {
        Self {
            stack_name: stack_name.into(),
            template,
            timeout_in_minutes: None,
            capabilities: Vec::new(),
            on_failure: None,
            parameters: Vec::new(),
            role_arn: None,
        }
    }

    /// Set the creation timeout
    pub fn timeout_minutes(mut self, minutes: u32) -> Self {
        self.timeout_in_minutes = Some(minutes);
        self
    }

    /// Set the acknowledged capabilities
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Set the failure policy
    pub fn on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = Some(on_failure);
        self
    }

    /// Add a parameter
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(StackParameter::new(key, value));
        self
    }

    /// Set the service role
    pub fn role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Strip the fields the provider rejects on updates
    pub fn for_update(mut self) -> Self {
        self.timeout_in_minutes = None;
        self.on_failure = None;
        self
    }
}

/// A live stack as returned by a name lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSummary {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// Which mutation a stack went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Create,
    Update,
    Delete,
}

impl StackAction {
    /// Statuses that count as success for this action
    pub fn success_statuses(&self) -> &'static [&'static str] {
        match self {
            Self::Create | Self::Update => &["CREATE_COMPLETE", "UPDATE_COMPLETE"],
            Self::Delete => &["DELETE_COMPLETE"],
        }
    }

    pub fn is_success(&self, status: &str) -> bool {
        self.success_statuses().contains(&status)
    }

    /// Fail unless `status` is a success status
    pub fn check(&self, stack: &str, status: &str) -> Result<()> {
        if self.is_success(status) {
            Ok(())
        } else {
            Err(CloudError::TerminalFailure {
                stack: stack.to_string(),
                action: self.noun(),
                status: status.to_string(),
            })
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Create => "creation",
            Self::Update => "update",
            Self::Delete => "deletion",
        }
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "created"),
            Self::Update => write!(f, "updated"),
            Self::Delete => write!(f, "deleted"),
        }
    }
}
