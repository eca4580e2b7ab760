//! Management stack lifecycle
//!
//! The management stack owns the bucket that stores every template artifact
//! and the parameter pointing at it. `init` deploys it, `teardown` removes
//! it again.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{CloudError, Result};
use crate::provider::{CloudProvider, OnFailure, StackRequest, TemplateSource};
use crate::reconcile::{StackOutcome, StackReconciler};
use crate::settings::{management_parameter, management_stack_name};

/// Template parameter selecting the bucket's object lock mode
pub const BUCKET_TYPE_PARAMETER: &str = "BucketType";

/// Object lock mode of the management bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BucketMode {
    #[default]
    Standard,
    Compliance,
    Governance,
}

impl BucketMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Compliance => "COMPLIANCE",
            Self::Governance => "GOVERNANCE",
        }
    }

    /// Locked buckets cannot be emptied before teardown
    pub fn is_locked(&self) -> bool {
        !matches!(self, Self::Standard)
    }
}

impl fmt::Display for BucketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BucketMode {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(Self::Standard),
            "COMPLIANCE" => Ok(Self::Compliance),
            "GOVERNANCE" => Ok(Self::Governance),
            _ => Err(CloudError::Settings(format!(
                "unknown bucket mode '{s}', expected standard, compliance or governance"
            ))),
        }
    }
}

/// The management stack of a reconciler's product
pub struct ManagementStack<'a, P: CloudProvider> {
    reconciler: &'a StackReconciler<P>,
}

impl<'a, P: CloudProvider> ManagementStack<'a, P> {
    pub fn new(reconciler: &'a StackReconciler<P>) -> Self {
        Self { reconciler }
    }

    pub fn stack_name(&self) -> String {
        management_stack_name(self.reconciler.product())
    }

    /// Create or update the management stack from a template body
    ///
    /// No capabilities and no timeout are requested.
    pub async fn initialise(&self, template_body: String, mode: BucketMode) -> Result<StackOutcome> {
        info!(stack = %self.stack_name(), %mode, "initialising management stack");

        let request = StackRequest::new(self.stack_name(), TemplateSource::Body(template_body))
            .parameter(BUCKET_TYPE_PARAMETER, mode.as_str())
            .on_failure(OnFailure::Rollback);

        self.reconciler.create_or_update(request).await
    }

    /// Delete the management stack, optionally emptying its bucket first
    pub async fn teardown(&self, empty_bucket_first: bool) -> Result<StackOutcome> {
        let provider = self.reconciler.provider();
        let bucket = provider
            .get_parameter(&management_parameter(self.reconciler.product()))
            .await?;

        if empty_bucket_first {
            // Fails for compliance and governance buckets
            let removed = provider.empty_bucket(&bucket).await?;
            info!(bucket = %bucket, removed, "emptied management bucket");
        } else {
            warn!(bucket = %bucket, "management bucket not emptied, stack deletion fails unless it is empty");
        }

        self.reconciler.delete(&self.stack_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::PollConfig;
    use crate::provider::{MockProvider, StackAction};

    const PARAMETER: &str = "/BetterCF/.management/BetterCF-management-bucket-name";

    fn reconciler(mock: &MockProvider) -> StackReconciler<MockProvider> {
        StackReconciler::new(mock.clone()).with_poll_config(PollConfig::immediate())
    }

    #[test]
    fn test_bucket_mode_parse() {
        assert_eq!("standard".parse::<BucketMode>().unwrap(), BucketMode::Standard);
        assert_eq!("GOVERNANCE".parse::<BucketMode>().unwrap(), BucketMode::Governance);
        assert!("archive".parse::<BucketMode>().is_err());
        assert!(BucketMode::Compliance.is_locked());
        assert!(!BucketMode::default().is_locked());
    }

    #[tokio::test]
    async fn test_initialise_creates_stack() {
        let mock = MockProvider::new();
        let reconciler = reconciler(&mock);

        let outcome = ManagementStack::new(&reconciler)
            .initialise("{}".to_string(), BucketMode::Compliance)
            .await
            .unwrap();
        assert_eq!(outcome.stack_name, "BetterCF-management");
        assert_eq!(outcome.action, StackAction::Create);

        let request = &mock.created_requests()[0];
        assert!(request.capabilities.is_empty());
        assert_eq!(request.timeout_in_minutes, None);
        assert_eq!(request.on_failure, Some(OnFailure::Rollback));
        assert_eq!(request.parameters[0].key, "BucketType");
        assert_eq!(request.parameters[0].value, "COMPLIANCE");
    }

    #[tokio::test]
    async fn test_initialise_updates_existing() {
        let mock = MockProvider::new().with_stack("Acme-management", "{}");
        let reconciler = reconciler(&mock).with_product("Acme");

        let outcome = ManagementStack::new(&reconciler)
            .initialise("{}".to_string(), BucketMode::Standard)
            .await
            .unwrap();
        assert_eq!(outcome.action, StackAction::Update);
        assert_eq!(mock.updated_requests()[0].on_failure, None);
    }

    #[tokio::test]
    async fn test_teardown_empties_bucket() {
        let mock = MockProvider::new()
            .with_parameter(PARAMETER, "mgmt-bucket")
            .with_object("mgmt-bucket", "network/0.1", "{}")
            .with_stack("BetterCF-management", "{}");
        let reconciler = reconciler(&mock);

        let outcome = ManagementStack::new(&reconciler).teardown(true).await.unwrap();

        assert_eq!(outcome.status, "DELETE_COMPLETE");
        assert!(mock.object("mgmt-bucket", "network/0.1").is_none());
    }

    #[tokio::test]
    async fn test_teardown_keeps_objects_without_force() {
        let mock = MockProvider::new()
            .with_parameter(PARAMETER, "mgmt-bucket")
            .with_object("mgmt-bucket", "network/0.1", "{}")
            .with_stack("BetterCF-management", "{}");
        let reconciler = reconciler(&mock);

        ManagementStack::new(&reconciler).teardown(false).await.unwrap();
        assert!(mock.object("mgmt-bucket", "network/0.1").is_some());
    }

    #[tokio::test]
    async fn test_teardown_without_init() {
        let mock = MockProvider::new();
        let reconciler = reconciler(&mock);

        let err = ManagementStack::new(&reconciler).teardown(false).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
