//! BetterCF Cloud - Provider integration for BetterCF
//!
//! This crate provides:
//! - **Provider contract**: `CloudProvider`, backed by the AWS SDK or kept in memory for tests
//! - **Stack reconciliation**: create-or-update and delete, polled until the stack settles
//! - **Artifact storage**: versioned template bodies in the management bucket
//! - **Management stack**: init and teardown of the bucket holding the artifacts
//! - **Settings**: product name, polling and AWS overrides from `config.yaml`

pub mod artifacts;
pub mod error;
pub mod management;
pub mod poll;
pub mod provider;
pub mod reconcile;
pub mod settings;

pub use artifacts::{ArtifactStore, DEFAULT_BUCKET_REGION};
pub use error::{CloudError, Result};
pub use management::{BucketMode, ManagementStack};
pub use poll::{PollConfig, is_in_progress, wait_until_settled};
pub use provider::{
    AwsProvider, Capability, CloudProvider, MockProvider, OnFailure, OperationCounts,
    StackAction, StackParameter, StackRequest, StackSummary, TemplateSource,
};
pub use reconcile::{DeployOptions, StackOutcome, StackReconciler, StatusObserver};
pub use settings::{AwsSettings, DEFAULT_PRODUCT, Settings};
