//! Stack specification types

use serde::Serialize;
use std::collections::BTreeMap;

use crate::overrides::ResourceOverrides;
use crate::region::Region;
use crate::version::Version;

/// A stored template artifact, addressed by name and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    /// Artifact name
    pub name: String,

    /// Artifact version
    pub version: Version,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Object key of the artifact in the management bucket
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// Everything needed to deploy one stack
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSpec {
    /// Version of the stack config document itself
    pub version: Version,

    /// Template artifact to deploy
    pub template: TemplateRef,

    /// Environment type, e.g. `prod`
    pub env_type: String,

    /// Target region
    pub region: Region,

    /// Free-form identifier distinguishing stacks of the same template
    pub identifier: String,

    /// IAM role CloudFormation assumes for the stack operations
    pub role_arn: Option<String>,

    /// Template parameter values
    pub template_parameters: BTreeMap<String, String>,

    /// Structural patch applied to the template before deploying
    pub resource_overrides: ResourceOverrides,
}

impl StackSpec {
    /// The stack name, `<template>-<env>-<region code>-<identifier>` lowercased
    pub fn stack_name(&self) -> String {
        generate_stack_name(
            &self.template.name,
            &self.env_type,
            self.region.code(),
            &self.identifier,
        )
    }

    pub fn has_overrides(&self) -> bool {
        !self.resource_overrides.is_empty()
    }
}

/// Join the name parts with `-` and lowercase the result
pub fn generate_stack_name(
    template_name: &str,
    env_type: &str,
    region_code: &str,
    identifier: &str,
) -> String {
    [template_name, env_type, region_code, identifier]
        .join("-")
        .to_lowercase()
}
