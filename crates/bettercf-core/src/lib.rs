//! BetterCF Core - Domain types for versioned CloudFormation deployments
//!
//! This crate provides the pieces that do not talk to the cloud:
//! - `Version`: two- or three-segment artifact versions with auto-increment
//! - `resolve`: latest-version selection over stored version strings
//! - `Region`: static region name / short code table
//! - `ResourceOverrides`: sentinel-keyed structural patches for templates
//! - `StackSpec`: a validated stack config document

pub mod config;
pub mod error;
pub mod overrides;
pub mod region;
pub mod resolve;
pub mod stack;
pub mod version;

pub use config::parse_stack_config;
pub use error::{CoreError, OverrideError, Result};
pub use overrides::{
    OverrideKey, OverrideOp, ResourceOverrides, apply_overrides, count_overrides, overridden,
};
pub use region::Region;
pub use resolve::{resolve_latest, resolve_latest_version};
pub use stack::{StackSpec, TemplateRef, generate_stack_name};
pub use version::{Increment, Version, VersionFormat};
