//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Config error - stack config or settings rejected
pub const CONFIG_ERROR: i32 = 2;

/// Template error - unreadable template body or failed resource overrides
pub const TEMPLATE_ERROR: i32 = 3;

/// Version error - malformed, missing or conflicting versions
pub const VERSION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Not found - stack, object or management parameter missing
pub const NOT_FOUND: i32 = 6;

/// Deployment failed - stack settled in a failure status or could not be addressed
pub const DEPLOYMENT_FAILED: i32 = 7;

/// Provider error - the cloud API rejected a call
pub const PROVIDER_ERROR: i32 = 8;

/// Interrupted - cancelled with Ctrl-C (128 + SIGINT)
pub const INTERRUPTED: i32 = 130;
