//! Waiting for a stack to settle
//!
//! A stack is settled once its status no longer contains `IN_PROGRESS`.
//! The poller sleeps one interval before every status query, so the first
//! query happens after one interval.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::provider::CloudProvider;

/// Substring marking a status as transitional
pub const IN_PROGRESS_MARKER: &str = "IN_PROGRESS";

/// Check if a stack status is transitional
pub fn is_in_progress(status: &str) -> bool {
    status.contains(IN_PROGRESS_MARKER)
}

/// Poll interval and optional deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Sleep before each status query
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Give up after this long; unbounded when unset
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: None,
        }
    }
}

impl PollConfig {
    /// Poll without sleeping, for tests
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Query `stack` until it settles, returning the settled status
///
/// `observe` sees every status, including the settled one.
pub async fn wait_until_settled<P, F>(
    provider: &P,
    stack: &str,
    config: &PollConfig,
    mut observe: F,
) -> Result<String>
where
    P: CloudProvider + ?Sized,
    F: FnMut(&str),
{
    let start = Instant::now();

    loop {
        tokio::time::sleep(config.interval).await;

        let status = provider.describe_stack_status(stack).await?;
        debug!(stack, status = %status, "polled stack status");
        observe(&status);

        if !is_in_progress(&status) {
            return Ok(status);
        }

        if let Some(timeout) = config.timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(CloudError::Timeout {
                    stack: stack.to_string(),
                    status,
                    elapsed: humantime_serde::re::humantime::format_duration(timeout).to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, StackRequest, TemplateSource};

    async fn created(script: &[&str]) -> MockProvider {
        let mock = MockProvider::new();
        mock.script_statuses("foo", script.iter().copied());
        mock.create_stack(&StackRequest::new("foo", TemplateSource::Body("{}".into())))
            .await
            .unwrap();
        mock
    }

    #[test]
    fn test_is_in_progress() {
        assert!(is_in_progress("CREATE_IN_PROGRESS"));
        assert!(is_in_progress("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"));
        assert!(!is_in_progress("ROLLBACK_COMPLETE"));
        assert!(!is_in_progress(""));
    }

    #[test]
    fn test_poll_config_default() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_poll_config_humantime() {
        let config: PollConfig = serde_yaml::from_str("interval: 2s\ntimeout: 30m\n").unwrap();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Some(Duration::from_secs(1800)));

        let config: PollConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PollConfig::default());
    }

    #[tokio::test]
    async fn test_wait_until_settled() {
        let mock = created(&[
            "CREATE_IN_PROGRESS",
            "CREATE_IN_PROGRESS",
            "CREATE_COMPLETE",
        ])
        .await;

        let mut seen = Vec::new();
        let status = wait_until_settled(&mock, "foo", &PollConfig::immediate(), |s| {
            seen.push(s.to_string())
        })
        .await
        .unwrap();

        assert_eq!(status, "CREATE_COMPLETE");
        assert_eq!(seen.len(), 3);
        assert_eq!(mock.operation_counts().status_queries, 3);
    }

    #[tokio::test]
    async fn test_failure_status_is_returned_not_raised() {
        let mock = created(&["CREATE_IN_PROGRESS", "ROLLBACK_COMPLETE"]).await;

        let status = wait_until_settled(&mock, "foo", &PollConfig::immediate(), |_| {})
            .await
            .unwrap();
        assert_eq!(status, "ROLLBACK_COMPLETE");
    }

    #[tokio::test]
    async fn test_timeout() {
        let mock = created(&["CREATE_IN_PROGRESS"]).await;
        let config = PollConfig::immediate().with_timeout(Duration::ZERO);

        let err = wait_until_settled(&mock, "foo", &config, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Timeout { status, .. } if status == "CREATE_IN_PROGRESS"));
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let mock = MockProvider::new();
        let err = wait_until_settled(&mock, "missing", &PollConfig::immediate(), |_| {})
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
