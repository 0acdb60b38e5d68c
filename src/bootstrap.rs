//! Make sure every source workspace has its aggregate channel on the destination.

use crate::directory::{create_channel, list_all_channels};
use crate::error::{AggregatorError, Result};
use crate::relay::aggregate_channel_name;
use crate::slack::{Channel, MessagingApi};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub created: Vec<Channel>,
    /// Aggregate channels that were already there.
    pub existing: Vec<String>,
    /// Channels that could not be created, with the reason.
    pub failed: Vec<(String, AggregatorError)>,
}

impl BootstrapReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Create `aggr-<workspace>` for each workspace that lacks one.
///
/// One listing sweep up front; a failed create is recorded and the batch carries on.
pub async fn ensure_aggregate_channels<'a>(
    dest: &dyn MessagingApi,
    workspaces: impl IntoIterator<Item = &'a str>,
) -> Result<BootstrapReport> {
    let present: HashSet<String> = list_all_channels(dest)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut report = BootstrapReport::default();
    for workspace in workspaces {
        let name = aggregate_channel_name(workspace);
        if present.contains(&name) {
            tracing::debug!(channel = %name, "Aggregate channel exists");
            report.existing.push(name);
            continue;
        }

        match create_channel(dest, &name).await {
            Ok(channel) => {
                tracing::info!(channel = %name, channel_id = %channel.id.as_str(), "Created aggregate channel");
                report.created.push(channel);
            }
            Err(e) => {
                tracing::warn!(channel = %name, error = %e, "Failed to create aggregate channel");
                report.failed.push((name, e));
            }
        }
    }

    tracing::info!(
        created = report.created.len(),
        existing = report.existing.len(),
        failed = report.failed.len(),
        "Aggregate channel bootstrap complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{FakeWorkspace, channel};

    #[tokio::test]
    async fn test_creates_only_missing_channels() {
        let fake = FakeWorkspace::new().with_pages(vec![
            vec![channel("C1", "general")],
            vec![channel("C2", "aggr-teamA")],
        ]);

        let report = ensure_aggregate_channels(&fake, ["teamA", "teamB", "teamC"])
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.existing, vec!["aggr-teamA".to_string()]);
        let created: Vec<_> = report.created.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(created, vec!["aggr-teamB", "aggr-teamC"]);
        assert_eq!(fake.list_call_count(), 2);
    }

    #[tokio::test]
    async fn test_create_failure_does_not_stop_batch() {
        let fake = FakeWorkspace::new()
            .with_channels(&["general"])
            .failing_create("aggr-teamA");

        let report = ensure_aggregate_channels(&fake, ["teamA", "teamB"])
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "aggr-teamA");
        assert_eq!(report.failed[0].1.kind(), ErrorKind::ChannelCreate);
        assert_eq!(report.created.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let fake = FakeWorkspace::new().failing_list();

        let err = ensure_aggregate_channels(&fake, ["teamA"]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SlackApi);
        assert!(fake.created.lock().unwrap().is_empty());
    }
}
