//! Relay one source message into its aggregate channel.
//!
//! A relay runs in two phases. [`RelayEngine::prepare`] checks the aggregate
//! channel, resolves the sender identity and rewrites mentions; it makes no
//! writes. [`RelayEngine::execute`] then posts the text and every attachment
//! and appends one correlation record per successful post. A message that
//! fails to prepare is never partially posted.

use crate::correlation::{CorrelationLog, CorrelationRecord};
use crate::directory::{fetch_message, find_channel_by_name};
use crate::error::{ErrorContext, Result};
use crate::event::{ChannelTypeCode, MessageEvent};
use crate::identity::{RelayedIdentity, resolve_display_identity};
use crate::logging::{Timer, log_error};
use crate::mentions::rewrite_mentions;
use crate::registry::WorkspaceRegistry;
use crate::slack::{
    Attachment, Channel, ChannelId, MessageTs, MessagingApi, PostRequest, PostedMessage, UserId,
};
use std::sync::Arc;
use tracing::Instrument;

/// Every aggregate channel name starts with this.
pub const AGGREGATE_PREFIX: &str = "aggr-";

/// `teamA` -> `aggr-teamA`
pub fn aggregate_channel_name(workspace: &str) -> String {
    format!("{}{}", AGGREGATE_PREFIX, workspace)
}

/// `aggr-teamA` -> `teamA`; names without the prefix come back unchanged.
pub fn workspace_from_aggregate(channel_name: &str) -> &str {
    channel_name
        .strip_prefix(AGGREGATE_PREFIX)
        .unwrap_or(channel_name)
}

/// A fully resolved relay, ready to post.
#[derive(Debug, Clone)]
pub struct PreparedRelay {
    pub channel: Channel,
    pub workspace: String,
    pub identity: RelayedIdentity,
    /// Source channel name, or the counterpart for direct messages.
    pub position: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub source_timestamp: MessageTs,
}

impl PreparedRelay {
    /// Posts in the order they are sent: the text first (if any), then one per attachment.
    pub fn posts(&self) -> Vec<PostRequest> {
        let icon_url = Some(self.identity.icon_url.clone()).filter(|url| !url.is_empty());

        let text_post = (!self.text.is_empty()).then(|| PostRequest {
            channel: self.channel.id.as_str().to_string(),
            text: Some(self.text.clone()),
            attachment: None,
            username: self.identity.display_name.clone(),
            icon_url: icon_url.clone(),
        });

        let attachment_posts = self.attachments.iter().map(|attachment| PostRequest {
            channel: self.channel.id.as_str().to_string(),
            text: None,
            attachment: Some(attachment.clone()),
            username: self.identity.display_name.clone(),
            icon_url: icon_url.clone(),
        });

        text_post.into_iter().chain(attachment_posts).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachments.is_empty()
    }
}

/// What a relay actually posted.
#[derive(Debug, Clone, Default)]
pub struct RelayOutcome {
    pub posted: Vec<PostedMessage>,
}

pub struct RelayEngine {
    registry: Arc<WorkspaceRegistry>,
    log: Arc<dyn CorrelationLog>,
}

impl RelayEngine {
    pub fn new(registry: Arc<WorkspaceRegistry>, log: Arc<dyn CorrelationLog>) -> Self {
        Self { registry, log }
    }

    /// Resolve everything a relay needs without posting anything.
    pub async fn prepare(
        &self,
        dest: &dyn MessagingApi,
        source: &dyn MessagingApi,
        event: &MessageEvent,
        aggregate_channel: &str,
    ) -> Result<PreparedRelay> {
        let channel = find_channel_by_name(dest, aggregate_channel).await?;

        let identity = resolve_display_identity(source, event).await?;
        let text = rewrite_mentions(&event.text, source).await?;

        Ok(PreparedRelay {
            channel,
            workspace: workspace_from_aggregate(aggregate_channel).to_string(),
            identity: identity.relayed(),
            position: identity.position,
            text,
            attachments: event.attachments.clone(),
            source_timestamp: event.timestamp.clone(),
        })
    }

    /// Post a prepared relay, logging each successful post.
    ///
    /// Stops at the first failed post. Records for earlier posts are kept.
    pub async fn execute(
        &self,
        dest: &dyn MessagingApi,
        prepared: &PreparedRelay,
    ) -> Result<RelayOutcome> {
        let mut outcome = RelayOutcome::default();

        if prepared.is_empty() {
            tracing::debug!(
                workspace = %prepared.workspace,
                source_ts = %prepared.source_timestamp.as_str(),
                "Nothing to relay"
            );
            return Ok(outcome);
        }

        for request in prepared.posts() {
            let posted = dest.post_message(&request).await.map_err(|e| {
                e.into_post(ErrorContext::new(
                    "chat.postMessage",
                    prepared.channel.name.as_str(),
                ))
            })?;

            self.log
                .append(CorrelationRecord::new(
                    prepared.workspace.as_str(),
                    prepared.source_timestamp.as_str(),
                    prepared.position.as_str(),
                    prepared.text.as_str(),
                    posted.channel.as_str(),
                    posted.ts.as_str(),
                ))
                .await?;

            tracing::debug!(
                dest_channel = %posted.channel.as_str(),
                dest_ts = %posted.ts.as_str(),
                has_attachment = request.attachment.is_some(),
                "Posted relayed message"
            );
            outcome.posted.push(posted);
        }

        Ok(outcome)
    }

    /// Relay `event` from `source` into `aggregate_channel` on `dest`.
    pub async fn relay(
        &self,
        dest: &dyn MessagingApi,
        source: &dyn MessagingApi,
        event: &MessageEvent,
        aggregate_channel: &str,
    ) -> Result<RelayOutcome> {
        let _timer = Timer::new("relay");
        let span = tracing::info_span!(
            "relay",
            workspace = %event.source_workspace,
            channel = %event.source_channel_name,
            source_ts = %event.timestamp.as_str(),
            aggregate = %aggregate_channel,
        );

        async {
            let result = match self.prepare(dest, source, event, aggregate_channel).await {
                Ok(prepared) => self.execute(dest, &prepared).await,
                Err(e) => Err(e),
            };

            match &result {
                Ok(outcome) => tracing::info!(
                    posts = outcome.posted.len(),
                    attachments = event.attachments.len(),
                    "Relayed message"
                ),
                Err(e) => log_error("relay", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Relay using the registry's clients and the workspace's own aggregate channel.
    pub async fn relay_from_workspace(&self, event: &MessageEvent) -> Result<RelayOutcome> {
        let source = self.registry.source_client(&event.source_workspace)?;
        let dest = self.registry.destination_client();
        let aggregate = aggregate_channel_name(&event.source_workspace);

        self.relay(dest.as_ref(), source.as_ref(), event, &aggregate)
            .await
    }

    /// Fetch a source message by timestamp and relay it.
    ///
    /// `counterpart` names the other member when `channel_id` is a direct conversation.
    pub async fn relay_message_at(
        &self,
        workspace: &str,
        channel_id: &ChannelId,
        channel_name: &str,
        channel_type: ChannelTypeCode,
        counterpart: Option<UserId>,
        ts: &MessageTs,
    ) -> Result<RelayOutcome> {
        let source = self.registry.source_client(workspace)?;
        let message = fetch_message(source.as_ref(), channel_id, ts).await?;

        let event = MessageEvent::from_history(
            workspace,
            channel_id.clone(),
            channel_name,
            channel_type,
            message,
        )
        .with_counterpart(counterpart);
        self.relay_from_workspace(&event).await
    }
}
