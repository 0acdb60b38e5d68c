use crate::config::WorkspaceCredential;
use crate::error::{AggregatorError, ErrorContext, Result};
use crate::slack::{
    Attachment, Channel, ChannelId, ChannelListFilter, ChannelPage, HistoryMessage, MessageTs,
    MessagingApi, PostRequest, PostedMessage, UserProfile,
};
use async_trait::async_trait;
use slack_morphism::prelude::*;
use std::sync::Arc;

/// Slack Web API client bound to one workspace token.
pub struct SlackClient {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
    workspace: String,
}

impl SlackClient {
    pub fn new(credential: &WorkspaceCredential) -> Result<Self> {
        Ok(Self::with_client(new_hyper_client()?, credential))
    }

    /// Bind a token to an existing HTTP client so workspaces share one connection pool.
    pub fn with_client(client: Arc<SlackHyperClient>, credential: &WorkspaceCredential) -> Self {
        Self {
            client,
            token: SlackApiToken::new(credential.token.clone().into()),
            workspace: credential.name.clone(),
        }
    }
}

pub fn new_hyper_client() -> Result<Arc<SlackHyperClient>> {
    let connector = SlackClientHyperConnector::new().map_err(|e| {
        AggregatorError::slack_api(ErrorContext::new("connector", "hyper"), e)
    })?;
    Ok(Arc::new(slack_morphism::SlackClient::new(connector)))
}

fn channel_from_info(info: &SlackChannelInfo) -> Channel {
    Channel {
        id: ChannelId::new(info.id.to_string()),
        name: info.name.clone().unwrap_or_default(),
        is_private: info.flags.is_private.unwrap_or(false),
        is_archived: info.flags.is_archived.unwrap_or(false),
    }
}

fn history_message(message: SlackHistoryMessage) -> Result<HistoryMessage> {
    let attachments = message
        .content
        .attachments
        .unwrap_or_default()
        .iter()
        .map(|a| serde_json::to_value(a).and_then(serde_json::from_value::<Attachment>))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(HistoryMessage {
        ts: message.origin.ts.to_string(),
        user: message.sender.user.map(|u| u.to_string()),
        text: message.content.text.unwrap_or_default(),
        attachments,
    })
}

/// Slack marks the last page with an empty cursor rather than omitting it.
fn non_empty_cursor(cursor: Option<SlackCursorId>) -> Option<String> {
    cursor.map(|c| c.to_string()).filter(|c| !c.is_empty())
}

fn slack_attachment(attachment: &Attachment) -> Result<SlackMessageAttachment> {
    Ok(serde_json::from_value(serde_json::to_value(attachment)?)?)
}

fn icon_192(icon: &SlackIcon) -> Option<String> {
    icon.images
        .as_ref()
        .and_then(|images| {
            images
                .resolutions
                .iter()
                .find(|(size, _)| *size == 192)
                .map(|(_, url)| url.clone())
        })
        .or_else(|| icon.image_original.clone())
}

#[async_trait]
impl MessagingApi for SlackClient {
    async fn list_conversations(
        &self,
        filter: ChannelListFilter,
        cursor: Option<&str>,
    ) -> Result<ChannelPage> {
        let session = self.client.open_session(&self.token);

        let mut request = match filter {
            ChannelListFilter::Channels => SlackApiConversationsListRequest::new().with_types(
                vec![SlackConversationType::Public, SlackConversationType::Private],
            ),
            ChannelListFilter::AllActive => {
                SlackApiConversationsListRequest::new().with_exclude_archived(true)
            }
        };
        if let Some(cursor) = cursor {
            request = request.with_cursor(SlackCursorId(cursor.to_string()));
        }

        let response = session.conversations_list(&request).await.map_err(|e| {
            AggregatorError::slack_api(
                ErrorContext::new("conversations.list", self.workspace.as_str()),
                e,
            )
        })?;

        let next_cursor = non_empty_cursor(response.response_metadata.and_then(|m| m.next_cursor));

        tracing::debug!(
            workspace = %self.workspace,
            channels = response.channels.len(),
            has_next = next_cursor.is_some(),
            "Fetched conversation page"
        );

        Ok(ChannelPage {
            channels: response.channels.iter().map(channel_from_info).collect(),
            next_cursor,
        })
    }

    async fn conversation_history_at(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<Option<HistoryMessage>> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel.as_str().to_string()))
            .with_latest(SlackTs(ts.as_str().to_string()))
            .with_oldest(SlackTs(ts.as_str().to_string()))
            .with_inclusive(true)
            .with_limit(1);

        let response = session.conversations_history(&request).await.map_err(|e| {
            AggregatorError::slack_api(
                ErrorContext::new("conversations.history", channel.as_str()),
                e,
            )
        })?;

        response
            .messages
            .into_iter()
            .next()
            .map(history_message)
            .transpose()
    }

    async fn post_message(&self, request: &PostRequest) -> Result<PostedMessage> {
        let session = self.client.open_session(&self.token);

        let mut content = SlackMessageContent::new();
        if let Some(text) = &request.text {
            content = content.with_text(text.clone());
        }
        if let Some(attachment) = &request.attachment {
            content = content.with_attachments(vec![slack_attachment(attachment)?]);
        }

        let mut post = SlackApiChatPostMessageRequest::new(
            SlackChannelId(request.channel.clone()),
            content,
        );
        post.username = Some(request.username.clone());
        post.icon_url = request.icon_url.clone().filter(|url| !url.is_empty());

        let response = session.chat_post_message(&post).await.map_err(|e| {
            AggregatorError::slack_api(
                ErrorContext::new("chat.postMessage", request.channel.as_str()),
                e,
            )
        })?;

        Ok(PostedMessage {
            channel: ChannelId::new(response.channel.to_string()),
            ts: MessageTs::new(response.ts.to_string()),
        })
    }

    async fn user_info(&self, user_id: &str) -> Result<UserProfile> {
        let session = self.client.open_session(&self.token);

        let request = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

        let response = session
            .users_info(&request)
            .await
            .map_err(|e| AggregatorError::slack_api(ErrorContext::new("users.info", user_id), e))?;

        let user = response.user;
        let profile = user.profile.as_ref();

        Ok(UserProfile {
            name: user.name.clone().unwrap_or_else(|| user_id.to_string()),
            real_name: user.real_name.clone(),
            display_name: profile.and_then(|p| p.display_name.clone()),
            image_192: profile.and_then(|p| p.icon.as_ref()).and_then(icon_192),
        })
    }

    async fn create_conversation(&self, name: &str, is_private: bool) -> Result<Channel> {
        let session = self.client.open_session(&self.token);

        let request =
            SlackApiConversationsCreateRequest::new(name.to_string()).with_is_private(is_private);

        let response = session.conversations_create(&request).await.map_err(|e| {
            AggregatorError::slack_api(ErrorContext::new("conversations.create", name), e)
        })?;

        Ok(channel_from_info(&response.channel))
    }
}
