use crate::error::Result;
use crate::slack::{
    Channel, ChannelId, ChannelListFilter, ChannelPage, HistoryMessage, MessageTs, PostRequest,
    PostedMessage, UserProfile,
};
use async_trait::async_trait;

/// The remote capabilities the relay needs from a messaging workspace.
///
/// `SlackClient` is the production implementation; anything exposing the same
/// five operations can stand in for it.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Fetch one page of `conversations.list`.
    async fn list_conversations(
        &self,
        filter: ChannelListFilter,
        cursor: Option<&str>,
    ) -> Result<ChannelPage>;

    /// Fetch the message posted at exactly `ts`, if any.
    async fn conversation_history_at(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<Option<HistoryMessage>>;

    async fn post_message(&self, request: &PostRequest) -> Result<PostedMessage>;

    async fn user_info(&self, user_id: &str) -> Result<UserProfile>;

    async fn create_conversation(&self, name: &str, is_private: bool) -> Result<Channel>;
}
