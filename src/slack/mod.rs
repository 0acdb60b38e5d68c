mod api;
mod client;
mod types;

pub use api::MessagingApi;
pub use client::{SlackClient, new_hyper_client};
pub use types::{
    Attachment, Channel, ChannelId, ChannelListFilter, ChannelPage, HistoryMessage, MessageTs,
    PostRequest, PostedMessage, UserId, UserProfile,
};
