use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTs(pub String);

impl MessageTs {
    pub fn new(ts: impl Into<String>) -> Self {
        Self(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A conversation as returned by `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub is_private: bool,
    pub is_archived: bool,
}

/// Which conversation types a listing sweep asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelListFilter {
    /// Public and private channels only.
    Channels,
    /// Whatever the API lists by default, archived channels excluded.
    AllActive,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Default)]
pub struct ChannelPage {
    pub channels: Vec<Channel>,
    /// Empty or absent means the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Legacy Slack message attachment. Field names follow the Slack wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_icon: Option<String>,
    /// Everything else (`fields`, `ts`, `mrkdwn_in`, `blocks`, `actions`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A message pulled from `conversations.history`.
#[derive(Debug, Clone, Default)]
pub struct HistoryMessage {
    pub ts: String,
    pub user: Option<String>,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Profile data needed to label a relayed message.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    /// Handle (e.g. "john.doe")
    pub name: String,
    pub real_name: Option<String>,
    pub display_name: Option<String>,
    /// 192px avatar
    pub image_192: Option<String>,
}

impl UserProfile {
    /// Get best available name for display
    pub fn best_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.real_name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(&self.name)
    }
}

/// Body of a single `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub channel: String,
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
    pub username: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: ChannelId,
    pub ts: MessageTs,
}
