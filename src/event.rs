use crate::slack::{Attachment, ChannelId, HistoryMessage, MessageTs, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of conversation a source message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelTypeCode {
    User,
    Channel,
    Group,
    Im,
}

impl ChannelTypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Channel => "channel",
            Self::Group => "group",
            Self::Im => "im",
        }
    }

    /// Single lowercase character used in relayed usernames (`u`, `c`, `g`, `i`).
    pub fn code_char(&self) -> char {
        match self {
            Self::User => 'u',
            Self::Channel => 'c',
            Self::Group => 'g',
            Self::Im => 'i',
        }
    }

    /// Conversation type implied by a channel id: `C` public, `G` private, `D` direct.
    pub fn from_channel_id(id: &ChannelId) -> Option<Self> {
        match id.as_str().chars().next()? {
            'C' => Some(Self::Channel),
            'G' => Some(Self::Group),
            'D' => Some(Self::Im),
            _ => None,
        }
    }

    /// Direct conversations are labelled by the counterpart, not by a channel name.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::User | Self::Im)
    }
}

impl fmt::Display for ChannelTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message received from a source workspace, ready to be relayed.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub source_workspace: String,
    pub source_channel_id: ChannelId,
    pub source_channel_name: String,
    /// Absent for bot and integration messages.
    pub user_id: Option<UserId>,
    /// The other member of a direct conversation.
    pub counterpart: Option<UserId>,
    pub text: String,
    pub timestamp: MessageTs,
    pub attachments: Vec<Attachment>,
    pub channel_type: ChannelTypeCode,
}

impl MessageEvent {
    /// Build an event from a message fetched out of channel history.
    pub fn from_history(
        source_workspace: impl Into<String>,
        channel_id: ChannelId,
        channel_name: impl Into<String>,
        channel_type: ChannelTypeCode,
        message: HistoryMessage,
    ) -> Self {
        Self {
            source_workspace: source_workspace.into(),
            source_channel_id: channel_id,
            source_channel_name: channel_name.into(),
            user_id: message.user.map(UserId::new),
            counterpart: None,
            text: message.text,
            timestamp: MessageTs::new(message.ts),
            attachments: message.attachments,
            channel_type,
        }
    }

    pub fn with_counterpart(mut self, counterpart: Option<UserId>) -> Self {
        self.counterpart = counterpart;
        self
    }
}
