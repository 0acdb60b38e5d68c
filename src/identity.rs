//! Provenance labels for relayed messages.

use crate::error::{ErrorContext, Result};
use crate::event::{ChannelTypeCode, MessageEvent};
use crate::slack::{MessagingApi, UserProfile};

/// Label used for messages that carry no user id (bots, integrations).
pub const BOT_LABEL: &str = "bot";

/// Username and avatar a relayed message is posted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedIdentity {
    pub display_name: String,
    pub icon_url: String,
}

/// Everything the identity lookup produced for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub label: String,
    pub channel_type: ChannelTypeCode,
    pub position: String,
    pub icon_url: String,
}

impl ResolvedIdentity {
    /// `label@<t>:<position>`, e.g. `alice@c:general`.
    pub fn display_name(&self) -> String {
        format_display_name(&self.label, self.channel_type, &self.position)
    }

    pub fn relayed(&self) -> RelayedIdentity {
        RelayedIdentity {
            display_name: self.display_name(),
            icon_url: self.icon_url.clone(),
        }
    }
}

pub fn format_display_name(label: &str, channel_type: ChannelTypeCode, position: &str) -> String {
    format!("{}@{}:{}", label, channel_type.code_char(), position)
}

async fn lookup_user(source: &dyn MessagingApi, user_id: &str) -> Result<UserProfile> {
    source
        .user_info(user_id)
        .await
        .map_err(|e| e.into_identity(ErrorContext::new("users.info", user_id)))
}

/// Resolve a user id to the name shown in relayed text.
pub async fn resolve_user_label(source: &dyn MessagingApi, user_id: &str) -> Result<String> {
    Ok(lookup_user(source, user_id).await?.best_name().to_string())
}

/// Work out who a source event should appear to come from.
///
/// Direct messages are positioned by the counterpart (the sender when the
/// counterpart is unknown) and carry the sender's avatar; channel and group
/// messages are positioned by the source channel name.
pub async fn resolve_display_identity(
    source: &dyn MessagingApi,
    event: &MessageEvent,
) -> Result<ResolvedIdentity> {
    let profile = match &event.user_id {
        Some(user_id) => Some(lookup_user(source, user_id.as_str()).await?),
        None => None,
    };

    let label = profile
        .as_ref()
        .map(|p| p.best_name().to_string())
        .unwrap_or_else(|| BOT_LABEL.to_string());

    let (position, icon_url) = if event.channel_type.is_direct() {
        let position = match &event.counterpart {
            Some(counterpart) => lookup_user(source, counterpart.as_str())
                .await?
                .best_name()
                .to_string(),
            None => label.clone(),
        };
        let icon = profile
            .as_ref()
            .and_then(|p| p.image_192.clone())
            .unwrap_or_default();
        (position, icon)
    } else {
        (event.source_channel_name.clone(), String::new())
    };

    tracing::debug!(
        workspace = %event.source_workspace,
        label = %label,
        channel_type = %event.channel_type,
        position = %position,
        "Resolved display identity"
    );

    Ok(ResolvedIdentity {
        label,
        channel_type: event.channel_type,
        position,
        icon_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::slack::{ChannelId, MessageTs, UserId};
    use crate::testing::FakeWorkspace;

    fn event(user: Option<&str>, channel_type: ChannelTypeCode) -> MessageEvent {
        MessageEvent {
            source_workspace: "teamA".to_string(),
            source_channel_id: ChannelId::new("C1"),
            source_channel_name: "general".to_string(),
            user_id: user.map(UserId::new),
            counterpart: None,
            text: "hi".to_string(),
            timestamp: MessageTs::new("1700000000.000100"),
            attachments: vec![],
            channel_type,
        }
    }

    fn workspace() -> FakeWorkspace {
        FakeWorkspace::new()
            .with_user("U1", "alice", Some("https://img/alice_192.png"))
            .with_user("U_BOB", "bob", Some("https://img/bob_192.png"))
            .with_user("U_CAROL", "carol", None)
    }

    fn direct(counterpart: &str) -> MessageEvent {
        let mut ev = event(Some("U1"), ChannelTypeCode::Im);
        ev.counterpart = Some(UserId::new(counterpart));
        ev
    }

    #[test]
    fn test_format_display_name() {
        assert_eq!(
            format_display_name("alice", ChannelTypeCode::Channel, "general"),
            "alice@c:general"
        );
        assert_eq!(
            format_display_name("alice", ChannelTypeCode::Im, "alice"),
            "alice@i:alice"
        );
    }

    #[tokio::test]
    async fn test_channel_message_positioned_by_channel_without_icon() {
        let fake = workspace();

        let identity = resolve_display_identity(&fake, &event(Some("U1"), ChannelTypeCode::Channel))
            .await
            .unwrap();

        assert_eq!(identity.display_name(), "alice@c:general");
        assert_eq!(identity.icon_url, "");
    }

    #[tokio::test]
    async fn test_group_message_uses_g() {
        let fake = workspace();

        let identity = resolve_display_identity(&fake, &event(Some("U1"), ChannelTypeCode::Group))
            .await
            .unwrap();

        assert_eq!(identity.display_name(), "alice@g:general");
    }

    #[tokio::test]
    async fn test_direct_message_positioned_by_counterpart_with_sender_icon() {
        let fake = workspace();

        let identity = resolve_display_identity(&fake, &direct("U_BOB")).await.unwrap();

        assert_eq!(identity.display_name(), "alice@i:bob");
        assert_eq!(identity.icon_url, "https://img/alice_192.png");
    }

    #[tokio::test]
    async fn test_direct_messages_to_different_people_stay_apart() {
        let fake = workspace();

        let to_bob = resolve_display_identity(&fake, &direct("U_BOB")).await.unwrap();
        let to_carol = resolve_display_identity(&fake, &direct("U_CAROL")).await.unwrap();

        assert_eq!(to_bob.label, to_carol.label);
        assert_ne!(to_bob.display_name(), to_carol.display_name());
        assert_eq!(to_carol.display_name(), "alice@i:carol");
    }

    #[tokio::test]
    async fn test_direct_message_without_counterpart_uses_sender() {
        let fake = workspace();

        let identity = resolve_display_identity(&fake, &event(Some("U1"), ChannelTypeCode::Im))
            .await
            .unwrap();

        assert_eq!(identity.display_name(), "alice@i:alice");
    }

    #[tokio::test]
    async fn test_unknown_counterpart_is_identity_error() {
        let fake = workspace();

        let err = resolve_display_identity(&fake, &direct("U404")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IdentityResolution);
        assert_eq!(err.context().unwrap().target, "U404");
    }

    #[tokio::test]
    async fn test_bot_message_needs_no_lookup() {
        let fake = workspace();

        let identity = resolve_display_identity(&fake, &event(None, ChannelTypeCode::Channel))
            .await
            .unwrap();

        assert_eq!(identity.display_name(), "bot@c:general");
        assert_eq!(fake.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_identity_is_deterministic() {
        let fake = workspace();
        let ev = event(Some("U1"), ChannelTypeCode::Channel);

        let first = resolve_display_identity(&fake, &ev).await.unwrap();
        let second = resolve_display_identity(&fake, &ev).await.unwrap();

        assert_eq!(first.display_name(), second.display_name());
        assert_eq!(first.relayed(), second.relayed());
    }

    #[tokio::test]
    async fn test_unknown_user_is_identity_error() {
        let fake = workspace();

        let err = resolve_display_identity(&fake, &event(Some("U404"), ChannelTypeCode::Channel))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IdentityResolution);
        assert_eq!(err.context().unwrap().target, "U404");
    }
}
