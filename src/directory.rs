//! Channel lookups over cursor-paginated `conversations.list`.

use crate::error::{AggregatorError, ErrorContext, Result};
use crate::logging::Timer;
use crate::slack::{Channel, ChannelId, ChannelListFilter, HistoryMessage, MessageTs, MessagingApi};
use futures::{Stream, TryStreamExt, pin_mut};
use std::collections::HashSet;

struct Sweep {
    cursor: Option<String>,
    seen: HashSet<String>,
    done: bool,
}

/// Lazily page through the workspace's conversations, one batch per API call.
///
/// The stream ends after the page that carries no cursor, or after a page whose
/// cursor was already followed in this sweep. Dropping the stream early issues
/// no further calls.
pub fn channel_pages(
    client: &dyn MessagingApi,
    filter: ChannelListFilter,
) -> impl Stream<Item = Result<Vec<Channel>>> + Send + '_ {
    let sweep = Sweep {
        cursor: None,
        seen: HashSet::new(),
        done: false,
    };

    futures::stream::try_unfold(sweep, move |mut sweep| async move {
        if sweep.done {
            return Ok::<_, AggregatorError>(None);
        }

        let page = client
            .list_conversations(filter, sweep.cursor.as_deref())
            .await?;

        match page.next_cursor {
            Some(next) if !sweep.seen.insert(next.clone()) => {
                tracing::warn!(cursor = %next, "Cursor repeated, ending channel sweep");
                sweep.done = true;
            }
            Some(next) => sweep.cursor = Some(next),
            None => sweep.done = true,
        }

        Ok(Some((page.channels, sweep)))
    })
}

/// Find a public or private channel by exact name, stopping at the first page that has it.
pub async fn find_channel_by_name(client: &dyn MessagingApi, name: &str) -> Result<Channel> {
    let _timer = Timer::new("find_channel_by_name");

    let pages = channel_pages(client, ChannelListFilter::Channels);
    pin_mut!(pages);

    let mut scanned = 0usize;
    while let Some(batch) = pages.try_next().await? {
        scanned += batch.len();
        if let Some(channel) = batch.into_iter().find(|c| c.name == name) {
            tracing::debug!(channel = %name, channel_id = %channel.id.as_str(), "Channel found");
            return Ok(channel);
        }
    }

    tracing::debug!(channel = %name, scanned = scanned, "Channel not found");
    Err(AggregatorError::ChannelNotFound(ErrorContext::new(
        "conversations.list",
        name,
    )))
}

/// Every non-archived conversation visible to the token.
pub async fn list_all_channels(client: &dyn MessagingApi) -> Result<Vec<Channel>> {
    let _timer = Timer::new("list_all_channels");

    let channels: Vec<Channel> = channel_pages(client, ChannelListFilter::AllActive)
        .try_concat()
        .await?;

    tracing::debug!(count = channels.len(), "Listed channels");
    Ok(channels)
}

/// Create a public channel. An existing channel with the same name is also an error.
pub async fn create_channel(client: &dyn MessagingApi, name: &str) -> Result<Channel> {
    client
        .create_conversation(name, false)
        .await
        .map_err(|e| match e {
            AggregatorError::SlackApi { context, reason } => {
                AggregatorError::ChannelCreate { context, reason }
            }
            other => AggregatorError::ChannelCreate {
                context: ErrorContext::new("conversations.create", name),
                reason: other.to_string(),
            },
        })
}

/// Fetch the single message posted at `ts` in `channel`.
pub async fn fetch_message(
    client: &dyn MessagingApi,
    channel: &ChannelId,
    ts: &MessageTs,
) -> Result<HistoryMessage> {
    client
        .conversation_history_at(channel, ts)
        .await?
        .ok_or_else(|| {
            AggregatorError::MessageNotFound(ErrorContext::new(
                "conversations.history",
                format!("{}@{}", channel.as_str(), ts.as_str()),
            ))
        })
}
