//! In-process workspace used by unit tests in place of the Slack Web API.

use crate::error::{AggregatorError, ErrorContext, Result};
use crate::slack::{
    Channel, ChannelId, ChannelListFilter, ChannelPage, HistoryMessage, MessageTs, MessagingApi,
    PostRequest, PostedMessage, UserProfile,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn channel(id: &str, name: &str) -> Channel {
    Channel {
        id: ChannelId::new(id),
        name: name.to_string(),
        is_private: false,
        is_archived: false,
    }
}

/// Records every call it receives. Page `N` is addressed by cursor `cN`; the
/// first request (no cursor) gets page 0.
#[derive(Default)]
pub struct FakeWorkspace {
    pages: Vec<ChannelPage>,
    users: HashMap<String, UserProfile>,
    history: HashMap<(String, String), HistoryMessage>,
    fail_post_at: Option<usize>,
    fail_create: HashSet<String>,
    fail_list: bool,
    pub list_calls: Mutex<Vec<(ChannelListFilter, Option<String>)>>,
    pub user_lookups: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<PostRequest>>,
    pub created: Mutex<Vec<String>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel names as a single page, ids `C0`, `C1`, ...
    pub fn with_channels(self, names: &[&str]) -> Self {
        let page = names
            .iter()
            .enumerate()
            .map(|(i, name)| channel(&format!("C{}", i), name))
            .collect();
        self.with_pages(vec![page])
    }

    /// Pages chained by cursors `c1`, `c2`, ...; the last page has no cursor.
    pub fn with_pages(self, pages: Vec<Vec<Channel>>) -> Self {
        let count = pages.len();
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, channels)| ChannelPage {
                channels,
                next_cursor: (i + 1 < count).then(|| format!("c{}", i + 1)),
            })
            .collect();
        self.with_raw_pages(pages)
    }

    pub fn with_raw_pages(mut self, pages: Vec<ChannelPage>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_user(mut self, id: &str, display_name: &str, image: Option<&str>) -> Self {
        self.users.insert(
            id.to_string(),
            UserProfile {
                name: display_name.to_lowercase(),
                real_name: None,
                display_name: Some(display_name.to_string()),
                image_192: image.map(str::to_string),
            },
        );
        self
    }

    pub fn with_message(mut self, channel: &str, message: HistoryMessage) -> Self {
        self.history
            .insert((channel.to_string(), message.ts.clone()), message);
        self
    }

    /// Fail the `index`-th post (0-based).
    pub fn failing_post_at(mut self, index: usize) -> Self {
        self.fail_post_at = Some(index);
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }

    pub fn lookup_count(&self) -> usize {
        self.user_lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingApi for FakeWorkspace {
    async fn list_conversations(
        &self,
        filter: ChannelListFilter,
        cursor: Option<&str>,
    ) -> Result<ChannelPage> {
        self.list_calls
            .lock()
            .unwrap()
            .push((filter, cursor.map(str::to_string)));

        let context = ErrorContext::new("conversations.list", cursor.unwrap_or(""));
        if self.fail_list {
            return Err(AggregatorError::slack_api(context, "ratelimited"));
        }

        let index = match cursor {
            None => 0,
            Some(c) => c
                .strip_prefix('c')
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| AggregatorError::slack_api(context.clone(), "invalid_cursor"))?,
        };

        match self.pages.get(index) {
            Some(page) => Ok(page.clone()),
            None if index == 0 => Ok(ChannelPage::default()),
            None => Err(AggregatorError::slack_api(context, "invalid_cursor")),
        }
    }

    async fn conversation_history_at(
        &self,
        channel: &ChannelId,
        ts: &MessageTs,
    ) -> Result<Option<HistoryMessage>> {
        Ok(self
            .history
            .get(&(channel.as_str().to_string(), ts.as_str().to_string()))
            .cloned())
    }

    async fn post_message(&self, request: &PostRequest) -> Result<PostedMessage> {
        let mut posts = self.posts.lock().unwrap();
        let index = posts.len();
        if self.fail_post_at == Some(index) {
            return Err(AggregatorError::slack_api(
                ErrorContext::new("chat.postMessage", request.channel.as_str()),
                "msg_too_long",
            ));
        }
        posts.push(request.clone());

        Ok(PostedMessage {
            channel: ChannelId::new(request.channel.clone()),
            ts: MessageTs::new(format!("1700000000.{:06}", index)),
        })
    }

    async fn user_info(&self, user_id: &str) -> Result<UserProfile> {
        self.user_lookups.lock().unwrap().push(user_id.to_string());
        self.users.get(user_id).cloned().ok_or_else(|| {
            AggregatorError::slack_api(ErrorContext::new("users.info", user_id), "user_not_found")
        })
    }

    async fn create_conversation(&self, name: &str, _is_private: bool) -> Result<Channel> {
        if self.fail_create.contains(name) {
            return Err(AggregatorError::slack_api(
                ErrorContext::new("conversations.create", name),
                "name_taken",
            ));
        }
        let mut created = self.created.lock().unwrap();
        created.push(name.to_string());
        Ok(channel(&format!("N{}", created.len()), name))
    }
}
