use crate::error::Result;
use crate::identity::resolve_user_label;
use crate::slack::MessagingApi;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@(U[A-Za-z0-9]+)>").expect("valid mention regex"));

/// Distinct user ids mentioned as `<@Uxxxx>`, in order of first appearance.
pub fn mention_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for capture in USER_MENTION.captures_iter(text) {
        let id = &capture[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Replace every mentioned user id with that user's display name.
///
/// `<@U123>` becomes `<@alice>`. All ids are resolved before the text is
/// touched; if any lookup fails the whole rewrite fails.
pub async fn rewrite_mentions(text: &str, source: &dyn MessagingApi) -> Result<String> {
    let ids = mention_ids(text);
    if ids.is_empty() {
        return Ok(text.to_string());
    }

    let mut resolved = HashMap::with_capacity(ids.len());
    for id in ids {
        let name = resolve_user_label(source, &id).await?;
        resolved.insert(id, name);
    }

    // Single pass, so a resolved name is never itself rewritten.
    let rewritten = USER_MENTION.replace_all(text, |caps: &Captures| {
        match resolved.get(&caps[1]) {
            Some(name) => format!("<@{}>", name),
            None => caps[0].to_string(),
        }
    });

    tracing::debug!(mentions = resolved.len(), "Rewrote user mentions");
    Ok(rewritten.into_owned())
}
