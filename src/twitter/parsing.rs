//! Entry extraction: flattens timeline entries into tweet records.
//!
//! Entries are selected by `entryId` prefix (case-sensitive). Entries of
//! nesting kinds (conversation threads, search wrappers) contribute their
//! `content.items`, which already have the shape of entries. Anything that
//! does not resolve to a tweet node is skipped without error.

use log::debug;
use serde_json::{Map, Value};

use super::normalize::{normalize_node, resolve_tweet_node, TweetRecord};

pub const TWEET_ENTRY_PREFIX: &str = "tweet-";
pub const PROFILE_GRID_ENTRY_PREFIX: &str = "profile-grid-0-tweet-";

/// Extracts tweet records from timeline entries.
///
/// # Parameters
///
/// - `entries`: Entries in timeline order
/// - `nested_prefixes`: Entry id prefixes whose `content.items` are flattened in place
/// - `author_filter`: When set, only records whose author id equals it are kept
///
/// # Returns
///
/// Records in entry order, then nested item order, with a retweet's standalone
/// record right after the retweeting tweet.
pub fn extract(
    entries: &[Value],
    nested_prefixes: &[&str],
    author_filter: Option<&str>,
) -> Vec<TweetRecord> {
    let mut retained: Vec<&Value> = Vec::new();

    for entry in entries {
        let Some(id) = entry_id(entry) else {
            continue;
        };
        if id.starts_with(TWEET_ENTRY_PREFIX) || id.starts_with(PROFILE_GRID_ENTRY_PREFIX) {
            retained.push(entry);
        }
        for prefix in nested_prefixes {
            if id.starts_with(prefix) {
                if let Some(items) = entry
                    .get("content")
                    .and_then(|content| content.get("items"))
                    .and_then(Value::as_array)
                {
                    retained.extend(items.iter());
                }
            }
        }
    }

    let mut records = Vec::new();
    for entry in retained {
        if entry_id(entry).is_none() {
            continue;
        }
        let Some(normalized) = entry_tweet_result(entry)
            .and_then(resolve_tweet_node)
            .and_then(normalize_node)
        else {
            debug!(
                "Entry {} holds no tweet with a legacy payload, skipping",
                entry_id(entry).unwrap_or_default()
            );
            continue;
        };

        let candidates = std::iter::once(normalized.tweet).chain(normalized.retweet);
        for record in candidates {
            let keep = match author_filter {
                Some(author) => record.author_id() == Some(author),
                None => true,
            };
            if keep {
                records.push(record);
            }
        }
    }

    records
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry
        .get("entryId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// The tweet result of an entry: `content.tweetResult.result` or
/// `itemContent.tweet_results.result` under the entry's content, where module
/// items keep their content under `item` instead of `content`.
fn entry_tweet_result(entry: &Value) -> Option<&Value> {
    let content = non_empty_object(entry.get("content"))
        .or_else(|| non_empty_object(entry.get("item")))?;

    let via_tweet_result = content
        .get("content")
        .and_then(|c| c.get("tweetResult"))
        .and_then(|t| t.get("result"));
    let via_item_content = content
        .get("itemContent")
        .and_then(|c| c.get("tweet_results"))
        .and_then(|t| t.get("result"));

    via_tweet_result
        .filter(|result| non_empty_object(Some(result)).is_some())
        .or(via_item_content)
}

fn non_empty_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|object| !object.is_empty())
}
