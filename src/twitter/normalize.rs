//! Record normalization: turns one raw tweet node into a flat tweet record.
//!
//! A tweet node keeps its attributes in a `legacy` object and references its
//! author, quoted tweet and retweeted tweet as further nodes. The flat record is
//! the `legacy` object with those references resolved in place:
//!
//! - `user`: the author's `legacy` attributes
//! - `id_str`: the node's `rest_id`
//! - `quoted_status`: the quoted tweet's record (one level, no further nesting)
//! - `retweeted_status`: the retweeted tweet's record
//!
//! Every lookup is optional. A node without a `legacy` object yields nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A flattened tweet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweetRecord(Map<String, Value>);

impl TweetRecord {
    pub fn id(&self) -> Option<&str> {
        self.0.get("id_str").and_then(Value::as_str)
    }

    /// Id of the author: `user_id_str`, else the injected `user.id_str`.
    pub fn author_id(&self) -> Option<&str> {
        self.0
            .get("user_id_str")
            .and_then(Value::as_str)
            .or_else(|| self.user()?.get("id_str")?.as_str())
    }

    pub fn user(&self) -> Option<&Map<String, Value>> {
        self.0.get("user").and_then(Value::as_object)
    }

    pub fn retweeted_status(&self) -> Option<&Map<String, Value>> {
        self.0.get("retweeted_status").and_then(Value::as_object)
    }

    pub fn quoted_status(&self) -> Option<&Map<String, Value>> {
        self.0.get("quoted_status").and_then(Value::as_object)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<TweetRecord> for Value {
    fn from(record: TweetRecord) -> Self {
        Value::Object(record.0)
    }
}

/// A normalized tweet plus, for retweets, the standalone record of the retweeted tweet.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTweet {
    pub tweet: TweetRecord,
    pub retweet: Option<TweetRecord>,
}

/// The shapes a tweet result can take.
#[derive(Debug, Clone, Copy)]
enum TweetNode<'a> {
    Tweet(&'a Value),
    /// `TweetWithVisibilityResults`: the real node sits under `tweet`.
    VisibilityLimited(&'a Value),
}

impl<'a> TweetNode<'a> {
    fn classify(result: &'a Value) -> Option<Self> {
        let object = result.as_object()?;
        match object.get("tweet") {
            Some(inner) if inner.is_object() => Some(TweetNode::VisibilityLimited(inner)),
            Some(_) => None,
            None => Some(TweetNode::Tweet(result)),
        }
    }

    fn node(self) -> &'a Value {
        match self {
            TweetNode::Tweet(node) | TweetNode::VisibilityLimited(node) => node,
        }
    }
}

/// Resolves a tweet result to the node carrying the tweet, unwrapping one
/// level of visibility wrapper.
pub fn resolve_tweet_node(result: &Value) -> Option<&Value> {
    TweetNode::classify(result).map(TweetNode::node)
}

/// Normalizes a tweet node; `None` when the node has no `legacy` payload.
pub fn normalize(node: &Value) -> Option<TweetRecord> {
    normalize_node(node).map(|normalized| normalized.tweet)
}

/// Normalizes a tweet node and, when it is a retweet, the retweeted node too.
///
/// The retweet's record is embedded under `retweeted_status` of the outer record
/// and also returned on its own.
pub fn normalize_node(node: &Value) -> Option<NormalizedTweet> {
    let mut tweet = build_record(node, true)?;

    let retweet = legacy_of(node)
        .and_then(|legacy| legacy.get("retweeted_status_result"))
        .and_then(|reference| reference.get("result"))
        .and_then(resolve_tweet_node)
        .and_then(|retweet_node| build_record(retweet_node, true));

    if let Some(retweet) = &retweet {
        tweet.remove("retweeted_status_result");
        tweet.insert(
            "retweeted_status".to_string(),
            Value::Object(retweet.clone()),
        );
    }

    Some(NormalizedTweet {
        tweet: TweetRecord(tweet),
        retweet: retweet.map(TweetRecord),
    })
}

fn build_record(node: &Value, with_quote: bool) -> Option<Map<String, Value>> {
    let mut record = legacy_of(node)?.clone();

    if let Some(user) = author_record(node) {
        record.insert("user".to_string(), Value::Object(user));
    }

    if let Some(rest_id) = node.get("rest_id").and_then(Value::as_str) {
        record.insert("id_str".to_string(), Value::String(rest_id.to_string()));
    }

    if with_quote {
        let quoted = node
            .get("quoted_status_result")
            .and_then(|reference| reference.get("result"))
            .and_then(resolve_tweet_node)
            .and_then(|quoted_node| build_record(quoted_node, false));
        if let Some(quoted) = quoted {
            record.insert("quoted_status".to_string(), Value::Object(quoted));
        }
    }

    Some(record)
}

fn legacy_of(node: &Value) -> Option<&Map<String, Value>> {
    node.get("legacy").and_then(Value::as_object)
}

fn author_node(node: &Value) -> Option<&Map<String, Value>> {
    let core = node.get("core")?;
    ["user_result", "user_results"]
        .iter()
        .filter_map(|key| core.get(*key)?.get("result")?.as_object())
        .find(|author| !author.is_empty())
}

/// The author's `legacy` attributes, completed with the scalar fields of the
/// author's newer `core` object and its `rest_id` where `legacy` lacks them.
fn author_record(node: &Value) -> Option<Map<String, Value>> {
    let author = author_node(node)?;
    let mut user = author.get("legacy")?.as_object()?.clone();

    if let Some(core) = author.get("core").and_then(Value::as_object) {
        for (key, value) in core {
            if !value.is_object() && !value.is_array() {
                user.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    if let Some(rest_id) = author.get("rest_id").and_then(Value::as_str) {
        user.entry("id_str".to_string())
            .or_insert_with(|| Value::String(rest_id.to_string()));
    }

    Some(user)
}
