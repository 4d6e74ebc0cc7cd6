//! X/Twitter web API integration module.
//!
//! This module contains the request executor, the caller-facing client and the
//! timeline normalization engine that turns GraphQL responses into flat tweet
//! records.

mod api;
mod client;
mod constants;
mod normalize;
mod parsing;
mod search;
mod timeline;
mod tweets;
mod users;

// Re-export public API
pub use api::{is_soft_auth_failure, rate_limit_delay, RequestExecutor};
pub use client::TwitterClient;
pub use constants::{Operation, BEARER_TOKEN};
pub use normalize::{normalize, normalize_node, resolve_tweet_node, NormalizedTweet, TweetRecord};
pub use parsing::{extract, PROFILE_GRID_ENTRY_PREFIX, TWEET_ENTRY_PREFIX};
pub use search::SEARCH_PREFIXES;
pub use timeline::{bottom_cursor, collect_entries, Instruction, TimelinePage};
pub use tweets::CONVERSATION_PREFIXES;
