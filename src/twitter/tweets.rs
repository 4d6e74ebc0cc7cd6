//! Tweet detail (conversation) lookups.

use log::info;
use serde_json::json;

use crate::error::Result;

use super::client::{timeline_page, TwitterClient};
use super::constants::Operation;
use super::normalize::TweetRecord;

/// Entry prefixes of conversation modules in a tweet detail response.
pub const CONVERSATION_PREFIXES: [&str; 2] = ["homeConversation-", "conversationthread-"];

impl TwitterClient {
    /// Fetches a tweet together with the visible part of its conversation.
    pub async fn fetch_tweet_detail(&self, tweet_id: &str) -> Result<Vec<TweetRecord>> {
        info!("Fetching tweet detail for {}", tweet_id);

        let variables = json!({
            "focalTweetId": tweet_id,
            "with_rux_injections": false,
            "includePromotedContent": true,
            "withCommunity": true,
            "withQuickPromoteEligibilityTweetFields": true,
            "withBirdwatchNotes": true,
            "withVoice": true,
            "withV2Timeline": true,
        });
        let toggles = json!({ "withArticleRichContentState": false });

        let data = self
            .graphql(Operation::TweetDetail, &variables, Some(&toggles))
            .await?;
        let instructions = data.pointer("/data/threaded_conversation_with_injections_v2/instructions");

        let page = timeline_page(instructions, false, &CONVERSATION_PREFIXES, None);
        info!("Tweet {} detail holds {} tweets", tweet_id, page.tweets.len());
        Ok(page.tweets)
    }
}
