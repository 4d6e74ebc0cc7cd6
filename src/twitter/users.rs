//! User lookups and user timelines.

use log::{info, warn};
use serde_json::{json, Value};

use crate::error::Result;

use super::client::{timeline_page, TwitterClient};
use super::constants::Operation;
use super::normalize::TweetRecord;
use super::timeline::TimelinePage;

impl TwitterClient {
    /// Looks up a user profile by screen name.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(user))`: The `data.user.result` object, when it carries a `rest_id`
    /// - `Ok(None)`: If the user does not exist or is restricted
    /// - `Err(...)`: If the request fails
    pub async fn get_user_by_screen_name(&self, screen_name: &str) -> Result<Option<Value>> {
        info!("Looking up user by screen name: {}", screen_name);

        let variables = json!({
            "screen_name": screen_name,
            "withSafetyModeUserFields": true,
        });
        let toggles = json!({ "withAuxiliaryUserLabels": false });
        let data = self
            .graphql(Operation::UserByScreenName, &variables, Some(&toggles))
            .await?;

        match data.pointer("/data/user/result") {
            Some(user) if user.get("rest_id").and_then(Value::as_str).is_some() => {
                Ok(Some(user.clone()))
            }
            _ => {
                warn!("User {} not found or restricted", screen_name);
                Ok(None)
            }
        }
    }

    /// Fetches tweets posted by `user_id`, newest first.
    ///
    /// Records authored by anyone else (pinned conversations, injected
    /// retweet targets) are filtered out.
    pub async fn fetch_user_timeline(
        &self,
        user_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<Vec<TweetRecord>> {
        Ok(self
            .fetch_user_timeline_page(user_id, count, cursor)
            .await?
            .tweets)
    }

    /// Like [`TwitterClient::fetch_user_timeline`], also returning the cursor of the next page.
    pub async fn fetch_user_timeline_page(
        &self,
        user_id: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<TimelinePage> {
        info!("Fetching {} tweets of user {}", count, user_id);

        let mut variables = json!({
            "userId": user_id,
            "count": count,
            "includePromotedContent": true,
            "withQuickPromoteEligibilityTweetFields": true,
            "withVoice": true,
            "withV2Timeline": true,
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = json!(cursor);
        }

        let data = self
            .graphql(Operation::UserTweets, &variables, None)
            .await?;
        let instructions = data
            .pointer("/data/user/result/timeline_v2/timeline/instructions")
            .or_else(|| data.pointer("/data/user/result/timeline/timeline/instructions"));

        let page = timeline_page(instructions, true, &[], Some(user_id));
        info!("Fetched {} tweets of user {}", page.tweets.len(), user_id);
        Ok(page)
    }
}
