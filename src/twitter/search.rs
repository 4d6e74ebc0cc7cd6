//! Search timeline queries.

use log::info;
use serde_json::json;

use crate::error::Result;

use super::client::{timeline_page, TwitterClient};
use super::constants::Operation;
use super::normalize::TweetRecord;
use super::timeline::TimelinePage;

/// Entry prefixes whose items are flattened in search results.
pub const SEARCH_PREFIXES: [&str; 3] = ["search_by_raw_query", "search_timeline", "timeline"];

impl TwitterClient {
    /// Searches the latest tweets matching `keywords`.
    pub async fn search(
        &self,
        keywords: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<Vec<TweetRecord>> {
        Ok(self.search_page(keywords, count, cursor).await?.tweets)
    }

    /// Like [`TwitterClient::search`], also returning the cursor of the next page.
    pub async fn search_page(
        &self,
        keywords: &str,
        count: u32,
        cursor: Option<&str>,
    ) -> Result<TimelinePage> {
        info!("Searching for '{}' ({} results)", keywords, count);

        let mut variables = json!({
            "rawQuery": keywords,
            "count": count,
            "querySource": "typed_query",
            "product": "Latest",
        });
        if let Some(cursor) = cursor {
            variables["cursor"] = json!(cursor);
        }

        let data = self
            .graphql(Operation::SearchTimeline, &variables, None)
            .await?;
        let instructions =
            data.pointer("/data/search_by_raw_query/search_timeline/timeline/instructions");

        let page = timeline_page(instructions, true, &SEARCH_PREFIXES, None);
        info!("Search for '{}' returned {} tweets", keywords, page.tweets.len());
        Ok(page)
    }
}
