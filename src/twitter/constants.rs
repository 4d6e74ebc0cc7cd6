//! Fixed values of the web GraphQL API: operation paths and feature flag sets.

use serde_json::{json, Value};

/// Public bearer token of the web app, sent with every request.
pub const BEARER_TOKEN: &str =
    "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

/// Logical GraphQL operations consumed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UserTweets,
    UserByScreenName,
    HomeTimeline,
    HomeLatestTimeline,
    UserTweetsAndReplies,
    UserMedia,
    UserByRestId,
    SearchTimeline,
    ListLatestTweetsTimeline,
    TweetDetail,
    Likes,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::UserTweets => "UserTweets",
            Operation::UserByScreenName => "UserByScreenName",
            Operation::HomeTimeline => "HomeTimeline",
            Operation::HomeLatestTimeline => "HomeLatestTimeline",
            Operation::UserTweetsAndReplies => "UserTweetsAndReplies",
            Operation::UserMedia => "UserMedia",
            Operation::UserByRestId => "UserByRestId",
            Operation::SearchTimeline => "SearchTimeline",
            Operation::ListLatestTweetsTimeline => "ListLatestTweetsTimeline",
            Operation::TweetDetail => "TweetDetail",
            Operation::Likes => "Likes",
        }
    }

    /// Path relative to the API base URL, including the query id.
    pub fn path(self) -> &'static str {
        match self {
            Operation::UserTweets => "/graphql/E3opETHurmVJflFsUBVuUQ/UserTweets",
            Operation::UserByScreenName => "/graphql/Yka-W8dz7RaEuQNkroPkYw/UserByScreenName",
            Operation::HomeTimeline => "/graphql/HJFjzBgCs16TqxewQOeLNg/HomeTimeline",
            Operation::HomeLatestTimeline => "/graphql/DiTkXJgLqBBxCs7zaYsbtA/HomeLatestTimeline",
            Operation::UserTweetsAndReplies => {
                "/graphql/bt4TKuFz4T7Ckk-VvQVSow/UserTweetsAndReplies"
            }
            Operation::UserMedia => "/graphql/dexO_2tohK86JDudXXG3Yw/UserMedia",
            Operation::UserByRestId => "/graphql/Qw77dDjp9xCpUY-AXwt-yQ/UserByRestId",
            Operation::SearchTimeline => "/graphql/UN1i3zUiCWa-6r-Uaho4fw/SearchTimeline",
            Operation::ListLatestTweetsTimeline => {
                "/graphql/Pa45JvqZuKcW1plybfgBlQ/ListLatestTweetsTimeline"
            }
            Operation::TweetDetail => "/graphql/QuBlQ6SxNAQCt6-kBiCXCQ/TweetDetail",
            Operation::Likes => "/graphql/k5XapwcSikNsEsRLWkdFvA/Likes",
        }
    }

    /// The `features` parameter this operation must be called with.
    pub fn features(self) -> Value {
        match self {
            Operation::UserByScreenName | Operation::UserByRestId => user_features(),
            Operation::HomeLatestTimeline | Operation::TweetDetail => tweet_detail_features(),
            Operation::UserTweets
            | Operation::UserTweetsAndReplies
            | Operation::UserMedia
            | Operation::SearchTimeline
            | Operation::ListLatestTweetsTimeline
            | Operation::HomeTimeline
            | Operation::Likes => feed_features(),
        }
    }
}

fn user_features() -> Value {
    json!({
        "hidden_profile_subscriptions_enabled": true,
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "subscriptions_verification_info_is_identity_verified_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "responsive_web_twitter_article_notes_tab_enabled": true,
        "subscriptions_feature_can_gift_premium": true,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
    })
}

fn feed_features() -> Value {
    json!({
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "articles_preview_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "creator_subscriptions_quote_tweet_preview_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "rweb_video_timestamps_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_enhance_cards_enabled": false,
    })
}

// Same flags as the feed set today; kept separate because the web app ships
// them independently.
fn tweet_detail_features() -> Value {
    feed_features()
}
