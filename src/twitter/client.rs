//! The caller-facing client.

use log::{debug, info};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::session::SessionManager;

use super::api::RequestExecutor;
use super::constants::Operation;
use super::parsing::extract;
use super::timeline::{bottom_cursor, collect_entries, TimelinePage};

/// Client for the web GraphQL API.
///
/// Owns the session manager and executor; the resource methods live in the
/// `users`, `tweets` and `search` modules.
#[derive(Clone)]
pub struct TwitterClient {
    executor: RequestExecutor,
    base_url: String,
    max_auth_retries: u32,
}

impl TwitterClient {
    /// Creates a client. No request is made and no session is loaded until the
    /// first call.
    pub fn new(config: ScraperConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let max_auth_retries = config.max_auth_retries;
        let sessions = Arc::new(SessionManager::new(config, authenticator)?);
        info!("Twitter client initialized for {}", base_url);

        Ok(TwitterClient {
            executor: RequestExecutor::new(sessions),
            base_url,
            max_auth_retries,
        })
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.executor.sessions()
    }

    pub fn url_for(&self, operation: Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    /// Calls a GraphQL operation with its `variables`, its fixed `features` and
    /// optional `fieldToggles`.
    pub async fn graphql(
        &self,
        operation: Operation,
        variables: &Value,
        field_toggles: Option<&Value>,
    ) -> Result<Value> {
        let mut params = vec![
            ("variables", serde_json::to_string(variables)?),
            ("features", serde_json::to_string(&operation.features())?),
        ];
        if let Some(toggles) = field_toggles {
            params.push(("fieldToggles", serde_json::to_string(toggles)?));
        }

        debug!("Calling {} with variables {}", operation.name(), variables);
        self.executor
            .execute(
                Method::GET,
                &self.url_for(operation),
                &params,
                self.max_auth_retries,
            )
            .await
    }
}

/// Extracts one timeline page from the instructions found at `instructions`.
pub(crate) fn timeline_page(
    instructions: Option<&Value>,
    include_module_items: bool,
    nested_prefixes: &[&str],
    author_filter: Option<&str>,
) -> TimelinePage {
    let instructions = instructions
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let entries = collect_entries(instructions, include_module_items);
    let tweets = extract(&entries, nested_prefixes, author_filter);
    debug!(
        "Extracted {} tweets from {} entries",
        tweets.len(),
        entries.len()
    );

    TimelinePage {
        tweets,
        next_cursor: bottom_cursor(instructions),
    }
}
