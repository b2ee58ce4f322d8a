//! Slack-compatible chat notifier
//!
//! Channel messages go through `chat.postMessage`. Direct messages resolve the
//! owner with `users.lookupByEmail` and post to the returned user id; lookups
//! are cached for the lifetime of the notifier.

use async_trait::async_trait;
use reaper_cloud_api::{Notifier, NotifyError, NotifyResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Request timeout for every API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
}

impl ApiResponse {
    fn into_result(self, method: &str) -> NotifyResult<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(NotifyError::Api(format!(
                "{} returned {}",
                method,
                self.error.as_deref().unwrap_or("an unspecified error")
            )))
        }
    }
}

/// Notifier for a Slack-compatible Web API
pub struct SlackNotifier {
    client: Client,
    api_base: String,
    channel: String,
    token: String,
    user_ids: Mutex<HashMap<String, String>>,
}

impl SlackNotifier {
    pub fn new(
        api_base: impl Into<String>,
        channel: impl Into<String>,
        token: impl Into<String>,
    ) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            channel: channel.into(),
            token: token.into(),
            user_ids: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn post_message(&self, channel: &str, text: &str) -> NotifyResult<()> {
        let response: ApiResponse = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        response.into_result("chat.postMessage")?;
        debug!(channel, "Message posted");
        Ok(())
    }

    async fn lookup_user(&self, email: &str) -> NotifyResult<String> {
        if let Some(id) = self.user_ids.lock().await.get(email) {
            return Ok(id.clone());
        }

        let response: ApiResponse = self
            .client
            .get(self.url("users.lookupByEmail"))
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;

        let id = match response.into_result("users.lookupByEmail") {
            Ok(ApiResponse { user: Some(user), .. }) => user.id,
            Ok(_) => return Err(NotifyError::UnknownUser(email.to_string())),
            Err(NotifyError::Api(msg)) if msg.ends_with("users_not_found") => {
                return Err(NotifyError::UnknownUser(email.to_string()));
            }
            Err(e) => return Err(e),
        };

        self.user_ids
            .lock()
            .await
            .insert(email.to_string(), id.clone());
        Ok(id)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_channel(&self, text: &str) -> NotifyResult<()> {
        self.post_message(&self.channel, text).await
    }

    async fn send_direct(&self, email: &str, text: &str) -> NotifyResult<()> {
        let user = self.lookup_user(email).await?;
        self.post_message(&user, text).await
    }
}
