//! XRPC client for the two calls a cross-post needs.
//!
//! `com.atproto.server.createSession` trades a handle and app password for
//! an access token; `com.atproto.repo.createRecord` writes an
//! `app.bsky.feed.post` into the account's repo.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use keepsake::{CrossPostError, CrossPoster, ExternalRef};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text::truncate_text;

const POST_COLLECTION: &str = "app.bsky.feed.post";
const DEFAULT_MAX_CHARS: usize = 300;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Login identifier plus app password.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub app_password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, app_password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            app_password: app_password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

/// The account a set of credentials belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub did: String,
    pub handle: String,
}

/// A created post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
}

#[derive(Serialize)]
struct CreateSession<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Serialize)]
struct CreateRecord<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecord<'a>,
}

/// Errors from the XRPC service.
#[derive(Debug, thiserror::Error)]
pub enum BlueskyError {
    /// Could not reach the service
    #[error("Transport error: {0}")]
    Transport(String),

    /// Service answered with a failure status; `message` is its explanation
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response was not what the lexicon promises
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No Bluesky credentials configured")]
    MissingCredentials,
}

impl BlueskyError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach Bluesky. Check your connection.".to_string(),
            Self::Http { status: 401, .. } => "Invalid Bluesky credentials".to_string(),
            Self::Http { message, .. } => message.clone(),
            Self::Protocol(_) => "Bluesky sent an unexpected response.".to_string(),
            Self::MissingCredentials => {
                "Connect a Bluesky account to cross-post.".to_string()
            }
        }
    }
}

/// Client bound to one XRPC service.
pub struct BlueskyClient {
    service_url: String,
    client: Client,
    credentials: Option<Credentials>,
    max_chars: usize,
    timeout: Duration,
}

impl BlueskyClient {
    /// `service_url` is the PDS base, e.g. `https://bsky.social`.
    pub fn new(service_url: &str) -> Self {
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            credentials: None,
            max_chars: DEFAULT_MAX_CHARS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Log in and report which account the credentials belong to.
    #[tracing::instrument(skip(self, credentials), fields(xrpc.url = %self.service_url, identifier = %credentials.identifier))]
    pub async fn verify(&self, credentials: &Credentials) -> Result<Account, BlueskyError> {
        let session = self.create_session(credentials).await?;
        tracing::info!(did = %session.did, handle = %session.handle, "Bluesky credentials verified");
        Ok(Account {
            did: session.did,
            handle: session.handle,
        })
    }

    /// Post `text`, truncated to the character budget, as the configured account.
    #[tracing::instrument(skip(self, text), fields(xrpc.url = %self.service_url, text.len = text.chars().count()))]
    pub async fn post(&self, text: &str) -> Result<PostRef, BlueskyError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(BlueskyError::MissingCredentials)?;
        let session = self.create_session(credentials).await?;

        let text = truncate_text(text, self.max_chars);
        let body = CreateRecord {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text: &text,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };

        let response = self
            .call(
                "com.atproto.repo.createRecord",
                &body,
                Some(&session.access_jwt),
            )
            .await?;

        let post: PostRef = serde_json::from_value(response)
            .map_err(|e| BlueskyError::Protocol(format!("Invalid createRecord response: {}", e)))?;
        tracing::info!(uri = %post.uri, "Bluesky post created");
        Ok(post)
    }

    async fn create_session(&self, credentials: &Credentials) -> Result<SessionResponse, BlueskyError> {
        let body = CreateSession {
            identifier: &credentials.identifier,
            password: &credentials.app_password,
        };
        let response = self
            .call("com.atproto.server.createSession", &body, None)
            .await?;
        serde_json::from_value(response)
            .map_err(|e| BlueskyError::Protocol(format!("Invalid createSession response: {}", e)))
    }

    /// POST a procedure call and return the JSON body.
    async fn call<B: Serialize + ?Sized>(
        &self,
        nsid: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<Value, BlueskyError> {
        let url = format!("{}/xrpc/{}", self.service_url, nsid);
        let mut request = self.client.post(&url).timeout(self.timeout).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlueskyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlueskyError::Http {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BlueskyError::Protocol(format!("Failed to parse response: {}", e)))
    }
}

/// XRPC errors are `{"error": "...", "message": "..."}`; fall back to the
/// status text when the body is not that.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

#[async_trait]
impl CrossPoster for BlueskyClient {
    async fn post_text(&self, text: &str) -> Result<ExternalRef, CrossPostError> {
        match self.post(text).await {
            Ok(post) => Ok(ExternalRef {
                uri: post.uri,
                cid: Some(post.cid),
            }),
            Err(e) => Err(CrossPostError(e.to_string())),
        }
    }
}
