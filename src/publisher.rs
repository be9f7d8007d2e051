//! Credential handshake and status posting against the Twitter API v2.
//!
//! `publish` is the one place in the pipeline with a real state machine: a
//! bounded retry loop that waits out rate limiting with a fixed backoff and
//! fails immediately on anything else.

use crate::config::TwitterKeys;
use crate::generator::GeneratedMessage;
use crate::http_client::HttpClient;
use crate::oauth::RequestSigner;
use crate::providers::{Sleeper, TokioSleeper};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const VERIFY_URL: &str = "https://api.twitter.com/2/users/me";
const POST_URL: &str = "https://api.twitter.com/2/tweets";

/// Hard limit the posting service puts on a single status update.
pub const MAX_STATUS_CHARS: usize = 280;
/// Total publish attempts, including the first.
const PUBLISH_ATTEMPTS: u32 = 3;
/// Fixed wait between rate-limited attempts. No jitter, no growth.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("posting service rejected the credentials: {0}")]
    Rejected(String),
    #[error("credential verification failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("message is {0} characters, over the 280-character limit")]
    LengthExceeded(usize),
    #[error("still rate limited after {0} attempts")]
    RateLimited(u32),
    #[error("posting failed: {0}")]
    Service(String),
}

/// Verified posting identity, held for the rest of the run. Produced by
/// `authenticate`, consumed by `publish`; released implicitly at process
/// exit.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user_id: String,
    pub username: String,
}

/// Whether a candidate fits the posting limit. Pure function of length.
pub fn fits_status_limit(message: &GeneratedMessage) -> bool {
    message.char_count() <= MAX_STATUS_CHARS
}

#[async_trait]
pub trait StatusPublisher: Send + Sync {
    /// Verifies the credential set against the posting service. No retries;
    /// bad credentials are not transient.
    async fn authenticate(&self) -> Result<AuthenticatedSession, AuthError>;

    /// Posts one status update. The length precondition is checked before
    /// any network call is made.
    async fn publish(
        &self,
        session: &AuthenticatedSession,
        message: &GeneratedMessage,
    ) -> Result<(), PublishError>;
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    username: String,
}

/// Publisher backed by the Twitter API v2 with OAuth 1.0a user context.
pub struct TwitterPublisher {
    http: Arc<dyn HttpClient>,
    signer: RequestSigner,
    max_attempts: u32,
    backoff: Duration,
    sleeper: Box<dyn Sleeper>,
}

impl TwitterPublisher {
    pub fn new(http: Arc<dyn HttpClient>, keys: TwitterKeys) -> Self {
        Self::with_retry_policy(
            http,
            keys,
            PUBLISH_ATTEMPTS,
            RATE_LIMIT_BACKOFF,
            Box::new(TokioSleeper),
        )
    }

    /// Full-control constructor; tests use it to observe waits instead of
    /// sitting through them.
    pub fn with_retry_policy(
        http: Arc<dyn HttpClient>,
        keys: TwitterKeys,
        max_attempts: u32,
        backoff: Duration,
        sleeper: Box<dyn Sleeper>,
    ) -> Self {
        Self {
            http,
            signer: RequestSigner::new(keys),
            max_attempts,
            backoff,
            sleeper,
        }
    }
}

#[async_trait]
impl StatusPublisher for TwitterPublisher {
    async fn authenticate(&self) -> Result<AuthenticatedSession, AuthError> {
        info!("Verifying posting credentials");
        let header = self.signer.authorization_header("GET", VERIFY_URL, &[]);
        let response = self
            .http
            .get(VERIFY_URL, &[("Authorization", &header)])
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        match response.status {
            200 => {
                let user: UserResponse = serde_json::from_str(&response.body)
                    .map_err(|e| AuthError::Transport(format!("unexpected response shape: {e}")))?;
                info!("Authenticated as @{}", user.data.username);
                Ok(AuthenticatedSession {
                    user_id: user.data.id,
                    username: user.data.username,
                })
            }
            401 | 403 => Err(AuthError::Rejected(format!("HTTP {}", response.status))),
            status => Err(AuthError::Transport(format!(
                "credential check returned HTTP {status}"
            ))),
        }
    }

    async fn publish(
        &self,
        _session: &AuthenticatedSession,
        message: &GeneratedMessage,
    ) -> Result<(), PublishError> {
        if !fits_status_limit(message) {
            return Err(PublishError::LengthExceeded(message.char_count()));
        }

        let body = json!({ "text": message.text() });
        for attempt in 1..=self.max_attempts {
            let header = self.signer.authorization_header("POST", POST_URL, &[]);
            let response = self
                .http
                .post_json(POST_URL, &[("Authorization", &header)], &body)
                .await
                .map_err(|e| PublishError::Service(e.to_string()))?;

            if response.is_success() {
                info!("Status posted on attempt {attempt}");
                return Ok(());
            }
            if response.status != 429 {
                return Err(PublishError::Service(format!(
                    "posting service returned HTTP {}",
                    response.status
                )));
            }
            if attempt == self.max_attempts {
                warn!("Rate limited on final attempt {attempt}/{}", self.max_attempts);
                return Err(PublishError::RateLimited(attempt));
            }
            warn!(
                "Rate limited (attempt {attempt}/{}), waiting {}s before retrying",
                self.max_attempts,
                self.backoff.as_secs()
            );
            self.sleeper.sleep(self.backoff).await;
        }
        // Unreachable while max_attempts > 0; every loop arm returns.
        Err(PublishError::RateLimited(self.max_attempts))
    }
}

/// Publisher for mock mode and end-to-end tests: same length precondition,
/// no network, always succeeds.
pub struct MockPublisher;

impl MockPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusPublisher for MockPublisher {
    async fn authenticate(&self) -> Result<AuthenticatedSession, AuthError> {
        info!("Using mock publisher ({})", crate::config::MOCK_ENV);
        Ok(AuthenticatedSession {
            user_id: "0".to_string(),
            username: "mock".to_string(),
        })
    }

    async fn publish(
        &self,
        _session: &AuthenticatedSession,
        message: &GeneratedMessage,
    ) -> Result<(), PublishError> {
        if !fits_status_limit(message) {
            return Err(PublishError::LengthExceeded(message.char_count()));
        }
        info!("Mock publish: {}", message.text());
        Ok(())
    }
}
