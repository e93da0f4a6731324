//! Remote API client.
//!
//! One operation per action kind against the habit backend, with failure
//! classification: 2xx success; 4xx permanent except 401/408/429; 5xx and
//! network/timeout errors transient. The caller's identity travels as a
//! `user-id` header; the client manages no credentials of its own.

use serde_json::json;
use std::future::Future;
use std::time::Duration;
use tally_common::{Habit, Result, SyncError};

/// Transport seam the sync engine drains through.
pub trait RemoteApi: Send + Sync {
    fn create_habit(
        &self,
        user_id: &str,
        habit: &Habit,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_habit(
        &self,
        user_id: &str,
        habit: &Habit,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_habit(
        &self,
        user_id: &str,
        habit_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Idempotent on the remote side: the backend's "already completed for
    /// this date" check makes replays after a lost ack harmless.
    fn complete_habit(
        &self,
        user_id: &str,
        habit_id: &str,
        date: i64,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<R: RemoteApi> RemoteApi for std::sync::Arc<R> {
    async fn create_habit(&self, user_id: &str, habit: &Habit) -> Result<()> {
        self.as_ref().create_habit(user_id, habit).await
    }

    async fn update_habit(&self, user_id: &str, habit: &Habit) -> Result<()> {
        self.as_ref().update_habit(user_id, habit).await
    }

    async fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<()> {
        self.as_ref().delete_habit(user_id, habit_id).await
    }

    async fn complete_habit(&self, user_id: &str, habit_id: &str, date: i64) -> Result<()> {
        self.as_ref().complete_habit(user_id, habit_id, date).await
    }
}

/// HTTP transport over the Tally REST backend.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn classify(status: reqwest::StatusCode, body: &str) -> SyncError {
        let reason = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        match status.as_u16() {
            401 | 408 | 429 => SyncError::transient(reason),
            400..=499 => SyncError::permanent(reason),
            _ => SyncError::transient(reason),
        }
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(%status, body, "remote call rejected");
        Err(Self::classify(status, &body))
    }
}

fn network_error(err: reqwest::Error) -> SyncError {
    SyncError::transient(err.to_string())
}

impl RemoteApi for HttpRemoteApi {
    async fn create_habit(&self, user_id: &str, habit: &Habit) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/habits", self.base_url))
            .header("user-id", user_id)
            .json(habit)
            .send()
            .await
            .map_err(network_error)?;
        Self::check(response).await
    }

    async fn update_habit(&self, user_id: &str, habit: &Habit) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/habits/{}", self.base_url, habit.id))
            .header("user-id", user_id)
            .json(habit)
            .send()
            .await
            .map_err(network_error)?;
        Self::check(response).await
    }

    async fn delete_habit(&self, user_id: &str, habit_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/habits/{}", self.base_url, habit_id))
            .header("user-id", user_id)
            .send()
            .await
            .map_err(network_error)?;
        Self::check(response).await
    }

    async fn complete_habit(&self, user_id: &str, habit_id: &str, date: i64) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/habits/{}/complete", self.base_url, habit_id))
            .header("user-id", user_id)
            .json(&json!({ "date": date }))
            .send()
            .await
            .map_err(network_error)?;
        Self::check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn classification_follows_status_ranges() {
        assert!(HttpRemoteApi::classify(StatusCode::BAD_REQUEST, "").is_permanent());
        assert!(HttpRemoteApi::classify(StatusCode::NOT_FOUND, "gone").is_permanent());
        assert!(HttpRemoteApi::classify(StatusCode::UNAUTHORIZED, "").is_transient());
        assert!(HttpRemoteApi::classify(StatusCode::REQUEST_TIMEOUT, "").is_transient());
        assert!(HttpRemoteApi::classify(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(HttpRemoteApi::classify(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(HttpRemoteApi::classify(StatusCode::BAD_GATEWAY, "").is_transient());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let api = HttpRemoteApi::new("http://localhost:3000/api/", Duration::from_secs(5));
        assert_eq!(api.unwrap().base_url, "http://localhost:3000/api");
    }
}
