use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReelError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikeData {
    #[serde(default)]
    pub likes_count: Option<u64>,
    #[serde(default)]
    pub is_liked: Option<bool>,
}

/// Body returned by the like endpoint. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub data: Option<LikeData>,
}

impl LikeResponse {
    pub fn likes_count(&self) -> Option<u64> {
        self.data.as_ref().and_then(|data| data.likes_count)
    }
}

/// Remote commit point for like state.
#[async_trait]
pub trait EngagementBackend: Send + Sync {
    async fn set_like(&self, video_id: &str, liked: bool) -> Result<LikeResponse>;
}

#[derive(Serialize)]
struct LikeRequest {
    liked: bool,
}

/// `POST {api_base}/videos/{id}/like` with `{"liked": bool}`.
pub struct HttpEngagementBackend {
    client: Client,
    api_root: String,
    auth_token: Option<String>,
}

impl HttpEngagementBackend {
    pub fn new(client: Client, api_base: &str, auth_token: Option<String>) -> Self {
        Self {
            client,
            api_root: api_base.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|token| !token.trim().is_empty()),
        }
    }

    fn endpoint(&self, video_id: &str) -> Result<String> {
        let mut url = url::Url::parse(&format!("{}/", self.api_root))
            .map_err(|e| ReelError::invalid_url(&self.api_root, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ReelError::invalid_url(&self.api_root, "cannot be a base"))?
            .pop_if_empty()
            .extend(["videos", video_id, "like"]);
        Ok(url.into())
    }
}

#[async_trait]
impl EngagementBackend for HttpEngagementBackend {
    async fn set_like(&self, video_id: &str, liked: bool) -> Result<LikeResponse> {
        let url = self.endpoint(video_id)?;
        debug!(url = %url, liked, "Sending like state");

        let mut request = self.client.post(&url).json(&LikeRequest { liked });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ReelError::http_status(response.status(), url, "like toggle"));
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(LikeResponse::default());
        }
        serde_json::from_slice(&body).map_err(|e| ReelError::decode("like response", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestServer;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_set_like_posts_json_with_bearer_token() {
        let server = TestServer::start().await;
        server.route("/api/videos/42/like", r#"{"data":{"likes_count":7,"is_liked":true}}"#);

        let backend = HttpEngagementBackend::new(
            Client::new(),
            &format!("{}/api/", server.base()),
            Some("secret".to_string()),
        );
        let response = backend.set_like("42", true).await.unwrap();
        assert_eq!(response.likes_count(), Some(7));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].headers["authorization"], "Bearer secret");
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body, serde_json::json!({"liked": true}));
    }

    #[tokio::test]
    async fn test_set_like_tolerates_sparse_bodies_and_reports_status() {
        let server = TestServer::start().await;
        server.route("/api/videos/1/like", "");
        server.route("/api/videos/2/like", "{}");
        server.route_with_status("/api/videos/3/like", StatusCode::UNAUTHORIZED, "{}");

        let backend = HttpEngagementBackend::new(Client::new(), &format!("{}/api", server.base()), None);
        assert_eq!(backend.set_like("1", false).await.unwrap().likes_count(), None);
        assert_eq!(backend.set_like("2", false).await.unwrap().likes_count(), None);

        let err = backend.set_like("3", true).await.unwrap_err();
        assert!(matches!(err, ReelError::HttpStatus { status, .. } if status == StatusCode::UNAUTHORIZED));
        assert!(!server.requests()[0].headers.contains_key("authorization"));
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let backend = HttpEngagementBackend::new(Client::new(), "https://api.example.com/v1", None);
        assert_eq!(
            backend.endpoint("a b").unwrap(),
            "https://api.example.com/v1/videos/a%20b/like"
        );
    }
}
