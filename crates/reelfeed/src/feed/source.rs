use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{ReelError, Result};
use crate::feed::model::{PageQuery, VideoPage};

/// Where feed pages come from. The cache only depends on this signature.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_public_videos(&self, query: PageQuery) -> Result<VideoPage>;
}

/// `GET {api_base}/videos/public?page=&per_page=`
pub struct HttpFeedSource {
    client: Client,
    api_root: String,
}

impl HttpFeedSource {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_root: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/videos/public", self.api_root)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_public_videos(&self, query: PageQuery) -> Result<VideoPage> {
        let url = self.endpoint();
        debug!(url = %url, page = query.page, per_page = query.per_page, "Fetching feed page");

        let response = self
            .client
            .get(&url)
            .query(&[("page", query.page), ("per_page", query.per_page)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReelError::http_status(response.status(), url, "feed fetch"));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<VideoPage>(&body).map_err(|e| ReelError::decode("feed page", e.to_string()))
    }
}
