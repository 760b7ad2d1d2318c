use super::{ApiError, SearchPage, SearchRequest, VideoDetail, YouTubeApi};
use crate::config::YouTubeConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const VIDEO_PARTS: &str = "snippet,statistics,contentDetails";

/// reqwest-backed YouTube Data API v3 client
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoListResponse {
    items: Vec<RawVideo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawVideo {
    id: String,
    snippet: RawVideoSnippet,
    statistics: RawStatistics,
    content_details: RawContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawVideoSnippet {
    published_at: String,
    title: String,
    description: String,
    channel_title: String,
    category_id: String,
    tags: Vec<String>,
}

// Counts come back as JSON strings; hidden counts are simply absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawStatistics {
    view_count: Option<Value>,
    like_count: Option<Value>,
    comment_count: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawContentDetails {
    duration: String,
    licensed_content: bool,
}

fn parse_count(value: &Option<Value>) -> u64 {
    match value {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

impl From<RawVideo> for VideoDetail {
    fn from(raw: RawVideo) -> Self {
        Self {
            id: raw.id,
            published_at: raw.snippet.published_at,
            title: raw.snippet.title,
            description: raw.snippet.description,
            channel_title: raw.snippet.channel_title,
            category_id: raw.snippet.category_id,
            tags: raw.snippet.tags,
            duration: raw.content_details.duration,
            licensed_content: raw.content_details.licensed_content,
            view_count: parse_count(&raw.statistics.view_count),
            like_count: parse_count(&raw.statistics.like_count),
            comment_count: parse_count(&raw.statistics.comment_count),
        }
    }
}

impl YouTubeClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &YouTubeConfig, api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;
        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.base_url.join(endpoint)?;
        debug!("GET {} ({} params)", url, params.len());

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl YouTubeApi for YouTubeClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", request.query.clone()),
            ("publishedAfter", request.published_after.clone()),
            ("publishedBefore", request.published_before.clone()),
            ("type", "video".to_string()),
            ("maxResults", request.max_results.to_string()),
            ("order", request.order.as_str().to_string()),
            ("regionCode", request.region_code.clone()),
        ];
        if let Some(token) = &request.page_token {
            params.push(("pageToken", token.clone()));
        }

        self.get_json("search", &params).await
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoDetail>, ApiError> {
        let params = [
            ("part", VIDEO_PARTS.to_string()),
            ("id", ids.join(",")),
        ];

        let response: VideoListResponse = self.get_json("videos", &params).await?;
        Ok(response.items.into_iter().map(VideoDetail::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_video_conversion_defaults() {
        let json = r#"{
            "items": [{
                "id": "vid1",
                "snippet": {
                    "publishedAt": "2025-01-02T03:04:05Z",
                    "title": "가산 카페 투어",
                    "channelTitle": "카페일기",
                    "categoryId": "22",
                    "tags": ["카페", "가산"]
                },
                "statistics": {"viewCount": "1200", "likeCount": "35"},
                "contentDetails": {"duration": "PT8M12S", "licensedContent": true}
            }, {
                "id": "vid2"
            }]
        }"#;
        let response: VideoListResponse = serde_json::from_str(json).unwrap();
        let details: Vec<VideoDetail> = response.items.into_iter().map(VideoDetail::from).collect();

        assert_eq!(details[0].id, "vid1");
        assert_eq!(details[0].tags, vec!["카페", "가산"]);
        assert_eq!(details[0].view_count, 1200);
        assert_eq!(details[0].like_count, 35);
        assert_eq!(details[0].comment_count, 0);
        assert_eq!(details[0].duration, "PT8M12S");
        assert!(details[0].licensed_content);

        assert_eq!(details[1].title, "");
        assert!(details[1].tags.is_empty());
        assert_eq!(details[1].view_count, 0);
        assert!(!details[1].licensed_content);
    }

    #[test]
    fn test_parse_count_variants() {
        assert_eq!(parse_count(&Some(Value::String("42".into()))), 42);
        assert_eq!(parse_count(&Some(Value::String("n/a".into()))), 0);
        assert_eq!(parse_count(&Some(serde_json::json!(7))), 7);
        assert_eq!(parse_count(&None), 0);
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let config = YouTubeConfig {
            base_url: "not a url".to_string(),
            ..YouTubeConfig::default()
        };
        assert!(YouTubeClient::new(&config, "key".to_string()).is_err());
    }
}
