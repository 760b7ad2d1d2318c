//! YouTube Data API collection
//!
//! Search pagination, batched detail lookup and the HTTP client behind them.
//! Everything above the client talks to the `YouTubeApi` trait so that runs
//! can be replayed against canned responses.

pub mod client;
pub mod details;
pub mod search;

pub use client::YouTubeClient;
pub use details::{DetailFetcher, DetailOutcome, DETAIL_BATCH_SIZE};
pub use search::{SearchOutcome, SearchPaginator, SearchParams, SearchQuery};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors surfaced by the API client
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sort order accepted by the search endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchOrder {
    Date,
    Rating,
    #[default]
    Relevance,
    Title,
    VideoCount,
    ViewCount,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Rating => "rating",
            SearchOrder::Relevance => "relevance",
            SearchOrder::Title => "title",
            SearchOrder::VideoCount => "videoCount",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

impl fmt::Display for SearchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(SearchOrder::Date),
            "rating" => Ok(SearchOrder::Rating),
            "relevance" => Ok(SearchOrder::Relevance),
            "title" => Ok(SearchOrder::Title),
            "videoCount" => Ok(SearchOrder::VideoCount),
            "viewCount" => Ok(SearchOrder::ViewCount),
            other => Err(format!("unknown search order: {}", other)),
        }
    }
}

/// Identifier block of a search hit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// Lightweight snippet kept from a search hit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub publish_time: String,
}

/// One item of a search page, as persisted to the search JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchResultItem {
    pub etag: String,
    pub id: SearchResultId,
    pub snippet: SearchSnippet,
}

impl SearchResultItem {
    pub fn video_id(&self) -> Option<&str> {
        self.id.video_id.as_deref()
    }
}

/// `pageInfo` block of the search response
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    pub total_results: u64,
    pub results_per_page: u64,
}

/// One search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub published_after: String,
    pub published_before: String,
    pub max_results: u32,
    pub order: SearchOrder,
    pub region_code: String,
    pub page_token: Option<String>,
}

/// One page returned by the search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchPage {
    pub items: Vec<SearchResultItem>,
    pub next_page_token: Option<String>,
    pub page_info: Option<PageInfo>,
}

/// Video metadata returned by the detail endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub id: String,
    pub published_at: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub category_id: String,
    pub tags: Vec<String>,
    /// ISO-8601 duration, e.g. `PT12M3S`
    pub duration: String,
    pub licensed_content: bool,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Access to the two YouTube endpoints used by the collector
#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// Fetch a single search page
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError>;

    /// Fetch details for up to 50 video ids
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoDetail>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_order_round_trip_names() {
        for order in [
            SearchOrder::Date,
            SearchOrder::Rating,
            SearchOrder::Relevance,
            SearchOrder::Title,
            SearchOrder::VideoCount,
            SearchOrder::ViewCount,
        ] {
            assert_eq!(order.as_str().parse::<SearchOrder>().unwrap(), order);
        }
        assert!("popular".parse::<SearchOrder>().is_err());
    }

    #[test]
    fn test_search_page_tolerates_missing_fields() {
        let json = r#"{
            "items": [
                {"etag": "e1", "id": {"kind": "youtube#video", "videoId": "abc"},
                 "snippet": {"title": "성수 카페", "thumbnails": {}}},
                {"id": {"kind": "youtube#channel"}}
            ]
        }"#;
        let page: SearchPage = serde_json::from_str(json).unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].video_id(), Some("abc"));
        assert_eq!(page.items[0].snippet.title, "성수 카페");
        assert_eq!(page.items[0].snippet.channel_title, "");
        assert_eq!(page.items[1].video_id(), None);
        assert!(page.next_page_token.is_none());
        assert!(page.page_info.is_none());
    }
}
