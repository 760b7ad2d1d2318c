#![allow(dead_code)]

use async_trait::async_trait;
use seoul_district_analyzer::youtube::{
    ApiError, PageInfo, SearchPage, SearchRequest, SearchResultId, SearchResultItem, VideoDetail,
    YouTubeApi,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory stand-in for the YouTube Data API
pub struct FakeYouTube {
    catalog: Vec<VideoDetail>,
    /// Fail the n-th search call (1-based)
    fail_search_at: Option<usize>,
    /// Fail the n-th videos call (1-based)
    fail_videos_at: Option<usize>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
    pub video_batches: Mutex<Vec<Vec<String>>>,
}

impl FakeYouTube {
    pub fn with_videos(count: usize) -> Self {
        let catalog = (0..count)
            .map(|i| VideoDetail {
                id: format!("vid{:04}", i),
                title: format!("성수 카페 투어 {}", i),
                description: "브이로그".to_string(),
                channel_title: format!("channel{}", i % 7),
                duration: "PT5M30S".to_string(),
                view_count: i as u64,
                ..VideoDetail::default()
            })
            .collect();
        Self::from_catalog(catalog)
    }

    pub fn from_catalog(catalog: Vec<VideoDetail>) -> Self {
        Self {
            catalog,
            fail_search_at: None,
            fail_videos_at: None,
            search_requests: Mutex::new(Vec::new()),
            video_batches: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_search_at(mut self, call: usize) -> Self {
        self.fail_search_at = Some(call);
        self
    }

    pub fn failing_videos_at(mut self, call: usize) -> Self {
        self.fail_videos_at = Some(call);
        self
    }

    pub fn search_calls(&self) -> Vec<SearchRequest> {
        self.search_requests.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.video_batches.lock().unwrap().iter().map(|b| b.len()).collect()
    }

    fn failure() -> ApiError {
        ApiError::Status {
            status: 403,
            body: "quotaExceeded".to_string(),
        }
    }
}

#[async_trait]
impl YouTubeApi for FakeYouTube {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError> {
        let call = {
            let mut requests = self.search_requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_search_at == Some(call) {
            return Err(Self::failure());
        }

        let offset: usize = request
            .page_token
            .as_deref()
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let end = (offset + request.max_results as usize).min(self.catalog.len());

        let items = self.catalog[offset.min(end)..end]
            .iter()
            .map(|v| SearchResultItem {
                etag: format!("etag-{}", v.id),
                id: SearchResultId {
                    kind: Some("youtube#video".to_string()),
                    video_id: Some(v.id.clone()),
                },
                ..SearchResultItem::default()
            })
            .collect();

        Ok(SearchPage {
            items,
            next_page_token: (end < self.catalog.len()).then(|| format!("page-{}", end)),
            page_info: Some(PageInfo {
                total_results: self.catalog.len() as u64,
                results_per_page: request.max_results as u64,
            }),
        })
    }

    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoDetail>, ApiError> {
        let call = {
            let mut batches = self.video_batches.lock().unwrap();
            batches.push(ids.to_vec());
            batches.len()
        };
        if self.fail_videos_at == Some(call) {
            return Err(Self::failure());
        }

        let by_id: HashMap<&str, &VideoDetail> =
            self.catalog.iter().map(|v| (v.id.as_str(), v)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|v| (*v).clone()))
            .collect())
    }
}
