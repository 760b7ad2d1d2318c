use super::{PageInfo, SearchOrder, SearchRequest, SearchResultItem, YouTubeApi};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Upper bound the search endpoint accepts for `maxResults`
pub const MAX_PAGE_SIZE: u32 = 50;

/// What to search for and how much of it to collect
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    /// RFC 3339 lower bound (inclusive)
    pub published_after: String,
    /// RFC 3339 upper bound (exclusive)
    pub published_before: String,
    pub total_count: u32,
    pub page_size: u32,
    pub order: SearchOrder,
    pub region_code: String,
}

impl SearchQuery {
    /// Page size clamped to what the endpoint accepts
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Search parameters echoed into the persisted search JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    pub published_after: String,
    pub published_before: String,
    pub order: SearchOrder,
    pub region_code: String,
    pub requested_count: u32,
    pub max_results_per_page: u32,
}

impl From<&SearchQuery> for SearchParams {
    fn from(query: &SearchQuery) -> Self {
        Self {
            query: query.query.clone(),
            published_after: query.published_after.clone(),
            published_before: query.published_before.clone(),
            order: query.order,
            region_code: query.region_code.clone(),
            requested_count: query.total_count,
            max_results_per_page: query.effective_page_size(),
        }
    }
}

/// Accumulated result of a paginated search
///
/// A short result is still a valid result: `error` is set when the loop was
/// cut off by a failed request, and everything fetched before that is kept.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub params: SearchParams,
    pub items: Vec<SearchResultItem>,
    pub video_ids: Vec<String>,
    /// `pageInfo` of the first page only
    pub page_info: PageInfo,
    pub pages_fetched: usize,
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn is_partial(&self) -> bool {
        self.error.is_some()
    }
}

/// Drives the search endpoint page by page
pub struct SearchPaginator<'a, A: YouTubeApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: YouTubeApi + ?Sized> SearchPaginator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Collect up to `query.total_count` items
    pub async fn collect(&self, query: &SearchQuery) -> SearchOutcome {
        let page_size = query.effective_page_size();
        let mut outcome = SearchOutcome {
            params: SearchParams::from(query),
            items: Vec::new(),
            video_ids: Vec::new(),
            page_info: PageInfo::default(),
            pages_fetched: 0,
            error: None,
        };

        info!("🔍 Searching: {}", query.query);
        info!("📅 Window: {} ~ {}", query.published_after, query.published_before);

        let target = query.total_count as usize;
        let mut next_page_token: Option<String> = None;

        while outcome.items.len() < target {
            let remaining = target - outcome.items.len();
            let request = SearchRequest {
                query: query.query.clone(),
                published_after: query.published_after.clone(),
                published_before: query.published_before.clone(),
                max_results: page_size.min(remaining as u32),
                order: query.order,
                region_code: query.region_code.clone(),
                page_token: next_page_token.take(),
            };

            let page = match self.api.search(&request).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Search request failed, keeping {} items: {}", outcome.items.len(), e);
                    outcome.error = Some(e.to_string());
                    break;
                }
            };

            if outcome.pages_fetched == 0 {
                outcome.page_info = page.page_info.unwrap_or_default();
            }
            outcome.pages_fetched += 1;

            let mut items = page.items;
            if items.len() > remaining {
                items.truncate(remaining);
            }
            let received = items.len();

            for item in items {
                if let Some(video_id) = item.video_id() {
                    outcome.video_ids.push(video_id.to_string());
                }
                outcome.items.push(item);
            }

            info!("[search] page {}: {} items (total: {})", outcome.pages_fetched, received, outcome.items.len());

            if received == 0 {
                debug!("Empty page returned, stopping pagination");
                break;
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => next_page_token = Some(token),
                _ => break,
            }
        }

        outcome
    }
}
