use super::{VideoDetail, YouTubeApi};
use tracing::{info, warn};

/// Maximum number of ids the detail endpoint accepts per request
pub const DETAIL_BATCH_SIZE: usize = 50;

/// Result of a detail lookup; partial when `error` is set
#[derive(Debug, Clone, Default)]
pub struct DetailOutcome {
    pub details: Vec<VideoDetail>,
    pub batches_fetched: usize,
    pub error: Option<String>,
}

/// Looks up video details in contiguous batches
pub struct DetailFetcher<'a, A: YouTubeApi + ?Sized> {
    api: &'a A,
    batch_size: usize,
}

impl<'a, A: YouTubeApi + ?Sized> DetailFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            batch_size: DETAIL_BATCH_SIZE,
        }
    }

    /// Fetch details for `ids`; unknown ids are silently absent from the result
    pub async fn fetch(&self, ids: &[String]) -> DetailOutcome {
        let mut outcome = DetailOutcome::default();

        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            match self.api.videos(batch).await {
                Ok(details) => {
                    outcome.batches_fetched += 1;
                    info!("[details] batch {}: {} of {} ids resolved (total: {})",
                          index + 1, details.len(), batch.len(), outcome.details.len() + details.len());
                    outcome.details.extend(details);
                }
                Err(e) => {
                    warn!("Detail request failed at batch {}, keeping {} videos: {}",
                          index + 1, outcome.details.len(), e);
                    outcome.error = Some(e.to_string());
                    break;
                }
            }
        }

        outcome
    }
}
