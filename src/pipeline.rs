use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::filter::{ContentFilter, FilterStats};
use crate::persistence::{keyword_folder, save_cleaned_csv, save_search_result, timestamp};
use crate::youtube::{DetailFetcher, SearchPaginator, SearchQuery, YouTubeApi};

/// What happened for one keyword
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordReport {
    pub keyword: String,
    pub folder: PathBuf,
    pub search_file: Option<PathBuf>,
    pub csv_file: Option<PathBuf>,
    pub pages_fetched: usize,
    pub videos_found: usize,
    pub details_fetched: usize,
    pub stats: FilterStats,
    pub search_error: Option<String>,
    pub detail_error: Option<String>,
}

impl KeywordReport {
    pub fn skipped(&self) -> bool {
        self.search_file.is_none()
    }
}

/// Totals over a collection run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionSummary {
    pub reports: Vec<KeywordReport>,
    pub stats: FilterStats,
    pub videos_saved: usize,
    pub total_time_seconds: f64,
}

/// Search, look up, filter and persist videos for each configured keyword.
///
/// Keywords are processed one after another; a failing request only cuts
/// that keyword's results short.
pub struct CollectionPipeline<'a, A: YouTubeApi + ?Sized> {
    api: &'a A,
    config: &'a Config,
    filter: ContentFilter,
}

impl<'a, A: YouTubeApi + ?Sized> CollectionPipeline<'a, A> {
    pub fn new(api: &'a A, config: &'a Config) -> Self {
        Self {
            api,
            config,
            filter: ContentFilter::new(&config.filter),
        }
    }

    fn query_for(&self, keyword: &str) -> SearchQuery {
        let collection = &self.config.collection;
        SearchQuery {
            query: keyword.to_string(),
            published_after: collection.published_after.clone(),
            published_before: collection.published_before.clone(),
            total_count: collection.total_count,
            page_size: collection.page_size,
            order: collection.order,
            region_code: self.config.youtube.region_code.clone(),
        }
    }

    pub async fn run_keyword(&self, keyword: &str) -> Result<KeywordReport> {
        let folder = keyword_folder(&self.config.output.base_dir, keyword);
        let mut report = KeywordReport {
            keyword: keyword.to_string(),
            folder: folder.clone(),
            ..KeywordReport::default()
        };

        let search = SearchPaginator::new(self.api).collect(&self.query_for(keyword)).await;
        report.pages_fetched = search.pages_fetched;
        report.videos_found = search.video_ids.len();
        report.search_error = search.error.clone();

        if search.video_ids.is_empty() {
            warn!("❌ No search results for: {}", keyword);
            return Ok(report);
        }

        let search_file = save_search_result(&folder, &search, &timestamp()).await?;

        let details = DetailFetcher::new(self.api).fetch(&search.video_ids).await;
        report.details_fetched = details.details.len();
        report.detail_error = details.error.clone();

        let passed = self.filter.apply(details.details, &mut report.stats);
        report.stats.log_summary();

        let csv_file = save_cleaned_csv(&passed, &search_file, &folder, &timestamp()).await?;
        report.search_file = Some(search_file);
        report.csv_file = Some(csv_file);

        Ok(report)
    }

    pub async fn run(&self) -> Result<CollectionSummary> {
        let start = Instant::now();
        let keywords = &self.config.collection.keywords;
        let mut summary = CollectionSummary::default();

        for (index, keyword) in keywords.iter().enumerate() {
            info!("🚀 Keyword [{}/{}]: {}", index + 1, keywords.len(), keyword);
            let report = self.run_keyword(keyword).await?;
            summary.stats.merge(&report.stats);
            summary.videos_saved += report.stats.passed;
            summary.reports.push(report);
        }

        summary.total_time_seconds = start.elapsed().as_secs_f64();

        let skipped = summary.reports.iter().filter(|r| r.skipped()).count();
        let partial = summary
            .reports
            .iter()
            .filter(|r| r.search_error.is_some() || r.detail_error.is_some())
            .count();
        info!("✅ Collection complete in {:.1}s", summary.total_time_seconds);
        info!("   Keywords: {} ({} without results, {} partial)", keywords.len(), skipped, partial);
        info!("   Videos saved: {}", summary.videos_saved);

        Ok(summary)
    }
}
