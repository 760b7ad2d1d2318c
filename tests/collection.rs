mod common;

use common::FakeYouTube;
use seoul_district_analyzer::config::{ConfigBuilder, FilterConfig};
use seoul_district_analyzer::youtube::{
    DetailFetcher, SearchOrder, SearchPaginator, SearchQuery, VideoDetail,
};
use seoul_district_analyzer::CollectionPipeline;
use tempfile::TempDir;

fn query(total: u32, page_size: u32) -> SearchQuery {
    SearchQuery {
        query: "성수 카페".to_string(),
        published_after: "2020-09-30T15:00:00Z".to_string(),
        published_before: "2025-09-30T14:59:59Z".to_string(),
        total_count: total,
        page_size,
        order: SearchOrder::Date,
        region_code: "KR".to_string(),
    }
}

#[tokio::test]
async fn paginator_stops_at_requested_count() {
    let api = FakeYouTube::with_videos(300);
    let outcome = SearchPaginator::new(&api).collect(&query(120, 50)).await;

    assert_eq!(outcome.items.len(), 120);
    assert_eq!(outcome.video_ids.len(), 120);
    assert_eq!(outcome.pages_fetched, 3);
    assert!(!outcome.is_partial());

    let calls = api.search_calls();
    let sizes: Vec<u32> = calls.iter().map(|r| r.max_results).collect();
    assert_eq!(sizes, vec![50, 50, 20]);

    // each request carries the token returned by the previous page
    assert_eq!(calls[0].page_token, None);
    assert_eq!(calls[1].page_token.as_deref(), Some("page-50"));
    assert_eq!(calls[2].page_token.as_deref(), Some("page-100"));
    assert_eq!(calls[0].order, SearchOrder::Date);
    assert_eq!(calls[0].region_code, "KR");
}

#[tokio::test]
async fn paginator_stops_when_results_run_out() {
    let api = FakeYouTube::with_videos(70);
    let outcome = SearchPaginator::new(&api).collect(&query(500, 50)).await;

    assert_eq!(outcome.items.len(), 70);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(outcome.page_info.total_results, 70);
    assert_eq!(outcome.page_info.results_per_page, 50);
}

#[tokio::test]
async fn paginator_keeps_partial_results_on_error() {
    let api = FakeYouTube::with_videos(300).failing_search_at(3);
    let outcome = SearchPaginator::new(&api).collect(&query(200, 50)).await;

    assert_eq!(outcome.items.len(), 100);
    assert_eq!(outcome.pages_fetched, 2);
    assert!(outcome.is_partial());
    assert!(outcome.error.as_deref().unwrap_or("").contains("403"));
    assert_eq!(api.search_calls().len(), 3);
}

#[tokio::test]
async fn paginator_first_page_failure_yields_empty_outcome() {
    let api = FakeYouTube::with_videos(10).failing_search_at(1);
    let outcome = SearchPaginator::new(&api).collect(&query(10, 50)).await;

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.pages_fetched, 0);
    assert!(outcome.is_partial());
}

#[tokio::test]
async fn detail_fetcher_uses_batches_of_fifty() {
    let api = FakeYouTube::with_videos(130);
    let mut ids: Vec<String> = (0..130).map(|i| format!("vid{:04}", i)).collect();
    ids.push("unknown".to_string());

    let outcome = DetailFetcher::new(&api).fetch(&ids).await;

    assert_eq!(api.batch_sizes(), vec![50, 50, 31]);
    assert_eq!(outcome.details.len(), 130);
    assert_eq!(outcome.batches_fetched, 3);
    assert_eq!(outcome.details[0].id, "vid0000");
    assert_eq!(outcome.details[129].id, "vid0129");
}

#[tokio::test]
async fn detail_fetcher_keeps_earlier_batches_on_error() {
    let api = FakeYouTube::with_videos(120).failing_videos_at(2);
    let ids: Vec<String> = (0..120).map(|i| format!("vid{:04}", i)).collect();

    let outcome = DetailFetcher::new(&api).fetch(&ids).await;

    assert_eq!(outcome.details.len(), 50);
    assert_eq!(outcome.batches_fetched, 1);
    assert!(outcome.error.is_some());
    assert_eq!(api.batch_sizes(), vec![50, 50]);
}

#[tokio::test]
async fn detail_fetch_is_idempotent() {
    let api = FakeYouTube::with_videos(60);
    let ids: Vec<String> = (0..60).map(|i| format!("vid{:04}", i)).collect();

    let first = DetailFetcher::new(&api).fetch(&ids).await;
    let second = DetailFetcher::new(&api).fetch(&ids).await;
    assert_eq!(first.details, second.details);
}

#[tokio::test]
async fn pipeline_writes_json_and_filtered_csv() {
    let temp_dir = TempDir::new().unwrap();

    let mut catalog: Vec<VideoDetail> = (0..8)
        .map(|i| VideoDetail {
            id: format!("vid{:04}", i),
            title: format!("성수동 카페 {}", i),
            channel_title: "local".to_string(),
            duration: "PT10M".to_string(),
            ..VideoDetail::default()
        })
        .collect();
    catalog[1].channel_title = "spam channel".to_string();
    catalog[2].duration = "PT30S".to_string();
    catalog[3].description = "본 영상은 유료 광고를 포함".to_string();

    let api = FakeYouTube::from_catalog(catalog);
    let config = ConfigBuilder::new()
        .with_keywords(vec!["성수동 카페".to_string(), "없는동네".to_string()])
        .with_total_count(20)
        .with_output_dir(temp_dir.path().to_path_buf())
        .with_filter(FilterConfig {
            channel_blacklist: vec!["spam channel".to_string()],
            min_duration_seconds: 60,
            filter_short_videos: true,
            sponsorship_keywords: vec!["유료 광고".to_string()],
            filter_sponsorships: true,
            ..FilterConfig::default()
        })
        .build();

    let pipeline = CollectionPipeline::new(&api, &config);
    let report = pipeline.run_keyword("성수동 카페").await.unwrap();

    assert_eq!(report.videos_found, 8);
    assert_eq!(report.details_fetched, 8);
    assert_eq!(report.stats.total, 8);
    assert_eq!(report.stats.channel_blacklist, 1);
    assert_eq!(report.stats.duration_too_short, 1);
    assert_eq!(report.stats.sponsorship, 1);
    assert_eq!(report.stats.passed, 5);
    assert_eq!(report.folder, temp_dir.path().join("성수동"));

    let search_file = report.search_file.expect("search file written");
    assert!(search_file
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("성수동카페_"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&search_file).unwrap()).unwrap();
    assert_eq!(json["items"].as_array().unwrap().len(), 8);
    assert_eq!(json["searchParams"]["query"], "성수동 카페");

    let csv_file = report.csv_file.expect("csv written");
    let mut reader = csv::Reader::from_path(&csv_file).unwrap();
    let ids: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(0).unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["vid0000", "vid0004", "vid0005", "vid0006", "vid0007"]);
}

#[tokio::test]
async fn pipeline_skips_keywords_without_results() {
    let temp_dir = TempDir::new().unwrap();
    let api = FakeYouTube::from_catalog(Vec::new());
    let config = ConfigBuilder::new()
        .with_keywords(vec!["없는동네".to_string()])
        .with_output_dir(temp_dir.path().to_path_buf())
        .build();

    let summary = CollectionPipeline::new(&api, &config).run().await.unwrap();

    assert_eq!(summary.reports.len(), 1);
    assert!(summary.reports[0].skipped());
    assert_eq!(summary.videos_saved, 0);
    assert!(!temp_dir.path().join("없는동네").exists());
}
