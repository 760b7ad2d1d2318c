use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::youtube::{PageInfo, SearchOutcome, SearchParams, SearchResultItem, VideoDetail};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV writer on a new file that starts with a UTF-8 BOM, creating parent
/// directories as needed
pub fn bom_csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(csv::Writer::from_writer(file))
}

/// `YYYYmmdd_HHMMSS` in local time
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Output folder for a keyword: its first word with spaces and `|` removed
pub fn keyword_folder(base_dir: &Path, keyword: &str) -> PathBuf {
    let first = keyword.split_whitespace().next().unwrap_or("");
    base_dir.join(first.replace('|', ""))
}

/// File-name stem for a query: spaces removed, `|` replaced by `_`
pub fn query_stem(query: &str) -> String {
    query.replace(' ', "").replace('|', "_")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchArchive<'a> {
    search_params: &'a SearchParams,
    kind: &'static str,
    region_code: &'a str,
    page_info: PageInfo,
    items: &'a [SearchResultItem],
}

/// Write the accumulated search result as `{query}_{stamp}.json`
pub async fn save_search_result(
    folder: &Path,
    outcome: &SearchOutcome,
    stamp: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(folder)
        .await
        .with_context(|| format!("creating {}", folder.display()))?;

    let path = folder.join(format!("{}_{}.json", query_stem(&outcome.params.query), stamp));
    let archive = SearchArchive {
        search_params: &outcome.params,
        kind: "youtube#searchListResponse",
        region_code: &outcome.params.region_code,
        page_info: outcome.page_info,
        items: &outcome.items,
    };

    let json = serde_json::to_string_pretty(&archive)?;
    fs::write(&path, json)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!("💾 Search result saved to: {}", path.display());
    Ok(path)
}

/// Cleaned-video CSV row in the fixed column order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoCsvRow<'a> {
    id: &'a str,
    published_at: &'a str,
    title: &'a str,
    description: &'a str,
    channel_title: &'a str,
    category_id: &'a str,
    tags: String,
    duration: &'a str,
    licensed_content: bool,
    view_count: u64,
    like_count: u64,
    comment_count: u64,
}

impl<'a> From<&'a VideoDetail> for VideoCsvRow<'a> {
    fn from(video: &'a VideoDetail) -> Self {
        Self {
            id: &video.id,
            published_at: &video.published_at,
            title: &video.title,
            description: &video.description,
            channel_title: &video.channel_title,
            category_id: &video.category_id,
            tags: video.tags.join(","),
            duration: &video.duration,
            licensed_content: video.licensed_content,
            view_count: video.view_count,
            like_count: video.like_count,
            comment_count: video.comment_count,
        }
    }
}

/// Render videos as BOM-prefixed UTF-8 CSV
pub fn videos_to_csv(videos: &[VideoDetail]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    for video in videos {
        writer.serialize(VideoCsvRow::from(video))?;
    }
    if videos.is_empty() {
        writer.write_record([
            "id",
            "publishedAt",
            "title",
            "description",
            "channelTitle",
            "categoryId",
            "tags",
            "duration",
            "licensedContent",
            "viewCount",
            "likeCount",
            "commentCount",
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e))
}

/// Write filtered videos as `{json stem}_data_{stamp}.csv` next to the search JSON
pub async fn save_cleaned_csv(
    videos: &[VideoDetail],
    search_file: &Path,
    folder: &Path,
    stamp: &str,
) -> Result<PathBuf> {
    let stem = search_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let path = folder.join(format!("{}_data_{}.csv", stem, stamp));

    let bytes = videos_to_csv(videos)?;
    fs::write(&path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    info!("💾 {} videos saved to: {}", videos.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::{SearchOrder, SearchQuery};
    use tempfile::TempDir;

    #[test]
    fn test_keyword_folder_and_stem() {
        let base = Path::new("/data");
        assert_eq!(keyword_folder(base, "성수동 카페|맛집"), base.join("성수동"));
        assert_eq!(keyword_folder(base, "성수|연남"), base.join("성수연남"));
        assert_eq!(query_stem("성수동 카페|맛집"), "성수동카페_맛집");
    }

    #[test]
    fn test_csv_column_order_and_bom() {
        let video = VideoDetail {
            id: "abc".to_string(),
            title: "성수, 카페".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            duration: "PT5M".to_string(),
            licensed_content: true,
            view_count: 12,
            ..VideoDetail::default()
        };

        let bytes = videos_to_csv(&[video]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,publishedAt,title,description,channelTitle,categoryId,tags,duration,licensedContent,viewCount,likeCount,commentCount"
        );
        assert_eq!(lines.next().unwrap(), "abc,,\"성수, 카페\",,,,\"a,b\",PT5M,true,12,0,0");
    }

    #[test]
    fn test_empty_csv_still_has_header() {
        let bytes = videos_to_csv(&[]).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("id,publishedAt,"));
    }

    #[tokio::test]
    async fn test_save_search_result_shape() {
        let temp_dir = TempDir::new().unwrap();
        let query = SearchQuery {
            query: "성수 카페".to_string(),
            published_after: "2024-01-01T00:00:00Z".to_string(),
            published_before: "2025-01-01T00:00:00Z".to_string(),
            total_count: 10,
            page_size: 50,
            order: SearchOrder::Date,
            region_code: "KR".to_string(),
        };
        let outcome = SearchOutcome {
            params: SearchParams::from(&query),
            items: Vec::new(),
            video_ids: Vec::new(),
            page_info: PageInfo { total_results: 3, results_per_page: 50 },
            pages_fetched: 1,
            error: None,
        };

        let path = save_search_result(temp_dir.path(), &outcome, "20250101_120000")
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "성수카페_20250101_120000.json");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["kind"], "youtube#searchListResponse");
        assert_eq!(value["regionCode"], "KR");
        assert_eq!(value["pageInfo"]["totalResults"], 3);
        assert_eq!(value["searchParams"]["requestedCount"], 10);
        assert_eq!(value["searchParams"]["order"], "date");

        let csv_path = save_cleaned_csv(&[], &path, temp_dir.path(), "20250101_120001")
            .await
            .unwrap();
        assert_eq!(
            csv_path.file_name().unwrap(),
            "성수카페_20250101_120000_data_20250101_120001.csv"
        );
    }
}
