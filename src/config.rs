use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use url::Url;

use crate::analysis::aggregate::PopulationAggregation;
use crate::analysis::dataset::encoding_for_label;
use crate::analysis::scoring::{RowFilter, ScoringModel, WeightedFeature};
use crate::analysis::Feature;
use crate::youtube::search::MAX_PAGE_SIZE;
use crate::youtube::SearchOrder;

/// Configuration for the Seoul district analyzer
///
/// Sections missing from a file take their default values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YouTube Data API access
    pub youtube: YouTubeConfig,

    /// Keyword collection settings
    pub collection: CollectionConfig,

    /// Content filter rules
    pub filter: FilterConfig,

    /// Output and logging settings
    pub output: OutputConfig,

    /// Open-data merge settings
    pub analysis: AnalysisConfig,

    /// Versioned scoring models
    pub scoring: ScoringConfig,

    /// Quadrant index derivation
    pub quadrant: QuadrantConfig,

    /// Map and scatter rendering
    pub map: MapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// API base URL, must end with a slash
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Region code sent with every search
    pub region_code: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3/".to_string(),
            api_key_env: "YOUTUBE_API".to_string(),
            request_timeout_seconds: 30,
            region_code: "KR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Search keywords, processed in order
    pub keywords: Vec<String>,

    /// RFC 3339 lower bound of the publish window
    pub published_after: String,

    /// RFC 3339 upper bound of the publish window
    pub published_before: String,

    /// Search sort order
    pub order: SearchOrder,

    /// Number of search results to collect per keyword
    pub total_count: u32,

    /// Results requested per page (1-50)
    pub page_size: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            published_after: "2020-09-30T15:00:00Z".to_string(),
            published_before: "2025-09-30T14:59:59Z".to_string(),
            order: SearchOrder::Relevance,
            total_count: 100,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Channel titles excluded outright
    pub channel_blacklist: Vec<String>,

    /// Terms that exclude a video when found in title or description
    pub stopwords: Vec<String>,

    /// Title must contain one of these when `require_title_keyword` is set
    pub required_title_keywords: Vec<String>,
    pub require_title_keyword: bool,

    /// Minimum video length in seconds
    pub min_duration_seconds: u64,
    pub filter_short_videos: bool,

    /// Sponsorship disclosure terms
    pub sponsorship_keywords: Vec<String>,
    pub filter_sponsorships: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            channel_blacklist: Vec::new(),
            stopwords: Vec::new(),
            required_title_keywords: Vec::new(),
            require_title_keyword: false,
            min_duration_seconds: 60,
            filter_short_videos: true,
            sponsorship_keywords: Vec::new(),
            filter_sponsorships: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base output directory
    pub base_dir: PathBuf,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding the open-data extracts
    pub data_dir: PathBuf,

    /// Text encoding of the extracts: `auto` (UTF-8, else CP949) or an
    /// encoding label such as `utf-8`, `cp949` or `euc-kr`
    pub encoding: String,

    /// File-name prefix of the per-year sales extracts
    pub sales_file_prefix: String,

    pub floating_population_file: String,
    pub resident_population_file: String,
    pub change_indicator_file: String,
    pub facility_file: String,

    /// Service sectors kept from the sales extracts (empty keeps all)
    pub target_sectors: Vec<String>,

    /// Quarter codes dropped from the sales extracts
    pub excluded_quarters: Vec<u32>,

    /// Merged dataset file name, written under the output directory
    pub merged_file: String,

    pub population_aggregation: PopulationAggregation,

    /// District names folded into a single name before aggregation
    pub district_aliases: Vec<DistrictAlias>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./raw_data"),
            encoding: "auto".to_string(),
            sales_file_prefix: "매출_".to_string(),
            floating_population_file: "유동인구.csv".to_string(),
            resident_population_file: "상주인구.csv".to_string(),
            change_indicator_file: "상권변화지표.csv".to_string(),
            facility_file: "집객시설.csv".to_string(),
            target_sectors: Vec::new(),
            excluded_quarters: Vec::new(),
            merged_file: "final_alpha_data.csv".to_string(),
            population_aggregation: PopulationAggregation::default(),
            district_aliases: Vec::new(),
        }
    }
}

/// Any district whose name contains `contains` is renamed to `name`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistrictAlias {
    pub contains: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub models: Vec<ScoringModel>,
}

impl ScoringConfig {
    /// Look up `name@version`, or the last-defined model called `name`
    pub fn model(&self, selector: &str) -> Option<&ScoringModel> {
        match selector.split_once('@') {
            Some((name, version)) => self
                .models
                .iter()
                .find(|m| m.name == name && m.version == version),
            None => self.models.iter().rev().find(|m| m.name == selector),
        }
    }
}

/// Column contributing to the quadrant x index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedColumn {
    pub column: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadrantConfig {
    /// Column holding the district name
    pub name_column: String,

    /// Percentile-ranked column used as y
    pub y_column: String,

    /// Percentile-ranked columns combined into x
    pub x_components: Vec<WeightedColumn>,
}

impl Default for QuadrantConfig {
    fn default() -> Self {
        Self {
            name_column: "행정동".to_string(),
            x_components: vec![
                WeightedColumn { column: "CAGR".to_string(), weight: 0.34 },
                WeightedColumn { column: "avg_naver".to_string(), weight: 0.33 },
                WeightedColumn { column: "blog_post".to_string(), weight: 0.33 },
            ],
            y_column: "하이브리드_점수".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial map centre (lat, lon)
    pub center: [f64; 2],
    pub zoom: u8,
    pub tile_url: String,
    pub tile_attribution: String,

    pub base_radius: f64,
    pub emphasized_radius: f64,
    pub base_weight: f64,
    pub emphasized_weight: f64,
    pub fill_opacity: f64,

    /// Districts drawn larger with a heavier border
    pub emphasized_districts: Vec<String>,

    /// Output file names under the output directory
    pub output_file: String,
    pub scatter_file: String,

    /// District name -> (lat, lon)
    pub coordinates: BTreeMap<String, [f64; 2]>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [37.55, 126.98],
            zoom: 12,
            tile_url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png".to_string(),
            tile_attribution: "&copy; OpenStreetMap contributors &copy; CARTO".to_string(),
            base_radius: 12.0,
            emphasized_radius: 16.0,
            base_weight: 1.0,
            emphasized_weight: 4.0,
            fill_opacity: 0.7,
            emphasized_districts: Vec::new(),
            coordinates: BTreeMap::new(),
            output_file: "seoul_strategic_map.html".to_string(),
            scatter_file: "seoul_quadrant_scatter.svg".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found
    pub fn load() -> Result<Self> {
        Self::load_first(&[
            Path::new("district-analyzer.toml"),
            Path::new("config/district-analyzer.toml"),
        ])
    }

    /// Load the first existing file; a file that fails to parse is an error
    /// rather than a fallback to defaults
    fn load_first(config_paths: &[&Path]) -> Result<Self> {
        match config_paths.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from(path),
            None => Self::from_env(),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(output_dir) = std::env::var("DISTRICT_ANALYZER_OUTPUT_DIR") {
            config.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(data_dir) = std::env::var("DISTRICT_ANALYZER_DATA_DIR") {
            config.analysis.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(log_level) = std::env::var("DISTRICT_ANALYZER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        if let Ok(total) = std::env::var("DISTRICT_ANALYZER_TOTAL_COUNT") {
            config.collection.total_count = total.parse().unwrap_or(config.collection.total_count);
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.as_ref().display());
        Ok(())
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.youtube.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("environment variable {} is not set", self.youtube.api_key_env))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.youtube.base_url)
            .map_err(|e| anyhow!("invalid youtube.base_url: {}", e))?;
        if !base.path().ends_with('/') {
            return Err(anyhow!("youtube.base_url must end with '/'"));
        }

        if self.collection.total_count == 0 {
            return Err(anyhow!("collection.total_count must be greater than 0"));
        }

        if self.collection.page_size == 0 || self.collection.page_size > MAX_PAGE_SIZE {
            return Err(anyhow!("collection.page_size must be between 1 and {}", MAX_PAGE_SIZE));
        }

        let after = chrono::DateTime::parse_from_rfc3339(&self.collection.published_after)
            .map_err(|e| anyhow!("invalid collection.published_after: {}", e))?;
        let before = chrono::DateTime::parse_from_rfc3339(&self.collection.published_before)
            .map_err(|e| anyhow!("invalid collection.published_before: {}", e))?;
        if after >= before {
            return Err(anyhow!("collection.published_after must precede published_before"));
        }

        let mut labels = HashSet::new();
        for model in &self.scoring.models {
            if !labels.insert((model.name.as_str(), model.version.as_str())) {
                return Err(anyhow!("duplicate scoring model: {}", model.label()));
            }
            model.validate()?;
        }

        if !self.analysis.encoding.eq_ignore_ascii_case("auto")
            && encoding_for_label(&self.analysis.encoding).is_none()
        {
            return Err(anyhow!("unknown analysis.encoding: {}", self.analysis.encoding));
        }

        if self.quadrant.x_components.iter().any(|c| !c.weight.is_finite()) {
            return Err(anyhow!("quadrant weights must be finite"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "District Analyzer Configuration:\n\
            - Keywords: {}\n\
            - Window: {} ~ {}\n\
            - Results per keyword: {} (pages of {})\n\
            - Output Directory: {}\n\
            - Data Directory: {}\n\
            - Scoring models: {}\n\
            - Mapped districts: {}",
            self.collection.keywords.len(),
            self.collection.published_after,
            self.collection.published_before,
            self.collection.total_count,
            self.collection.page_size,
            self.output.base_dir.display(),
            self.analysis.data_dir.display(),
            self.scoring
                .models
                .iter()
                .map(|m| m.label())
                .collect::<Vec<_>>()
                .join(", "),
            self.map.coordinates.len()
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube: YouTubeConfig::default(),
            collection: CollectionConfig::default(),
            filter: FilterConfig::default(),
            output: OutputConfig::default(),
            analysis: AnalysisConfig::default(),
            scoring: ScoringConfig {
                models: vec![
                    ScoringModel {
                        name: "next-seongsu".to_string(),
                        version: "2".to_string(),
                        description: Some("MZ share, inflow and change score for one quarter".to_string()),
                        quarters: Some(vec![20251]),
                        row_filters: vec![RowFilter::BelowQuantile {
                            feature: Feature::SalesAmount,
                            quantile: 0.8,
                        }],
                        features: vec![
                            WeightedFeature::new(Feature::MzFloatingShare, 0.5),
                            WeightedFeature::new(Feature::InflowIntensity, 0.3),
                            WeightedFeature::new(Feature::ChangeScore, 0.2),
                        ],
                        scale: 100.0,
                        top_n: 10,
                    },
                    ScoringModel {
                        name: "nsi".to_string(),
                        version: "8".to_string(),
                        description: Some("Infrastructure, MZ power and persistence over all quarters".to_string()),
                        quarters: None,
                        row_filters: Vec::new(),
                        features: vec![
                            WeightedFeature::new(Feature::FacilityCount, 0.25),
                            WeightedFeature::new(Feature::SubwayStations, 0.10),
                            WeightedFeature::new(Feature::MzSalesShare, 0.35),
                            WeightedFeature::new(Feature::MzFloatingShare, 0.10),
                            WeightedFeature::new(Feature::CommercialEnergy, 0.10),
                            WeightedFeature::new(Feature::AvgOperatingMonths, 0.10),
                        ],
                        scale: 100.0,
                        top_n: 101,
                    },
                ],
            },
            quadrant: QuadrantConfig::default(),
            map: MapConfig::default(),
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.config.collection.keywords = keywords;
        self
    }

    pub fn with_total_count(mut self, total_count: u32) -> Self {
        self.config.collection.total_count = total_count;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.analysis.data_dir = dir;
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn with_model(mut self, model: ScoringModel) -> Self {
        self.config.scoring.models.push(model);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
