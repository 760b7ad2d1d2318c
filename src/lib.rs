//! Seoul District Analyzer
//!
//! Collects YouTube coverage of Seoul neighbourhoods and ranks commercial
//! districts from Seoul open-data extracts.

pub mod analysis;
pub mod config;
pub mod filter;
pub mod persistence;
pub mod pipeline;
pub mod visual;
pub mod youtube;

// Re-export main types for easy access
pub use crate::analysis::{aggregate_districts, merge_datasets, DistrictRecord, MergedRow, Ranking, ScoringModel};
pub use crate::config::Config;
pub use crate::filter::{ContentFilter, FilterStats};
pub use crate::pipeline::{CollectionPipeline, CollectionSummary, KeywordReport};
pub use crate::visual::{MapRenderer, Quadrant, QuadrantPoint};
pub use crate::youtube::{ApiError, YouTubeApi, YouTubeClient};
