//! Content filtering for collected videos
//!
//! Rules run in a fixed order and the first matching rule decides the drop
//! reason, so each video is counted exactly once in `FilterStats`.

use crate::config::FilterConfig;
use crate::youtube::VideoDetail;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("duration pattern is valid")
});

/// Why a video was excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    ChannelBlacklist,
    Stopword,
    TitleMismatch,
    DurationTooShort,
    Sponsorship,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropReason::ChannelBlacklist => "channel blacklist",
            DropReason::Stopword => "stopword",
            DropReason::TitleMismatch => "title mismatch",
            DropReason::DurationTooShort => "duration too short",
            DropReason::Sponsorship => "sponsorship",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Passed,
    Dropped(DropReason),
}

/// Running counters for one filtering run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub total: usize,
    pub channel_blacklist: usize,
    pub stopword: usize,
    pub title_mismatch: usize,
    pub duration_too_short: usize,
    pub sponsorship: usize,
    pub passed: usize,
}

impl FilterStats {
    pub fn record(&mut self, decision: FilterDecision) {
        self.total += 1;
        match decision {
            FilterDecision::Passed => self.passed += 1,
            FilterDecision::Dropped(DropReason::ChannelBlacklist) => self.channel_blacklist += 1,
            FilterDecision::Dropped(DropReason::Stopword) => self.stopword += 1,
            FilterDecision::Dropped(DropReason::TitleMismatch) => self.title_mismatch += 1,
            FilterDecision::Dropped(DropReason::DurationTooShort) => self.duration_too_short += 1,
            FilterDecision::Dropped(DropReason::Sponsorship) => self.sponsorship += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.channel_blacklist + self.stopword + self.title_mismatch + self.duration_too_short + self.sponsorship
    }

    /// Share of considered videos that passed, in percent
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn merge(&mut self, other: &FilterStats) {
        self.total += other.total;
        self.channel_blacklist += other.channel_blacklist;
        self.stopword += other.stopword;
        self.title_mismatch += other.title_mismatch;
        self.duration_too_short += other.duration_too_short;
        self.sponsorship += other.sponsorship;
        self.passed += other.passed;
    }

    pub fn log_summary(&self) {
        info!("📊 Filter statistics");
        info!("  • Total videos: {}", self.total);
        info!("  • Channel blacklist: {}", self.channel_blacklist);
        info!("  • Stopwords: {}", self.stopword);
        info!("  • Title mismatch: {}", self.title_mismatch);
        info!("  • Too short: {}", self.duration_too_short);
        info!("  • Sponsored: {}", self.sponsorship);
        info!("  ✅ Passed: {} ({:.1}%)", self.passed, self.pass_rate());
    }
}

/// Parse an ISO-8601 `PT#H#M#S` duration into seconds
///
/// Only hour/minute/second components are understood; anything that does not
/// start with `PT` yields 0.
pub fn parse_duration_seconds(duration: &str) -> u64 {
    let Some(captures) = DURATION_RE.captures(duration.trim()) else {
        return 0;
    };

    let component = |index: usize| -> u64 {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    component(1)
        .saturating_mul(3600)
        .saturating_add(component(2).saturating_mul(60))
        .saturating_add(component(3))
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered exclusion rules built from `FilterConfig`
#[derive(Debug, Clone)]
pub struct ContentFilter {
    channel_blacklist: HashSet<String>,
    stopwords: Vec<String>,
    required_title_keywords: Vec<String>,
    require_title_keyword: bool,
    min_duration_seconds: u64,
    filter_short_videos: bool,
    sponsorship_keywords: Vec<String>,
    filter_sponsorships: bool,
}

impl ContentFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            channel_blacklist: config.channel_blacklist.iter().cloned().collect(),
            stopwords: config
                .stopwords
                .iter()
                .map(|w| squash(w))
                .filter(|w| !w.is_empty())
                .collect(),
            required_title_keywords: config.required_title_keywords.clone(),
            require_title_keyword: config.require_title_keyword,
            min_duration_seconds: config.min_duration_seconds,
            filter_short_videos: config.filter_short_videos,
            sponsorship_keywords: config
                .sponsorship_keywords
                .iter()
                .map(|w| w.to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            filter_sponsorships: config.filter_sponsorships,
        }
    }

    /// Classify one video
    pub fn evaluate(&self, video: &VideoDetail) -> FilterDecision {
        if self.channel_blacklist.contains(&video.channel_title) {
            return FilterDecision::Dropped(DropReason::ChannelBlacklist);
        }

        let squashed = squash(&format!("{} {}", video.title, video.description));
        if self.stopwords.iter().any(|w| squashed.contains(w.as_str())) {
            return FilterDecision::Dropped(DropReason::Stopword);
        }

        if self.require_title_keyword
            && !self.required_title_keywords.is_empty()
            && !self.required_title_keywords.iter().any(|k| video.title.contains(k.as_str()))
        {
            return FilterDecision::Dropped(DropReason::TitleMismatch);
        }

        if self.filter_short_videos && parse_duration_seconds(&video.duration) < self.min_duration_seconds {
            return FilterDecision::Dropped(DropReason::DurationTooShort);
        }

        if self.filter_sponsorships {
            let text = format!("{} {}", video.title, video.description).to_lowercase();
            if self.sponsorship_keywords.iter().any(|k| text.contains(k.as_str())) {
                return FilterDecision::Dropped(DropReason::Sponsorship);
            }
        }

        FilterDecision::Passed
    }

    /// Keep passing videos in order, recording every decision into `stats`
    pub fn apply(&self, videos: Vec<VideoDetail>, stats: &mut FilterStats) -> Vec<VideoDetail> {
        videos
            .into_iter()
            .filter(|video| {
                let decision = self.evaluate(video);
                stats.record(decision);
                if let FilterDecision::Dropped(reason) = decision {
                    debug!("Dropped {} ({}): {}", video.id, reason, video.title);
                }
                decision == FilterDecision::Passed
            })
            .collect()
    }
}
