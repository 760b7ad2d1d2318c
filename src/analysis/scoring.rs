use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::aggregate::DistrictRecord;
use super::stats::{mean, min_max_normalize, quantile};
use super::Feature;
use crate::persistence::bom_csv_writer;

fn default_scale() -> f64 {
    100.0
}

fn default_top_n() -> usize {
    10
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeightedFeature {
    pub feature: Feature,
    pub weight: f64,
}

impl WeightedFeature {
    pub fn new(feature: Feature, weight: f64) -> Self {
        Self { feature, weight }
    }
}

/// Row restriction applied before normalization.
///
/// Thresholds are computed over the rows that survived the previous filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowFilter {
    /// Keep rows strictly above the quantile
    AboveQuantile { feature: Feature, quantile: f64 },
    /// Keep rows strictly below the quantile
    BelowQuantile { feature: Feature, quantile: f64 },
    AtLeast { feature: Feature, value: f64 },
    /// Keep rows strictly above the mean
    AboveMean { feature: Feature },
}

impl RowFilter {
    pub fn feature(&self) -> Feature {
        match self {
            RowFilter::AboveQuantile { feature, .. }
            | RowFilter::BelowQuantile { feature, .. }
            | RowFilter::AtLeast { feature, .. }
            | RowFilter::AboveMean { feature } => *feature,
        }
    }

    fn apply<'a>(&self, rows: Vec<&'a DistrictRecord>) -> Vec<&'a DistrictRecord> {
        let feature = self.feature();
        let values: Vec<f64> = rows.iter().map(|r| feature.value(r)).collect();

        let keep: Box<dyn Fn(f64) -> bool> = match *self {
            RowFilter::AboveQuantile { quantile: q, .. } => match quantile(&values, q) {
                Some(threshold) => Box::new(move |v: f64| v > threshold),
                None => return rows,
            },
            RowFilter::BelowQuantile { quantile: q, .. } => match quantile(&values, q) {
                Some(threshold) => Box::new(move |v: f64| v < threshold),
                None => return rows,
            },
            RowFilter::AtLeast { value, .. } => Box::new(move |v: f64| v >= value),
            RowFilter::AboveMean { .. } => match mean(&values) {
                Some(threshold) => Box::new(move |v: f64| v > threshold),
                None => return rows,
            },
        };

        rows.into_iter()
            .zip(values)
            .filter(|(_, v)| keep(*v))
            .map(|(row, _)| row)
            .collect()
    }
}

/// Named, versioned weight vector over district features
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringModel {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Quarter codes to keep; all quarters when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarters: Option<Vec<u32>>,

    #[serde(default = "default_scale")]
    pub scale: f64,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub row_filters: Vec<RowFilter>,

    pub features: Vec<WeightedFeature>,
}

/// One ranked district
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub rank: usize,
    pub district_name: String,
    pub score: f64,
    /// Mean raw value of each weighted feature, in model order
    pub features: Vec<(Feature, f64)>,
}

/// Result of running a model
#[derive(Debug, Clone)]
pub struct Ranking {
    pub model: String,
    /// Rows left after quarter selection and row filters
    pub rows_scored: usize,
    /// All districts, best first
    pub entries: Vec<RankingEntry>,
    pub top_n: usize,
}

impl Ranking {
    pub fn top(&self) -> &[RankingEntry] {
        &self.entries[..self.top_n.min(self.entries.len())]
    }

    pub fn log_summary(&self) {
        info!("🏆 {}: {} rows scored, {} districts", self.model, self.rows_scored, self.entries.len());
        for entry in self.top() {
            info!("   {:>3}. {} ({:.2})", entry.rank, entry.district_name, entry.score);
        }
    }

    /// Write the top-N slice as CSV: rank, district, score, then one column per feature
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = bom_csv_writer(path)?;

        let mut header = vec!["Rank".to_string(), "district".to_string(), "score".to_string()];
        if let Some(first) = self.entries.first() {
            header.extend(first.features.iter().map(|(f, _)| f.to_string()));
        }
        writer.write_record(&header)?;

        for entry in self.top() {
            let mut record = vec![
                entry.rank.to_string(),
                entry.district_name.clone(),
                format!("{:.4}", entry.score),
            ];
            record.extend(entry.features.iter().map(|(_, v)| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!("💾 Wrote ranking to {}", path.display());
        Ok(())
    }
}

impl ScoringModel {
    pub fn label(&self) -> String {
        format!("{} v{}", self.name, self.version)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("scoring model name must not be empty"));
        }
        if self.features.is_empty() {
            return Err(anyhow!("scoring model {} has no features", self.label()));
        }
        if self.features.iter().any(|f| !f.weight.is_finite()) {
            return Err(anyhow!("scoring model {} has a non-finite weight", self.label()));
        }
        if !self.scale.is_finite() {
            return Err(anyhow!("scoring model {} has a non-finite scale", self.label()));
        }
        if self.top_n == 0 {
            return Err(anyhow!("scoring model {} must keep at least one district", self.label()));
        }
        for filter in &self.row_filters {
            match filter {
                RowFilter::AboveQuantile { quantile, .. } | RowFilter::BelowQuantile { quantile, .. }
                    if !(0.0..=1.0).contains(quantile) =>
                {
                    return Err(anyhow!(
                        "scoring model {}: quantile {} outside [0, 1]",
                        self.label(),
                        quantile
                    ));
                }
                RowFilter::AtLeast { value, .. } if !value.is_finite() => {
                    return Err(anyhow!("scoring model {}: non-finite threshold", self.label()));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Select, filter, normalize and score records, then rank districts by
    /// their mean score across the remaining quarters.
    pub fn rank(&self, records: &[DistrictRecord]) -> Ranking {
        let mut rows: Vec<&DistrictRecord> = records
            .iter()
            .filter(|r| match &self.quarters {
                Some(quarters) => quarters.contains(&r.quarter),
                None => true,
            })
            .collect();
        debug!("{}: {} rows after quarter selection", self.label(), rows.len());

        for filter in &self.row_filters {
            rows = filter.apply(rows);
            debug!("{}: {} rows after {:?}", self.label(), rows.len(), filter);
        }

        let normalized: Vec<Vec<f64>> = self
            .features
            .iter()
            .map(|wf| {
                let column: Vec<f64> = rows.iter().map(|r| wf.feature.value(r)).collect();
                min_max_normalize(&column)
            })
            .collect();

        // district -> (score sum, feature sums, row count)
        let mut by_district: BTreeMap<&str, (f64, Vec<f64>, usize)> = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            let score = self.scale
                * self
                    .features
                    .iter()
                    .zip(&normalized)
                    .map(|(wf, column)| wf.weight * column[i])
                    .sum::<f64>();

            let slot = by_district
                .entry(row.district_name.as_str())
                .or_insert_with(|| (0.0, vec![0.0; self.features.len()], 0));
            slot.0 += score;
            for (sum, wf) in slot.1.iter_mut().zip(&self.features) {
                *sum += wf.feature.value(row);
            }
            slot.2 += 1;
        }

        let mut entries: Vec<RankingEntry> = by_district
            .into_iter()
            .map(|(name, (score_sum, feature_sums, count))| {
                let n = count as f64;
                RankingEntry {
                    rank: 0,
                    district_name: name.to_string(),
                    score: score_sum / n,
                    features: self
                        .features
                        .iter()
                        .zip(feature_sums)
                        .map(|(wf, sum)| (wf.feature, sum / n))
                        .collect(),
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.district_name.cmp(&b.district_name))
        });
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        Ranking {
            model: self.label(),
            rows_scored: rows.len(),
            entries,
            top_n: self.top_n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(quarter: u32, name: &str, sales: f64, facilities: f64) -> DistrictRecord {
        DistrictRecord {
            quarter,
            district_name: name.to_string(),
            sales_amount: sales,
            facility_count: facilities,
            ..DistrictRecord::default()
        }
    }

    fn model(features: Vec<WeightedFeature>) -> ScoringModel {
        ScoringModel {
            name: "test".to_string(),
            version: "1".to_string(),
            description: None,
            quarters: None,
            row_filters: Vec::new(),
            features,
            scale: 100.0,
            top_n: 2,
        }
    }

    #[test]
    fn test_extreme_rows_score_zero_and_scale() {
        let records = vec![
            record(20251, "가", 10.0, 1.0),
            record(20251, "나", 30.0, 5.0),
            record(20251, "다", 20.0, 3.0),
        ];
        let m = model(vec![
            WeightedFeature::new(Feature::SalesAmount, 0.5),
            WeightedFeature::new(Feature::FacilityCount, 0.5),
        ]);

        let ranking = m.rank(&records);
        let names: Vec<&str> = ranking.entries.iter().map(|e| e.district_name.as_str()).collect();
        assert_eq!(names, vec!["나", "다", "가"]);
        assert_eq!(ranking.entries[0].score, 100.0);
        assert_eq!(ranking.entries[2].score, 0.0);
        assert!((ranking.entries[1].score - 50.0).abs() < 1e-9);
        assert_eq!(ranking.top().len(), 2);
        assert_eq!(ranking.entries[0].rank, 1);
    }

    #[test]
    fn test_mean_score_across_quarters_and_tie_break() {
        let records = vec![
            record(20244, "나", 0.0, 0.0),
            record(20251, "나", 10.0, 0.0),
            record(20244, "가", 10.0, 0.0),
            record(20251, "가", 0.0, 0.0),
        ];
        let ranking = model(vec![WeightedFeature::new(Feature::SalesAmount, 1.0)]).rank(&records);

        assert_eq!(ranking.entries[0].district_name, "가");
        assert_eq!(ranking.entries[1].district_name, "나");
        assert_eq!(ranking.entries[0].score, 50.0);
        assert_eq!(ranking.entries[0].features, vec![(Feature::SalesAmount, 5.0)]);
    }

    #[test]
    fn test_quarter_selection_and_row_filters() {
        let mut records: Vec<DistrictRecord> = (1..=5)
            .map(|i| record(20251, &format!("동{}", i), i as f64 * 10.0, 1.0))
            .collect();
        records.push(record(20244, "동9", 1000.0, 1.0));

        let mut m = model(vec![WeightedFeature::new(Feature::SalesAmount, 1.0)]);
        m.quarters = Some(vec![20251]);
        m.row_filters = vec![RowFilter::BelowQuantile {
            feature: Feature::SalesAmount,
            quantile: 0.8,
        }];

        // quantile(0.8) of [10..50] is 42, so 50 is dropped
        let ranking = m.rank(&records);
        assert_eq!(ranking.rows_scored, 4);
        assert_eq!(ranking.entries[0].district_name, "동4");

        m.row_filters.push(RowFilter::AboveMean { feature: Feature::SalesAmount });
        let ranking = m.rank(&records);
        assert_eq!(ranking.rows_scored, 2);
    }

    #[test]
    fn test_validate() {
        let mut m = model(vec![WeightedFeature::new(Feature::SalesAmount, 1.0)]);
        assert!(m.validate().is_ok());

        m.row_filters = vec![RowFilter::AboveQuantile {
            feature: Feature::SalesAmount,
            quantile: 1.5,
        }];
        assert!(m.validate().is_err());

        let empty = model(Vec::new());
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_row_filter_serde_shape() {
        let filter: RowFilter =
            serde_json::from_str(r#"{"kind":"at_least","feature":"subway_stations","value":1.0}"#)
                .unwrap();
        assert_eq!(
            filter,
            RowFilter::AtLeast { feature: Feature::SubwayStations, value: 1.0 }
        );
    }

    #[test]
    fn test_write_csv_top_slice() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ranking.csv");
        let records = vec![
            record(20251, "가", 10.0, 1.0),
            record(20251, "나", 30.0, 5.0),
            record(20251, "다", 20.0, 3.0),
        ];

        model(vec![WeightedFeature::new(Feature::SalesAmount, 1.0)])
            .rank(&records)
            .write_csv(&path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let content = content.strip_prefix('\u{feff}').expect("ranking starts with a BOM");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Rank,district,score,sales_amount");
        assert_eq!(lines[1], "1,나,100.0000,30");
        assert_eq!(lines.len(), 3);
    }
}
