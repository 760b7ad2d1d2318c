use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::analysis::dataset::decode_text;
use crate::analysis::stats::percentile_rank_present;
use crate::config::QuadrantConfig;

/// Position in the (x, y) percentile plane, split at 0.5 on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// x >= 0.5, y >= 0.5
    Core,
    /// x < 0.5, y >= 0.5
    Potential,
    /// x < 0.5, y < 0.5
    Stagnant,
    /// x >= 0.5, y < 0.5
    Efficient,
}

impl Quadrant {
    pub fn classify(x: f64, y: f64) -> Self {
        match (x >= 0.5, y >= 0.5) {
            (true, true) => Quadrant::Core,
            (false, true) => Quadrant::Potential,
            (false, false) => Quadrant::Stagnant,
            (true, false) => Quadrant::Efficient,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Quadrant::Core => "#e74c3c",
            Quadrant::Potential => "#f1c40f",
            Quadrant::Stagnant => "#95a5a6",
            Quadrant::Efficient => "#3498db",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quadrant::Core => "1사분면 (핵심)",
            Quadrant::Potential => "2사분면 (잠재)",
            Quadrant::Stagnant => "3사분면 (정체)",
            Quadrant::Efficient => "4사분면 (효율)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuadrantPoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub quadrant: Quadrant,
}

impl QuadrantPoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            quadrant: Quadrant::classify(x, y),
        }
    }
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow!("column '{}' not found in {}", name, path.display()))
}

/// Blank, unparseable and non-finite cells count as missing
fn parse_cell(record: &csv::StringRecord, index: usize, column: &str, line: usize) -> Option<f64> {
    let cell = record.get(index).unwrap_or("").trim();
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!("⚠️ Row {}: missing value for '{}' ({:?})", line, column, cell);
            None
        }
    }
}

/// Build quadrant points from a CSV table.
///
/// x is the weighted sum of the percentile ranks of the configured columns and
/// y is the percentile rank of the y column. Missing cells are left out of
/// their column's ranking; rows without a full (x, y) position are skipped.
pub fn compute_quadrant_index(path: &Path, config: &QuadrantConfig) -> Result<Vec<QuadrantPoint>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let content = decode_text(&bytes, "auto").with_context(|| format!("decoding {}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();

    let name_index = column_index(&headers, &config.name_column, path)?;
    let y_index = column_index(&headers, &config.y_column, path)?;
    let x_indexes = config
        .x_components
        .iter()
        .map(|c| column_index(&headers, &c.column, path))
        .collect::<Result<Vec<_>>>()?;

    let mut names = Vec::new();
    let mut lines = Vec::new();
    let mut y_values = Vec::new();
    let mut x_columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); x_indexes.len()];

    for (row, record) in reader.records().enumerate() {
        let line = row + 2;
        let record = record.with_context(|| format!("{}: row {}", path.display(), line))?;
        names.push(record.get(name_index).unwrap_or("").to_string());
        lines.push(line);
        y_values.push(parse_cell(&record, y_index, &config.y_column, line));
        let components = x_indexes.iter().zip(&config.x_components);
        for (values, (&index, component)) in x_columns.iter_mut().zip(components) {
            values.push(parse_cell(&record, index, &component.column, line));
        }
    }

    let y_ranks = percentile_rank_present(&y_values);
    let mut x_values = vec![Some(0.0); names.len()];
    for (component, values) in config.x_components.iter().zip(&x_columns) {
        for (x, rank) in x_values.iter_mut().zip(percentile_rank_present(values)) {
            *x = match (*x, rank) {
                (Some(sum), Some(rank)) => Some(sum + component.weight * rank),
                _ => None,
            };
        }
    }

    let mut points = Vec::with_capacity(names.len());
    for (((name, line), x), y) in names.into_iter().zip(lines).zip(x_values).zip(y_ranks) {
        match (x, y) {
            (Some(x), Some(y)) => points.push(QuadrantPoint::new(name, x, y)),
            _ => warn!("⚠️ Row {}: {} skipped, incomplete quadrant position", line, name),
        }
    }

    info!("📐 Quadrant index computed for {} districts", points.len());
    Ok(points)
}
