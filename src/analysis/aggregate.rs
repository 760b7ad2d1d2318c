use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::merge::MergedRow;
use crate::config::DistrictAlias;

static NON_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^가-힣0-9]").unwrap());

/// Strip everything except Hangul syllables and digits, then apply the first
/// matching alias.
pub fn normalize_district_name(name: &str, aliases: &[DistrictAlias]) -> String {
    let cleaned = NON_NAME_CHARS.replace_all(name, "").into_owned();
    aliases
        .iter()
        .find(|alias| !alias.contains.is_empty() && cleaned.contains(&alias.contains))
        .map(|alias| alias.name.clone())
        .unwrap_or(cleaned)
}

/// How repeated per-district values are folded into a district record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationAggregation {
    /// Sum population over every merged row and average indicators over rows
    #[default]
    SumRows,
    /// Count each district code once before summing or averaging
    DistinctCodes,
}

/// One (quarter, district) after folding sector rows and aliased codes
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DistrictRecord {
    pub quarter: u32,
    pub district_name: String,
    pub district_codes: Vec<String>,

    pub sales_amount: f64,
    pub sales_age_20: f64,
    pub sales_age_30: f64,

    pub total_floating: f64,
    pub mz_floating: f64,
    pub total_residents: f64,

    pub facility_count: f64,
    pub subway_stations: f64,

    pub change_score: f64,
    pub avg_operating_months: f64,
}

impl DistrictRecord {
    pub fn mz_floating_share(&self) -> f64 {
        self.mz_floating / (self.total_floating + 1.0)
    }

    pub fn mz_sales_share(&self) -> f64 {
        (self.sales_age_20 + self.sales_age_30) / (self.sales_amount + 1.0)
    }

    pub fn inflow_intensity(&self) -> f64 {
        self.total_floating / (self.total_residents + 1.0)
    }

    pub fn commercial_energy(&self) -> f64 {
        self.sales_amount * self.facility_count
    }
}

/// Values repeated on every sector row of a district code
#[derive(Debug, Clone, Copy)]
struct CodeFacts {
    total_floating: f64,
    mz_floating: f64,
    total_residents: f64,
    facility_count: f64,
    subway_stations: f64,
    change_score: f64,
    avg_operating_months: f64,
}

impl From<&MergedRow> for CodeFacts {
    fn from(row: &MergedRow) -> Self {
        Self {
            total_floating: row.total_floating,
            mz_floating: row.floating_age_20 + row.floating_age_30,
            total_residents: row.total_residents,
            facility_count: row.facility_count,
            subway_stations: row.subway_stations,
            change_score: row.change_score,
            avg_operating_months: row.avg_operating_months,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    sales_amount: f64,
    sales_age_20: f64,
    sales_age_30: f64,
    codes: BTreeMap<String, CodeFacts>,
    rows: Vec<CodeFacts>,
}

/// Group merged rows by (quarter, normalized name).
///
/// Sales are summed over every row, facility counts take the maximum. With
/// [`PopulationAggregation::SumRows`] population is summed and the averaged
/// indicators take the mean over every row; with
/// [`PopulationAggregation::DistinctCodes`] both work over one entry per
/// district code. Output is sorted by quarter then name.
pub fn aggregate_districts(
    rows: &[MergedRow],
    aliases: &[DistrictAlias],
    mode: PopulationAggregation,
) -> Vec<DistrictRecord> {
    let mut groups: BTreeMap<(u32, String), Accumulator> = BTreeMap::new();

    for row in rows {
        let name = normalize_district_name(&row.district_name, aliases);
        let acc = groups.entry((row.quarter, name)).or_default();
        acc.sales_amount += row.sales_amount;
        acc.sales_age_20 += row.sales_age_20;
        acc.sales_age_30 += row.sales_age_30;
        acc.rows.push(CodeFacts::from(row));
        acc.codes
            .entry(row.district_code.clone())
            .or_insert_with(|| CodeFacts::from(row));
    }

    groups
        .into_iter()
        .map(|((quarter, district_name), acc)| {
            let facts: Vec<CodeFacts> = match mode {
                PopulationAggregation::SumRows => acc.rows,
                PopulationAggregation::DistinctCodes => acc.codes.values().copied().collect(),
            };
            let count = facts.len().max(1) as f64;

            DistrictRecord {
                quarter,
                district_name,
                district_codes: acc.codes.keys().cloned().collect(),
                sales_amount: acc.sales_amount,
                sales_age_20: acc.sales_age_20,
                sales_age_30: acc.sales_age_30,
                total_floating: facts.iter().map(|f| f.total_floating).sum(),
                mz_floating: facts.iter().map(|f| f.mz_floating).sum(),
                total_residents: facts.iter().map(|f| f.total_residents).sum(),
                facility_count: facts.iter().map(|f| f.facility_count).fold(0.0, f64::max),
                subway_stations: facts.iter().map(|f| f.subway_stations).fold(0.0, f64::max),
                change_score: facts.iter().map(|f| f.change_score).sum::<f64>() / count,
                avg_operating_months: facts.iter().map(|f| f.avg_operating_months).sum::<f64>()
                    / count,
            }
        })
        .collect()
}
