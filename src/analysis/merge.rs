use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use super::dataset::{read_csv, ChangeIndicator, OpenDataSet};
use crate::persistence::bom_csv_writer;

type JoinKey = (u32, String);

/// One sales row with the auxiliary tables joined on (quarter, district code)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergedRow {
    pub quarter: u32,
    pub district_code: String,
    pub district_name: String,
    pub sector: String,

    pub sales_amount: f64,
    pub weekday_sales: f64,
    pub weekend_sales: f64,
    pub sales_age_10: f64,
    pub sales_age_20: f64,
    pub sales_age_30: f64,

    pub total_floating: f64,
    pub floating_age_20: f64,
    pub floating_age_30: f64,

    pub total_residents: f64,
    pub total_households: f64,

    pub change_indicator: String,
    pub change_score: f64,
    pub avg_operating_months: f64,

    pub facility_count: f64,
    pub subway_stations: f64,
}

impl MergedRow {
    pub fn key(&self) -> JoinKey {
        (self.quarter, self.district_code.clone())
    }
}

/// Join diagnostics
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MergeReport {
    pub sales_rows: usize,
    pub merged_rows: usize,
    /// Sales rows with no match, per auxiliary table
    pub unmatched: BTreeMap<String, usize>,
    /// Repeated (quarter, district code) keys, per auxiliary table
    pub duplicate_keys: BTreeMap<String, usize>,
    /// Repeated (quarter, district code, sector) sales rows
    pub duplicate_sales_rows: usize,
}

impl MergeReport {
    pub fn log_summary(&self) {
        info!("🔗 Merge: {} sales rows -> {} merged rows", self.sales_rows, self.merged_rows);
        for (table, count) in &self.unmatched {
            if *count > 0 {
                warn!("   {} sales rows have no {} match", count, table);
            }
        }
        for (table, count) in &self.duplicate_keys {
            if *count > 0 {
                warn!("   {} duplicate keys in {} (first occurrence kept)", count, table);
            }
        }
        if self.duplicate_sales_rows > 0 {
            warn!("   {} duplicate (quarter, district, sector) sales rows", self.duplicate_sales_rows);
        }
    }
}

/// Index rows by join key; the first occurrence wins
fn index_by_key<'a, T>(
    rows: &'a [T],
    key: impl Fn(&T) -> JoinKey,
) -> (HashMap<JoinKey, &'a T>, usize) {
    let mut index = HashMap::with_capacity(rows.len());
    let mut duplicates = 0;
    for row in rows {
        match index.entry(key(row)) {
            std::collections::hash_map::Entry::Occupied(_) => duplicates += 1,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }
    (index, duplicates)
}

/// Left-join the auxiliary tables onto the sales rows.
///
/// Every sales row yields exactly one merged row; missing auxiliary values
/// are zero-filled.
pub fn merge_datasets(data: &OpenDataSet) -> (Vec<MergedRow>, MergeReport) {
    let (floating, floating_dupes) =
        index_by_key(&data.floating, |r| (r.quarter, r.district_code.clone()));
    let (residents, resident_dupes) =
        index_by_key(&data.residents, |r| (r.quarter, r.district_code.clone()));
    let (change, change_dupes) =
        index_by_key(&data.change, |r| (r.quarter, r.district_code.clone()));
    let (facilities, facility_dupes) =
        index_by_key(&data.facilities, |r| (r.quarter, r.district_code.clone()));

    let mut report = MergeReport {
        sales_rows: data.sales.len(),
        ..MergeReport::default()
    };
    report.duplicate_keys.insert("floating_population".to_string(), floating_dupes);
    report.duplicate_keys.insert("residents".to_string(), resident_dupes);
    report.duplicate_keys.insert("change_indicator".to_string(), change_dupes);
    report.duplicate_keys.insert("facilities".to_string(), facility_dupes);

    let mut unmatched_floating = 0;
    let mut unmatched_residents = 0;
    let mut unmatched_change = 0;
    let mut unmatched_facilities = 0;
    let mut seen_sales = HashSet::new();

    let mut merged = Vec::with_capacity(data.sales.len());
    for sale in &data.sales {
        if !seen_sales.insert((sale.quarter, sale.district_code.clone(), sale.sector.clone())) {
            report.duplicate_sales_rows += 1;
        }

        let key = (sale.quarter, sale.district_code.clone());
        let mut row = MergedRow {
            quarter: sale.quarter,
            district_code: sale.district_code.clone(),
            district_name: sale.district_name.clone(),
            sector: sale.sector.clone(),
            sales_amount: sale.monthly_sales,
            weekday_sales: sale.weekday_sales,
            weekend_sales: sale.weekend_sales,
            sales_age_10: sale.sales_age_10,
            sales_age_20: sale.sales_age_20,
            sales_age_30: sale.sales_age_30,
            ..MergedRow::default()
        };

        match floating.get(&key) {
            Some(f) => {
                row.total_floating = f.total;
                row.floating_age_20 = f.age_20;
                row.floating_age_30 = f.age_30;
            }
            None => unmatched_floating += 1,
        }

        match residents.get(&key) {
            Some(r) => {
                row.total_residents = r.total_residents;
                row.total_households = r.total_households;
            }
            None => unmatched_residents += 1,
        }

        match change.get(&key) {
            Some(c) => {
                row.change_indicator = c.indicator_name.clone();
                row.change_score = ChangeIndicator::from_label(&c.indicator_name).score();
                row.avg_operating_months = c.avg_operating_months;
            }
            None => unmatched_change += 1,
        }

        match facilities.get(&key) {
            Some(f) => {
                row.facility_count = f.facility_count;
                row.subway_stations = f.subway_stations;
            }
            None => unmatched_facilities += 1,
        }

        merged.push(row);
    }

    report.merged_rows = merged.len();
    report.unmatched.insert("floating_population".to_string(), unmatched_floating);
    report.unmatched.insert("residents".to_string(), unmatched_residents);
    report.unmatched.insert("change_indicator".to_string(), unmatched_change);
    report.unmatched.insert("facilities".to_string(), unmatched_facilities);

    (merged, report)
}

pub fn write_merged(path: &Path, rows: &[MergedRow]) -> Result<()> {
    let mut writer = bom_csv_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("💾 Wrote {} merged rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_merged(path: &Path) -> Result<Vec<MergedRow>> {
    read_csv(path)
}
