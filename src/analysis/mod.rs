//! Commercial-district analysis over Seoul open-data extracts
//!
//! `dataset` loads the raw CSV extracts, `merge` left-joins them onto the
//! sales rows, `aggregate` folds the merged rows into one record per
//! (quarter, district) and `scoring` turns those records into rankings.

pub mod aggregate;
pub mod dataset;
pub mod merge;
pub mod scoring;
pub mod stats;

pub use aggregate::{aggregate_districts, normalize_district_name, DistrictRecord, PopulationAggregation};
pub use dataset::{ChangeIndicator, OpenDataSet, SalesFilter};
pub use merge::{merge_datasets, MergeReport, MergedRow};
pub use scoring::{Ranking, RankingEntry, RowFilter, ScoringModel, WeightedFeature};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-district feature a scoring model can weight or filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    SalesAmount,
    TotalFloating,
    MzFloating,
    TotalResidents,
    FacilityCount,
    SubwayStations,
    ChangeScore,
    AvgOperatingMonths,
    /// MZ floating population / (total floating + 1)
    MzFloatingShare,
    /// Age 20-30 sales / (total sales + 1)
    MzSalesShare,
    /// Floating population / (residents + 1)
    InflowIntensity,
    /// Sales amount x facility count
    CommercialEnergy,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::SalesAmount => "sales_amount",
            Feature::TotalFloating => "total_floating",
            Feature::MzFloating => "mz_floating",
            Feature::TotalResidents => "total_residents",
            Feature::FacilityCount => "facility_count",
            Feature::SubwayStations => "subway_stations",
            Feature::ChangeScore => "change_score",
            Feature::AvgOperatingMonths => "avg_operating_months",
            Feature::MzFloatingShare => "mz_floating_share",
            Feature::MzSalesShare => "mz_sales_share",
            Feature::InflowIntensity => "inflow_intensity",
            Feature::CommercialEnergy => "commercial_energy",
        }
    }

    /// Read this feature from an aggregated record
    pub fn value(&self, record: &DistrictRecord) -> f64 {
        match self {
            Feature::SalesAmount => record.sales_amount,
            Feature::TotalFloating => record.total_floating,
            Feature::MzFloating => record.mz_floating,
            Feature::TotalResidents => record.total_residents,
            Feature::FacilityCount => record.facility_count,
            Feature::SubwayStations => record.subway_stations,
            Feature::ChangeScore => record.change_score,
            Feature::AvgOperatingMonths => record.avg_operating_months,
            Feature::MzFloatingShare => record.mz_floating_share(),
            Feature::MzSalesShare => record.mz_sales_share(),
            Feature::InflowIntensity => record.inflow_intensity(),
            Feature::CommercialEnergy => record.commercial_energy(),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
