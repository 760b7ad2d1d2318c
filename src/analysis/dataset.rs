use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use encoding_rs::Encoding;
use walkdir::WalkDir;

use crate::config::AnalysisConfig;

/// Empty, malformed or non-finite numeric cells read as zero
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(|s| s.trim().replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0))
}

/// Estimated sales per (quarter, district, service sector)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesRecord {
    #[serde(rename = "기준_년분기_코드", alias = "STDR_YYQU_CD")]
    pub quarter: u32,
    #[serde(rename = "행정동_코드", alias = "ADSTRD_CD")]
    pub district_code: String,
    #[serde(rename = "행정동_코드_명", alias = "ADSTRD_CD_NM")]
    pub district_name: String,
    #[serde(rename = "서비스_업종_코드_명", alias = "SVC_INDUTY_CD_NM")]
    pub sector: String,
    #[serde(rename = "당월_매출_금액", alias = "THSMON_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub monthly_sales: f64,
    #[serde(rename = "주중_매출_금액", alias = "MDWK_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub weekday_sales: f64,
    #[serde(rename = "주말_매출_금액", alias = "WKEND_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub weekend_sales: f64,
    #[serde(rename = "연령대_10_매출_금액", alias = "AGRDE_10_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub sales_age_10: f64,
    #[serde(rename = "연령대_20_매출_금액", alias = "AGRDE_20_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub sales_age_20: f64,
    #[serde(rename = "연령대_30_매출_금액", alias = "AGRDE_30_SELNG_AMT", default, deserialize_with = "lenient_f64")]
    pub sales_age_30: f64,
}

/// Street-level floating population per (quarter, district)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FloatingPopulationRecord {
    #[serde(rename = "기준_년분기_코드", alias = "STDR_YYQU_CD")]
    pub quarter: u32,
    #[serde(rename = "행정동_코드", alias = "ADSTRD_CD")]
    pub district_code: String,
    #[serde(rename = "총_유동인구_수", alias = "TOT_FLPOP_CO", default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(rename = "연령대_20_유동인구_수", alias = "AGRDE_20_FLPOP_CO", default, deserialize_with = "lenient_f64")]
    pub age_20: f64,
    #[serde(rename = "연령대_30_유동인구_수", alias = "AGRDE_30_FLPOP_CO", default, deserialize_with = "lenient_f64")]
    pub age_30: f64,
}

impl FloatingPopulationRecord {
    pub fn mz(&self) -> f64 {
        self.age_20 + self.age_30
    }
}

/// Resident population per (quarter, district)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResidentRecord {
    #[serde(rename = "기준_년분기_코드", alias = "STDR_YYQU_CD")]
    pub quarter: u32,
    #[serde(rename = "행정동_코드", alias = "ADSTRD_CD")]
    pub district_code: String,
    #[serde(rename = "총_상주인구_수", alias = "TOT_REPOP_CO", default, deserialize_with = "lenient_f64")]
    pub total_residents: f64,
    #[serde(rename = "총_가구_수", alias = "TOT_HSHLD_CO", default, deserialize_with = "lenient_f64")]
    pub total_households: f64,
}

/// District change indicator per (quarter, district)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChangeIndicatorRecord {
    #[serde(rename = "기준_년분기_코드", alias = "STDR_YYQU_CD")]
    pub quarter: u32,
    #[serde(rename = "행정동_코드", alias = "ADSTRD_CD")]
    pub district_code: String,
    #[serde(rename = "상권_변화_지표_명", alias = "TRDAR_CHNGE_IX_NM", default)]
    pub indicator_name: String,
    #[serde(rename = "운영_영업_개월_평균", alias = "OPR_SALE_MT_AVRG", default, deserialize_with = "lenient_f64")]
    pub avg_operating_months: f64,
}

/// Visitor-attracting facilities per (quarter, district)
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FacilityRecord {
    #[serde(rename = "기준_년분기_코드", alias = "STDR_YYQU_CD")]
    pub quarter: u32,
    #[serde(rename = "행정동_코드", alias = "ADSTRD_CD")]
    pub district_code: String,
    #[serde(rename = "집객시설_수", alias = "VIATR_FCLTY_CO", default, deserialize_with = "lenient_f64")]
    pub facility_count: f64,
    #[serde(rename = "지하철_역_수", alias = "SUBWAY_STATN_CO", default, deserialize_with = "lenient_f64")]
    pub subway_stations: f64,
}

/// Ordinal reading of the district change indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeIndicator {
    Dynamic,
    Expansion,
    Stagnation,
    Contraction,
    Unknown,
}

impl ChangeIndicator {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "다이나믹" => ChangeIndicator::Dynamic,
            "상권확장" => ChangeIndicator::Expansion,
            "정체" => ChangeIndicator::Stagnation,
            "상권축소" => ChangeIndicator::Contraction,
            _ => ChangeIndicator::Unknown,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            ChangeIndicator::Dynamic => 4.0,
            ChangeIndicator::Expansion => 3.0,
            ChangeIndicator::Stagnation => 2.0,
            ChangeIndicator::Contraction => 1.0,
            ChangeIndicator::Unknown => 0.0,
        }
    }
}

/// Sector and quarter restrictions applied to sales rows
#[derive(Debug, Clone, Default)]
pub struct SalesFilter {
    target_sectors: HashSet<String>,
    excluded_quarters: HashSet<u32>,
}

impl SalesFilter {
    pub fn new(target_sectors: &[String], excluded_quarters: &[u32]) -> Self {
        Self {
            target_sectors: target_sectors.iter().cloned().collect(),
            excluded_quarters: excluded_quarters.iter().copied().collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(&config.target_sectors, &config.excluded_quarters)
    }

    pub fn keeps(&self, record: &SalesRecord) -> bool {
        if self.excluded_quarters.contains(&record.quarter) {
            return false;
        }
        self.target_sectors.is_empty() || self.target_sectors.contains(&record.sector)
    }
}

/// Resolve an encoding label, accepting the Windows `cp949`/`ms949` names for
/// EUC-KR
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    match label.trim().to_ascii_lowercase().as_str() {
        "cp949" | "ms949" => Some(encoding_rs::EUC_KR),
        other => Encoding::for_label(other.as_bytes()),
    }
}

/// Decode file bytes as text.
///
/// `auto` takes UTF-8 when the bytes are valid UTF-8 and CP949 otherwise,
/// the encoding Seoul open-data portal extracts ship in. Any other value is
/// an encoding label. A leading BOM is dropped.
pub fn decode_text(bytes: &[u8], encoding: &str) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    let encoding = if encoding.eq_ignore_ascii_case("auto") {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Ok(text.to_string());
        }
        encoding_rs::EUC_KR
    } else {
        encoding_for_label(encoding)
            .ok_or_else(|| anyhow!("unknown encoding: {}", encoding))?
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(anyhow!("input is not valid {}", encoding.name()));
    }
    Ok(text.into_owned())
}

/// Read a CSV file into typed rows, detecting UTF-8 or CP949
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    read_csv_with_encoding(path, "auto")
}

pub fn read_csv_with_encoding<T: DeserializeOwned>(path: &Path, encoding: &str) -> Result<Vec<T>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let content = decode_text(&bytes, encoding).with_context(|| format!("decoding {}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        let row: T = row.with_context(|| format!("{}: row {}", path.display(), index + 2))?;
        rows.push(row);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Sales extracts in `dir` whose file name starts with `prefix`, sorted by name
pub fn discover_sales_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("data directory not found: {}", dir.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(prefix) && name.to_lowercase().ends_with(".csv")
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// All extracts needed for the merge
#[derive(Debug, Clone, Default)]
pub struct OpenDataSet {
    pub sales: Vec<SalesRecord>,
    pub floating: Vec<FloatingPopulationRecord>,
    pub residents: Vec<ResidentRecord>,
    pub change: Vec<ChangeIndicatorRecord>,
    pub facilities: Vec<FacilityRecord>,
}

impl OpenDataSet {
    /// Load every extract named in `config`
    pub fn load(config: &AnalysisConfig) -> Result<Self> {
        let dir = &config.data_dir;
        let filter = SalesFilter::from_config(config);
        let encoding = config.encoding.as_str();

        let sales_files = discover_sales_files(dir, &config.sales_file_prefix)?;
        if sales_files.is_empty() {
            return Err(anyhow!(
                "no sales extracts matching '{}*.csv' in {}",
                config.sales_file_prefix,
                dir.display()
            ));
        }

        let mut sales = Vec::new();
        for file in &sales_files {
            let rows: Vec<SalesRecord> = read_csv_with_encoding(file, encoding)?;
            let total = rows.len();
            let before = sales.len();
            sales.extend(rows.into_iter().filter(|r| filter.keeps(r)));
            info!("🔍 {}: kept {} of {} rows", file.display(), sales.len() - before, total);
        }

        let data_set = Self {
            sales,
            floating: read_csv_with_encoding(&dir.join(&config.floating_population_file), encoding)?,
            residents: read_csv_with_encoding(&dir.join(&config.resident_population_file), encoding)?,
            change: read_csv_with_encoding(&dir.join(&config.change_indicator_file), encoding)?,
            facilities: read_csv_with_encoding(&dir.join(&config.facility_file), encoding)?,
        };

        info!(
            "📦 Loaded {} sales, {} floating, {} resident, {} change, {} facility rows",
            data_set.sales.len(),
            data_set.floating.len(),
            data_set.residents.len(),
            data_set.change.len(),
            data_set.facilities.len()
        );

        Ok(data_set)
    }
}
