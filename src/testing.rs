//! Fixture builders for tests.
//!
//! [`CsvFixture`] writes small CSV files whose JSON columns are quoted the way
//! real exports quote them. [`ga_visit`] and [`ga_dataset`] produce synthetic
//! rows shaped like the Google Analytics customer revenue data: 19-digit
//! visitor ids, some with leading zeros, and nested columns whose key sets
//! change from row to row.
//!
//! ```
//! use flatbeam::testing::ga_dataset;
//! # fn main() -> anyhow::Result<()> {
//! let (_dir, config) = ga_dataset(20, 10)?;
//! assert_eq!(config.train.total_rows, Some(20));
//! # Ok(())
//! # }
//! ```

use crate::loader::LoadConfig;
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Columns of the Google Analytics export, in file order.
pub const GA_HEADERS: [&str; 12] = [
    "channelGrouping",
    "date",
    "device",
    "fullVisitorId",
    "geoNetwork",
    "sessionId",
    "socialEngagementType",
    "totals",
    "trafficSource",
    "visitId",
    "visitNumber",
    "visitStartTime",
];

/// An in-memory CSV file under construction.
#[derive(Clone, Debug, Default)]
pub struct CsvFixture {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvFixture {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// A fixture with [`GA_HEADERS`] and `rows` rows from [`ga_visit`].
    #[must_use]
    pub fn ga(rows: usize) -> Self {
        (0..rows).fold(Self::new(GA_HEADERS), |f, i| f.row(ga_visit(i)))
    }

    #[must_use]
    pub fn row<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.rows.push(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as CSV text.
    ///
    /// # Errors
    /// Fails if a row is wider or narrower than the header.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for (i, row) in self.rows.iter().enumerate() {
            wtr.write_record(row)
                .with_context(|| format!("write fixture row #{}", i + 1))?;
        }
        wtr.flush()?;
        wtr.into_inner()
            .map_err(|e| anyhow::anyhow!("flush fixture: {}", e.error()))
    }

    /// Write to `path`, creating parent directories.
    ///
    /// # Errors
    /// I/O failures.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut f = create_file(path)?;
        f.write_all(&self.to_csv_bytes()?)?;
        Ok(path.to_path_buf())
    }

    /// Write gzip-compressed to `path`.
    ///
    /// # Errors
    /// I/O failures.
    #[cfg(feature = "compression-gzip")]
    pub fn write_gz(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let path = path.as_ref();
        let mut enc = GzEncoder::new(create_file(path)?, Compression::default());
        enc.write_all(&self.to_csv_bytes()?)?;
        enc.finish()?;
        Ok(path.to_path_buf())
    }
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("create {}", path.display()))
}

/// Visitor id of synthetic row `i`: 19 digits, a leading zero on even rows.
#[must_use]
pub fn ga_visitor_id(i: usize) -> String {
    if i % 2 == 0 {
        format!("0{:018}", 902_000_000_000_000_000u64 + i as u64)
    } else {
        format!("{}", 9_674_781_571_160_116_000u64 + i as u64)
    }
}

/// Synthetic Google Analytics row `i`, in [`GA_HEADERS`] order.
///
/// Nested key sets vary: every 3rd row is mobile, every 5th carries an
/// `adwordsClickInfo` object, every 7th has a `transactionRevenue`.
#[must_use]
pub fn ga_visit(i: usize) -> Vec<String> {
    let visit_id = 1_472_830_385 + i as u64;
    let mobile = i % 3 == 0;

    let device = if mobile {
        json!({"browser": "Safari", "operatingSystem": "iOS", "isMobile": true, "deviceCategory": "mobile"})
    } else {
        json!({"browser": "Chrome", "operatingSystem": "Windows", "isMobile": false, "deviceCategory": "desktop"})
    };
    let city = if i % 4 == 0 { "Paris" } else { "not available in demo dataset" };
    let geo = json!({"continent": "Europe", "country": "France", "city": city});

    let mut totals = json!({"visits": "1", "hits": (i % 9 + 1).to_string(), "pageviews": (i % 6 + 1).to_string()});
    if i % 2 == 1 {
        totals["bounces"] = json!("1");
    }
    if i % 7 == 0 {
        totals["transactionRevenue"] = json!(((i + 1) * 1_000_000).to_string());
    }

    let mut traffic = json!({"campaign": "(not set)", "source": "google", "medium": "organic"});
    if i % 5 == 0 {
        traffic["adwordsClickInfo"] = json!({"page": "1", "slot": "Top", "adNetworkType": "Google Search"});
    }
    if i % 11 == 0 {
        traffic["isTrueDirect"] = json!(true);
    }

    vec![
        if mobile { "Social" } else { "Organic Search" }.to_string(),
        (20_160_902 + (i % 28) as u64).to_string(),
        device.to_string(),
        ga_visitor_id(i),
        geo.to_string(),
        format!("{}_{}", ga_visitor_id(i), visit_id),
        "Not Socially Engaged".to_string(),
        totals.to_string(),
        traffic.to_string(),
        visit_id.to_string(),
        (i % 4 + 1).to_string(),
        visit_id.to_string(),
    ]
}

/// A temp directory holding GA-shaped `train.csv` and `test.csv`, and the
/// matching config with known totals.
///
/// Keep the returned [`TempDir`] alive while the files are needed.
///
/// # Errors
/// I/O failures.
pub fn ga_dataset(train_rows: usize, test_rows: usize) -> Result<(TempDir, LoadConfig)> {
    let dir = tempfile::tempdir()?;
    let mut config = LoadConfig::google_analytics(dir.path());
    CsvFixture::ga(train_rows).write(&config.train.path)?;
    CsvFixture::ga(test_rows).write(&config.test.path)?;
    config.train.total_rows = Some(train_rows as u64);
    config.test.total_rows = Some(test_rows as u64);
    Ok((dir, config))
}
