//! Loading a train/test pair into flattened tables.
//!
//! Each file goes through the same single-threaded pipeline:
//!
//! 1. resolve a [`SamplePlan`] from the file's own total row count;
//! 2. stream rows, dropping those the plan skips and stopping at its cap;
//! 3. coerce flat fields through the [`ColumnLayout`] and decode the nested
//!    ones, keeping one record list per nested column;
//! 4. flatten each nested column and merge it onto the base rows by position.
//!
//! The two files share nothing while loading, so [`DatasetLoader::load`] runs
//! them on separate rayon workers unless [`LoadConfig::parallel`] is off.

use crate::decode::{NestedRecord, decode};
use crate::error::LoadError;
use crate::flatten::{FlattenOptions, flatten_with};
use crate::io::csv::{RowReader, count_rows};
use crate::sampling::{RowLimit, SamplePlan};
use crate::schema::{ColumnLayout, SchemaConfig};
use crate::table::Table;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

/// One input file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    /// Known number of data rows. Counted from the file when evenly-sampled
    /// mode needs it and it is missing.
    #[serde(default)]
    pub total_rows: Option<u64>,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            total_rows: None,
        }
    }

    #[must_use]
    pub fn with_total_rows(mut self, total: u64) -> Self {
        self.total_rows = Some(total);
        self
    }
}

fn default_parallel() -> bool {
    true
}

/// Everything one load needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    pub train: SourceConfig,
    pub test: SourceConfig,
    #[serde(default)]
    pub limit: RowLimit,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub flatten: FlattenOptions,
    /// Load train and test concurrently.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl LoadConfig {
    /// Data rows in the Google Analytics `train.csv`.
    pub const GA_TRAIN_ROWS: u64 = 903_653;
    /// Data rows in the Google Analytics `test.csv`.
    pub const GA_TEST_ROWS: u64 = 804_684;
    /// Row cap used for debug loads.
    pub const GA_DEBUG_ROWS: u64 = 1000;

    /// A full, unsampled load of `train` and `test` with an empty schema.
    pub fn new(train: SourceConfig, test: SourceConfig) -> Self {
        Self {
            train,
            test,
            limit: RowLimit::unlimited(),
            schema: SchemaConfig::default(),
            flatten: FlattenOptions::default(),
            parallel: true,
        }
    }

    /// The Google Analytics customer revenue dataset under `data_dir`.
    pub fn google_analytics(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            schema: SchemaConfig::google_analytics(),
            limit: RowLimit {
                max_rows: Self::GA_DEBUG_ROWS,
                ..RowLimit::unlimited()
            },
            ..Self::new(
                SourceConfig::new(dir.join("train.csv")).with_total_rows(Self::GA_TRAIN_ROWS),
                SourceConfig::new(dir.join("test.csv")).with_total_rows(Self::GA_TEST_ROWS),
            )
        }
    }

    /// Read a config from a JSON file.
    ///
    /// # Errors
    /// Fails if the file cannot be read or does not describe a `LoadConfig`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse load config {}", path.display()))
    }

    #[must_use]
    pub fn with_limit(mut self, limit: RowLimit) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: SchemaConfig) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn with_flatten(mut self, flatten: FlattenOptions) -> Self {
        self.flatten = flatten;
        self
    }

    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Every check that can run without touching the files.
    ///
    /// # Errors
    /// [`LoadError::InvalidConfiguration`].
    pub fn validate(&self) -> Result<(), LoadError> {
        self.limit.validate()?;
        self.schema.validate()
    }
}

/// What happened while loading one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    /// `train` or `test`.
    pub label: String,
    pub path: PathBuf,
    pub plan: SamplePlan,
    /// Data rows read from the file, kept or not.
    pub rows_scanned: u64,
    pub rows_kept: u64,
    /// Output column count per nested column.
    pub flattened: Vec<(String, usize)>,
}

/// One loaded file.
#[derive(Clone, Debug)]
pub struct LoadedFile {
    pub table: Table,
    pub report: FileReport,
}

/// Both loaded files.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub train: LoadedFile,
    pub test: LoadedFile,
}

impl Dataset {
    #[must_use]
    pub fn into_tables(self) -> (Table, Table) {
        (self.train.table, self.test.table)
    }
}

/// Runs loads described by a [`LoadConfig`].
#[derive(Clone, Debug)]
pub struct DatasetLoader {
    config: LoadConfig,
}

impl DatasetLoader {
    /// # Errors
    /// [`LoadError::InvalidConfiguration`] from [`LoadConfig::validate`].
    pub fn new(config: LoadConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Load train and test.
    ///
    /// # Errors
    /// The first failure of either file. A failing file never yields a
    /// partial table.
    pub fn load(&self) -> Result<Dataset> {
        let train = || self.load_file("train", &self.config.train);
        let test = || self.load_file("test", &self.config.test);
        let (train, test) = if self.config.parallel {
            rayon::join(train, test)
        } else {
            (train(), test())
        };
        Ok(Dataset {
            train: train?,
            test: test?,
        })
    }

    /// Resolve the sampling plan for `source`, counting its rows first if the
    /// plan needs a total the config does not give.
    ///
    /// # Errors
    /// Fails if the pre-scan cannot read the file.
    pub fn plan_for(&self, source: &SourceConfig) -> Result<SamplePlan> {
        let limit = &self.config.limit;
        let total = match source.total_rows {
            None if limit.needs_total() => {
                let n = count_rows(&source.path)?;
                debug!(file = %source.path.display(), rows = n, "pre-scanned row count");
                Some(n)
            }
            known => known,
        };
        Ok(limit.plan(total)?)
    }

    /// Load one file into a flattened table.
    ///
    /// # Errors
    /// I/O and CSV failures, [`LoadError::MissingColumn`],
    /// [`LoadError::TypeMismatch`] and [`LoadError::MalformedPayload`].
    pub fn load_file(&self, label: &str, source: &SourceConfig) -> Result<LoadedFile> {
        let span = info_span!("load_file", file = label);
        let _guard = span.enter();

        let path = &source.path;
        let plan = self.plan_for(source)?;
        info!(path = %path.display(), stride = %plan.stride, cap = ?plan.cap, "loading");

        let mut reader = RowReader::open(path)?;
        let layout = ColumnLayout::resolve(reader.headers(), &self.config.schema, path)?;
        let mut table = Table::new(layout.base_columns().to_vec());
        let mut nested: Vec<Vec<NestedRecord>> = vec![Vec::new(); layout.nested_columns().len()];

        let mut kept: u64 = 0;
        if !plan.is_full(kept) {
            for row in reader.by_ref() {
                let row = row?;
                if !plan.keeps(row.index) {
                    continue;
                }
                let values = layout
                    .coerce_row(&row)
                    .with_context(|| format!("load {}", path.display()))?;
                table.push_row(values)?;
                for (slot, raw) in layout.nested_fields(&row) {
                    let record = decode(&layout.nested_columns()[slot], raw).map_err(|e| {
                        LoadError::MalformedPayload {
                            file: path.clone(),
                            column: e.column,
                            row: row.index,
                            source: e.source,
                        }
                    })?;
                    nested[slot].push(record);
                }
                kept += 1;
                if plan.is_full(kept) {
                    break;
                }
            }
        }
        let rows_scanned = reader.rows_read();

        let mut flattened = Vec::with_capacity(nested.len());
        for (column, records) in layout.nested_columns().iter().zip(nested) {
            let set = flatten_with(column, &records, self.config.flatten.max_depth);
            debug!(column = %column, keys = set.num_columns(), "flattened nested column");
            let names = table.merge_flat(set, self.config.flatten.naming)?;
            flattened.push((column.clone(), names.len()));
        }

        info!(
            rows_scanned,
            rows_kept = kept,
            columns = table.num_columns(),
            "loaded"
        );
        Ok(LoadedFile {
            table,
            report: FileReport {
                label: label.to_owned(),
                path: path.clone(),
                plan,
                rows_scanned,
                rows_kept: kept,
                flattened,
            },
        })
    }
}

/// Load a Google Analytics style train/test pair.
///
/// * `limited == false`: every row of both files.
/// * `limited && !evenly_sampled`: the first `max_rows_if_limited` rows.
/// * `limited && evenly_sampled`: every `total / max_rows_if_limited`-th row,
///   the stride computed per file from its own total.
///
/// # Errors
/// [`LoadError::InvalidConfiguration`] for `evenly_sampled && !limited`,
/// before any file is opened. Otherwise see [`DatasetLoader::load_file`].
pub fn load(
    train_path: impl Into<PathBuf>,
    test_path: impl Into<PathBuf>,
    total_rows_train: u64,
    total_rows_test: u64,
    max_rows_if_limited: u64,
    limited: bool,
    evenly_sampled: bool,
) -> Result<(Table, Table)> {
    let config = LoadConfig::new(
        SourceConfig::new(train_path).with_total_rows(total_rows_train),
        SourceConfig::new(test_path).with_total_rows(total_rows_test),
    )
    .with_schema(SchemaConfig::google_analytics())
    .with_limit(RowLimit {
        limited,
        evenly_sampled,
        max_rows: max_rows_if_limited,
    });
    Ok(DatasetLoader::new(config)?.load()?.into_tables())
}
