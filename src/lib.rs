//! # flatbeam
//!
//! A **dataset loader** for tabular files whose rows mix flat scalar fields with
//! columns of serialized JSON objects. It reads a train/test pair of CSV files,
//! optionally subsamples them deterministically, decodes the JSON columns and
//! flattens them into ordinary columns, producing one rectangular in-memory
//! table per file.
//!
//! ## Key Features
//!
//! - **Deterministic sampling** - full loads, capped prefixes, or an even stride
//!   computed per file from its own row count
//! - **Explicit column schema** - identifier columns stay opaque text, so long
//!   digit strings never turn into lossy floats
//! - **Heterogeneous JSON** - the key union of every nested column is computed
//!   over the whole file; rows missing a key get `null`
//! - **Alignment-preserving merge** - flattened columns attach to the base rows
//!   by position, never by a join
//! - **Compressed inputs** - gzip, zstd, bzip2 and xz via feature flags
//!
//! ## Quick Start
//!
//! ```no_run
//! use flatbeam::*;
//! # fn main() -> anyhow::Result<()> {
//!
//! // The Google Analytics customer revenue files, first 1000 rows of each
//! let config = LoadConfig::google_analytics("./data").with_limit(RowLimit::prefix(1000));
//! let dataset = DatasetLoader::new(config)?.load()?;
//!
//! let train = &dataset.train.table;
//! println!("{} rows x {} columns", train.num_rows(), train.num_columns());
//! println!("{:?}", train.get(0, "browser"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Sampling Modes
//!
//! | [`RowLimit`] | rows per file |
//! |---|---|
//! | [`RowLimit::unlimited`] | all |
//! | [`RowLimit::prefix(n)`](RowLimit::prefix) | the first `n` |
//! | [`RowLimit::evenly(n)`](RowLimit::evenly) | every `total / n`-th, about `n` |
//!
//! Asking for even sampling without a limit is rejected with
//! [`LoadError::InvalidConfiguration`] before any file is opened.
//!
//! ## Errors
//!
//! Functions return [`anyhow::Result`]. Classified failures are [`LoadError`]
//! values inside the error and can be recovered with [`classify`] or
//! `downcast_ref`.
//!
//! ## Module Overview
//!
//! - [`sampling`] - stride sampling and row limits
//! - [`schema`] - column types and field coercion
//! - [`decode`] - JSON decoding of nested columns
//! - [`flatten`] - key union and row-aligned flattening
//! - [`table`] - the in-memory table
//! - [`loader`] - the per-file pipeline and train/test orchestration
//! - [`validation`] - row-count sanity checks
//! - [`io`] - CSV streaming and decompression
//! - [`testing`] - fixture builders for tests

pub mod decode;
pub mod error;
pub mod flatten;
pub mod io;
pub mod loader;
pub mod sampling;
pub mod schema;
pub mod table;
pub mod testing;
pub mod validation;

pub use decode::{DecodeError, NestedRecord, decode};
pub use error::{LoadError, classify};
pub use flatten::{ColumnNaming, FlatColumn, FlatColumnSet, FlattenOptions, flatten, flatten_with};
pub use io::csv::{RawRow, RowReader, count_rows};
pub use loader::{Dataset, DatasetLoader, FileReport, LoadConfig, LoadedFile, SourceConfig, load};
pub use sampling::{RowLimit, SamplePlan, SampleStride, should_keep};
pub use schema::{ColumnLayout, ColumnType, SchemaConfig, coerce_field};
pub use table::{Row, Table};
pub use validation::{check_row_count, expected_rows, verify_dataset};
