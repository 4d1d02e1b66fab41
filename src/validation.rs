//! Row-count sanity checks.
//!
//! A load with known totals should always produce a predictable number of
//! rows: every row, the capped prefix, or `ceil(total / stride)` evenly
//! sampled rows. These helpers compute that number and compare it to what was
//! actually loaded.

use crate::error::LoadError;
use crate::loader::{Dataset, LoadConfig, LoadedFile, SourceConfig};
use crate::sampling::RowLimit;
use tracing::warn;

/// Rows a file of `total` rows yields under `limit`.
///
/// # Errors
/// [`LoadError::InvalidConfiguration`] if `limit` itself is invalid.
pub fn expected_rows(limit: &RowLimit, total: u64) -> Result<u64, LoadError> {
    Ok(limit.plan(Some(total))?.expected_rows(total))
}

/// # Errors
/// [`LoadError::RowCountMismatch`] naming `file` when the counts differ.
pub fn check_row_count(file: &str, expected: u64, actual: u64) -> Result<(), LoadError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LoadError::RowCountMismatch {
            file: file.to_owned(),
            expected,
            actual,
        })
    }
}

/// Check both tables of `dataset` against the totals in `config`.
///
/// Files without a configured total are skipped with a warning.
///
/// # Errors
/// The first [`LoadError::RowCountMismatch`], train before test.
pub fn verify_dataset(dataset: &Dataset, config: &LoadConfig) -> Result<(), LoadError> {
    verify_file(&dataset.train, &config.train, &config.limit)?;
    verify_file(&dataset.test, &config.test, &config.limit)
}

fn verify_file(loaded: &LoadedFile, source: &SourceConfig, limit: &RowLimit) -> Result<(), LoadError> {
    let label = &loaded.report.label;
    let Some(total) = source.total_rows else {
        warn!(file = %label, "no known total row count; skipping row count check");
        return Ok(());
    };
    let expected = expected_rows(limit, total)?;
    check_row_count(label, expected, loaded.table.num_rows() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_rows_per_mode() {
        assert_eq!(expected_rows(&RowLimit::unlimited(), 903_653).unwrap(), 903_653);
        assert_eq!(expected_rows(&RowLimit::prefix(1000), 903_653).unwrap(), 1000);
        assert_eq!(expected_rows(&RowLimit::prefix(1000), 12).unwrap(), 12);
        assert_eq!(expected_rows(&RowLimit::evenly(1000), 903_653).unwrap(), 1001);
        assert_eq!(expected_rows(&RowLimit::evenly(1000), 804_684).unwrap(), 1001);
    }

    #[test]
    fn mismatch_names_the_file() {
        assert!(check_row_count("train", 5, 5).is_ok());
        let err = check_row_count("test", 1000, 999).unwrap_err();
        assert_eq!(err.to_string(), "test: expected 1000 rows, found 999");
    }
}
