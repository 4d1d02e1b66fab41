//! # Row sampling
//!
//! Deterministic stride sampling over 0-based data row indices. A row at index
//! `i` is kept iff `i % stride == 0`, so a stride of 1 keeps everything.
//!
//! The sampling *mode* comes from a [`RowLimit`], which mirrors the three ways a
//! load can be configured:
//!
//! | `limited` | `evenly_sampled` | result |
//! |-----------|------------------|--------|
//! | `false`   | `false`          | every row |
//! | `true`    | `false`          | the first `max_rows` rows |
//! | `true`    | `true`           | every `total / max_rows`-th row |
//! | `false`   | `true`           | [`LoadError::InvalidConfiguration`] |
//!
//! Each file resolves its own [`SamplePlan`] from its own total row count.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the row at `index` survives sampling with `stride`.
#[inline]
#[must_use]
pub fn should_keep(index: u64, stride: SampleStride) -> bool {
    index % stride.get() == 0
}

/// A positive sampling step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SampleStride(u64);

impl SampleStride {
    /// Keep every row.
    pub const ALL: Self = Self(1);

    /// Build a stride, rejecting zero.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidConfiguration`] when `step == 0`.
    pub fn new(step: u64) -> Result<Self, LoadError> {
        if step == 0 {
            return Err(LoadError::config("sample stride must be positive"));
        }
        Ok(Self(step))
    }

    /// Stride that spreads roughly `target` rows evenly over `total` rows.
    ///
    /// Integer division; clamps to 1 when `total < target`.
    #[must_use]
    pub fn spread(total: u64, target: u64) -> Self {
        Self((total / target.max(1)).max(1))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Number of rows kept out of `total` with this stride.
    #[must_use]
    pub fn kept_out_of(self, total: u64) -> u64 {
        total.div_ceil(self.0)
    }
}

impl Default for SampleStride {
    fn default() -> Self {
        Self::ALL
    }
}

impl TryFrom<u64> for SampleStride {
    type Error = LoadError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SampleStride> for u64 {
    fn from(value: SampleStride) -> Self {
        value.0
    }
}

impl fmt::Display for SampleStride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user-facing row limit switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowLimit {
    /// Cap the number of rows read from each file.
    pub limited: bool,
    /// Spread the cap evenly over the file instead of taking a prefix.
    pub evenly_sampled: bool,
    /// The cap. Ignored when `limited` is false.
    pub max_rows: u64,
}

impl Default for RowLimit {
    fn default() -> Self {
        Self {
            limited: false,
            evenly_sampled: false,
            max_rows: 1000,
        }
    }
}

impl RowLimit {
    /// Read every row.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            limited: false,
            ..Self::default()
        }
    }

    /// Read the first `max_rows` rows.
    #[must_use]
    pub fn prefix(max_rows: u64) -> Self {
        Self {
            limited: true,
            evenly_sampled: false,
            max_rows,
        }
    }

    /// Read roughly `max_rows` rows spread evenly over the file.
    #[must_use]
    pub fn evenly(max_rows: u64) -> Self {
        Self {
            limited: true,
            evenly_sampled: true,
            max_rows,
        }
    }

    /// Check the switches without touching any file.
    ///
    /// # Errors
    /// [`LoadError::InvalidConfiguration`] if evenly-sampled mode is requested
    /// without a cap, or if the cap is zero.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.evenly_sampled && !self.limited {
            return Err(LoadError::config(
                "evenly-sampled mode requires a row limit",
            ));
        }
        if self.limited && self.max_rows == 0 {
            return Err(LoadError::config("row limit must be positive"));
        }
        Ok(())
    }

    /// Whether resolving a plan needs the file's total row count.
    #[must_use]
    pub fn needs_total(&self) -> bool {
        self.limited && self.evenly_sampled
    }

    /// Resolve the plan for one file.
    ///
    /// `total_rows` is only consulted in evenly-sampled mode, where it must be
    /// present.
    ///
    /// # Errors
    /// See [`RowLimit::validate`]; also fails if evenly-sampled mode is asked
    /// to plan without a total.
    pub fn plan(&self, total_rows: Option<u64>) -> Result<SamplePlan, LoadError> {
        self.validate()?;
        let plan = match (self.limited, self.evenly_sampled) {
            (false, _) => SamplePlan::default(),
            (true, false) => SamplePlan {
                stride: SampleStride::ALL,
                cap: Some(self.max_rows),
            },
            (true, true) => {
                let total = total_rows.ok_or_else(|| {
                    LoadError::config("evenly-sampled mode needs the file's total row count")
                })?;
                SamplePlan {
                    stride: SampleStride::spread(total, self.max_rows),
                    cap: None,
                }
            }
        };
        Ok(plan)
    }
}

/// Resolved sampling for one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePlan {
    pub stride: SampleStride,
    /// Stop after this many kept rows.
    pub cap: Option<u64>,
}

impl SamplePlan {
    /// Whether the row at `index` is kept. Does not consider the cap.
    #[inline]
    #[must_use]
    pub fn keeps(&self, index: u64) -> bool {
        should_keep(index, self.stride)
    }

    /// Whether `kept` rows already satisfy the cap.
    #[inline]
    #[must_use]
    pub fn is_full(&self, kept: u64) -> bool {
        self.cap.is_some_and(|cap| kept >= cap)
    }

    /// Rows this plan keeps out of a file of `total` rows.
    #[must_use]
    pub fn expected_rows(&self, total: u64) -> u64 {
        let kept = self.stride.kept_out_of(total);
        match self.cap {
            Some(cap) => kept.min(cap),
            None => kept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_one_keeps_everything() {
        for i in 0..100 {
            assert!(should_keep(i, SampleStride::ALL));
        }
    }

    #[test]
    fn keep_matches_modulo() {
        for s in 1..20u64 {
            let stride = SampleStride::new(s).unwrap();
            for i in 0..200u64 {
                assert_eq!(should_keep(i, stride), i % s == 0);
            }
        }
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert!(matches!(
            SampleStride::new(0),
            Err(LoadError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn spread_clamps_small_files() {
        assert_eq!(SampleStride::spread(10, 1000).get(), 1);
        assert_eq!(SampleStride::spread(903_653, 1000).get(), 903);
        assert_eq!(SampleStride::spread(804_684, 1000).get(), 804);
    }

    #[test]
    fn plans_per_mode() {
        assert_eq!(RowLimit::unlimited().plan(None).unwrap(), SamplePlan::default());

        let prefix = RowLimit::prefix(1000).plan(None).unwrap();
        assert_eq!(prefix.stride, SampleStride::ALL);
        assert_eq!(prefix.cap, Some(1000));
        assert_eq!(prefix.expected_rows(903_653), 1000);
        assert_eq!(prefix.expected_rows(10), 10);

        let even = RowLimit::evenly(1000).plan(Some(903_653)).unwrap();
        assert_eq!(even.stride.get(), 903);
        assert_eq!(even.cap, None);
        assert_eq!(even.expected_rows(903_653), 903_653u64.div_ceil(903));
    }

    #[test]
    fn evenly_without_limit_is_invalid() {
        let limit = RowLimit {
            limited: false,
            evenly_sampled: true,
            max_rows: 1000,
        };
        assert!(matches!(
            limit.plan(Some(10)),
            Err(LoadError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn evenly_needs_a_total() {
        assert!(RowLimit::evenly(10).needs_total());
        assert!(RowLimit::evenly(10).plan(None).is_err());
    }

    #[test]
    fn cap_tracking() {
        let plan = RowLimit::prefix(3).plan(None).unwrap();
        assert!(!plan.is_full(2));
        assert!(plan.is_full(3));
        assert!(!SamplePlan::default().is_full(u64::MAX));
    }
}
