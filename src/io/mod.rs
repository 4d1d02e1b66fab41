//! File input: streaming CSV rows and transparent decompression.

pub mod compression;
pub mod csv;
