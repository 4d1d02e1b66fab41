//! Transparent decompression of input files.
//!
//! Source files are often shipped compressed. [`open_reader`] picks a codec
//! from the file extension first and falls back to sniffing magic bytes, so a
//! `train.csv.gz` and a renamed gzip stream both load the same way.
//!
//! Built-in codecs are enabled by cargo features:
//! - **Gzip** (`.gz`) - `compression-gzip`
//! - **Zstd** (`.zst`) - `compression-zstd`
//! - **Bzip2** (`.bz2`) - `compression-bzip2`
//! - **Xz** (`.xz`) - `compression-xz`

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Compression formats the loader can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

impl Codec {
    const ALL: [Codec; 4] = [Codec::Gzip, Codec::Zstd, Codec::Bzip2, Codec::Xz];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Zstd => "zstd",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            Codec::Gzip => &[".gz", ".gzip"],
            Codec::Zstd => &[".zst", ".zstd"],
            Codec::Bzip2 => &[".bz2", ".bzip2"],
            Codec::Xz => &[".xz"],
        }
    }

    fn magic(self) -> &'static [u8] {
        match self {
            Codec::Gzip => &[0x1f, 0x8b],
            Codec::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
            Codec::Bzip2 => b"BZh",
            Codec::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    /// Codec implied by the file name, case-insensitive.
    #[must_use]
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Codec> {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.extensions().iter().any(|ext| name.ends_with(ext)))
    }

    /// Codec whose signature starts `head`.
    #[must_use]
    pub fn from_magic(head: &[u8]) -> Option<Codec> {
        Self::ALL.into_iter().find(|c| head.starts_with(c.magic()))
    }

    fn wrap(self, reader: Box<dyn Read + Send>) -> Result<Box<dyn Read + Send>> {
        match self {
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
            #[cfg(feature = "compression-zstd")]
            Codec::Zstd => Ok(Box::new(zstd::stream::read::Decoder::new(reader)?)),
            #[cfg(feature = "compression-bzip2")]
            Codec::Bzip2 => Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader))),
            #[cfg(feature = "compression-xz")]
            Codec::Xz => Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader))),
            #[allow(unreachable_patterns)]
            other => anyhow::bail!(
                "{} input requires the compression-{} feature",
                other.name(),
                other.name()
            ),
        }
    }
}

/// Open `path` for reading, decompressing on the fly when needed.
///
/// # Errors
/// Fails if the file cannot be opened, or if it is compressed with a codec
/// that was not compiled in.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut buffered = BufReader::new(file);

    let codec = match Codec::from_extension(path) {
        Some(codec) => Some(codec),
        None => {
            let head = buffered
                .fill_buf()
                .with_context(|| format!("read {}", path.display()))?;
            Codec::from_magic(head)
        }
    };

    match codec {
        Some(codec) => codec
            .wrap(Box::new(buffered))
            .with_context(|| format!("set up {} decompression for {}", codec.name(), path.display())),
        None => Ok(Box::new(buffered)),
    }
}
