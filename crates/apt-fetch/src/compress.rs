//! Decompression dispatch by file extension (§4.5.1 step 2: "uncompress
//! with the appropriate tool if the extension names one of {xz, lzma,
//! bz2, gz}").

use crate::error::{Error, Result};
use std::io::Read;
use std::path::Path;

/// Compression kinds the metadata updater recognises, ordered to match
/// `WorkerConfig::compression_priority`'s default keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// `.xz`.
    Xz,
    /// `.lzma`.
    Lzma,
    /// `.bz2`.
    Bz2,
    /// `.gz`.
    Gz,
    /// No compression (raw index, or the empty-extension variant).
    None,
}

impl Compression {
    /// Infer the compression from a path's extension.
    #[must_use]
    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("xz") => Self::Xz,
            Some("lzma") => Self::Lzma,
            Some("bz2") => Self::Bz2,
            Some("gz") => Self::Gz,
            _ => Self::None,
        }
    }

    /// The config key this compression is looked up under in
    /// `WorkerConfig::compression_priority`.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Xz => "xz",
            Self::Lzma => "lzma",
            Self::Bz2 => "bz2",
            Self::Gz => "gz",
            Self::None => "",
        }
    }
}

/// Decompress `data` per `compression`, returning the raw index bytes.
///
/// # Errors
/// Returns [`Error::Decompress`] if the underlying tool fails.
pub fn decompress(compression: Compression, data: &[u8], path: &Path) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let result = match compression {
        Compression::None => {
            out.extend_from_slice(data);
            Ok(())
        }
        Compression::Gz => flate2::read::GzDecoder::new(data).read_to_end(&mut out).map(|_| ()),
        Compression::Xz | Compression::Lzma => xz2::read::XzDecoder::new(data).read_to_end(&mut out).map(|_| ()),
        Compression::Bz2 => bzip2::read::BzDecoder::new(data).read_to_end(&mut out).map(|_| ()),
    };
    result.map_err(|e| Error::Decompress { path: path.to_path_buf(), message: e.to_string() })?;
    Ok(out)
}
