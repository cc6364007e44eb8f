//! On-disk cache of assembled lines.
//!
//! A cache entry is one [`AssembledLine`] serialized whole, living at a
//! canonical path derived from the archive's base name, the line, and the
//! channel label. This module only *reads* entries; producing them is the
//! downstream consumer's job. There is no staleness check of any kind: a
//! hit is trusted as-is, and invalidating entries after the source archive
//! changes is the caller's responsibility.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::AssembledLine;
use crate::extract::select::ChannelSpec;

/// File extension of cache entries.
pub const CACHE_EXTENSION: &str = "ird";

/// Canonical cache location for one (archive, line, channels) triple:
/// `<cache_dir>/<archive base name without extension>_line<line>_<label>.ird`.
///
/// # Example
/// ```rust
/// use std::path::Path;
/// use trace_sieve::extract::cache_path;
/// let p = cache_path(
///     Path::new("field/glacier24.tsv"),
///     3,
///     &1.into(),
///     Path::new("cache"),
/// );
/// assert_eq!(p, Path::new("cache/glacier24_line3_1.ird"));
/// ```
pub fn cache_path(
    store_path: &Path,
    line: u32,
    channels: &ChannelSpec,
    cache_dir: &Path,
) -> PathBuf {
    let base = store_path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("survey");
    cache_dir.join(format!(
        "{base}_line{line}_{}.{CACHE_EXTENSION}",
        channels.cache_label()
    ))
}

/// Load a previously assembled line from `path`, or report a cache miss.
///
/// Returns `None` (never a partial result) when the entry is absent,
/// unreadable, or fails to deserialize; each case logs a diagnostic and the
/// caller falls through to full re-assembly.
pub fn try_load(path: &Path) -> Option<AssembledLine> {
    if !path.is_file() {
        log::warn!("cache entry `{}` not available; assembling from archive", path.display());
        return None;
    }
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("cache entry `{}` unreadable ({err}); assembling from archive", path.display());
            return None;
        }
    };
    match bincode::deserialize(&bytes) {
        Ok(line) => {
            log::debug!("cache hit at `{}`", path.display());
            Some(line)
        }
        Err(err) => {
            log::warn!("cache entry `{}` undecodable ({err}); assembling from archive", path.display());
            None
        }
    }
}
