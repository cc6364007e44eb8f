//! `Survey`: the handle over one survey archive.
//!
//! A survey owns the archive *path*, never an open handle: every operation
//! opens the store, performs one logical unit of work, and releases the
//! handle before returning, on success and failure alike. The repeated
//! open/close costs more than holding a handle would, and that is the
//! deliberate trade: each public operation's resource footprint is
//! self-contained.
//!
//! ```no_run
//! use trace_sieve::survey::{ExtractOptions, Survey};
//!
//! # fn main() -> Result<(), trace_sieve::survey_error::SurveyError> {
//! let survey = Survey::open("glacier24.tsv")?;
//! let gather = survey.extract_line(0, &ExtractOptions::default())?;
//! println!("{} traces x {} samples", gather.num_traces(), gather.num_samples());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use crate::extract::select::{Bounds, ChannelSpec};
use crate::extract::{AssembledLine, assemble, cache, select_line_traces};
use crate::record::{NameValParser, RecordParser, RecordSet, TraceRecord};
use crate::retain::{RetentionMap, write_filtered};
use crate::store::archive::FileArchive;
use crate::store::fid::Fid;
use crate::store::path::{NodePath, segment_number};
use crate::store::tree::TreeStore;
use crate::survey_error::SurveyError;

/// Options for [`Survey::extract_line`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractOptions {
    /// Data-capture channels to extract.
    pub channels: ChannelSpec,
    /// Index window over the location-sorted selection.
    pub bounds: Bounds,
    /// Probe the cache first. A hit is trusted as-is; there is no
    /// staleness check, so invalidate entries yourself when the archive
    /// changes.
    pub from_cache: bool,
    /// Directory holding cache entries.
    pub cache_dir: PathBuf,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            channels: ChannelSpec::default(),
            bounds: Bounds::UNBOUNDED,
            from_cache: false,
            cache_dir: PathBuf::from("cache"),
        }
    }
}

/// Handle over one survey archive plus its retention flags.
#[derive(Debug)]
pub struct Survey {
    store_path: PathBuf,
    retention: RetentionMap,
}

impl Survey {
    /// Open a survey over the archive at `store_path`.
    ///
    /// The archive is opened transiently to observe every line/location
    /// pair (each defaulting to retained), then released.
    ///
    /// # Errors
    /// [`SurveyError::StoreNotFound`] and the other open failures.
    pub fn open(store_path: impl AsRef<Path>) -> Result<Self, SurveyError> {
        let store_path = store_path.as_ref().to_path_buf();
        let retention = {
            let archive = FileArchive::open(&store_path)?;
            RetentionMap::from_store(&archive)?
        };
        Ok(Survey {
            store_path,
            retention,
        })
    }

    /// Path of the backing archive.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Retention flags.
    pub fn retention(&self) -> &RetentionMap {
        &self.retention
    }

    /// Mutable retention flags, for marking bad locations.
    pub fn retention_mut(&mut self) -> &mut RetentionMap {
        &mut self.retention
    }

    /// Open the archive, run one operation against it, and release the
    /// handle on every exit path.
    fn with_store<T>(
        &self,
        op: impl FnOnce(&FileArchive) -> Result<T, SurveyError>,
    ) -> Result<T, SurveyError> {
        let archive = FileArchive::open(&self.store_path)?;
        op(&archive)
    }

    /// Line group names, sorted by line number (not lexicographically).
    pub fn lines(&self) -> Result<Vec<String>, SurveyError> {
        self.with_store(|store| {
            let mut lines: Vec<(u32, String)> = store
                .children("")?
                .into_iter()
                .filter(|name| store.is_group(name))
                .filter_map(|name| segment_number("line", &name).map(|n| (n, name)))
                .collect();
            lines.sort_by_key(|&(n, _)| n);
            Ok(lines.into_iter().map(|(_, name)| name).collect())
        })
    }

    /// Number of data-capture channels in `line`. Channel counts can vary
    /// between locations; the maximum is returned.
    ///
    /// # Errors
    /// [`SurveyError::LineNotFound`] for an absent line.
    pub fn channels_in_line(&self, line: u32) -> Result<usize, SurveyError> {
        self.with_store(|store| {
            let root = format!("line_{line}");
            if !store.is_group(&root) {
                return Err(SurveyError::LineNotFound(line));
            }
            let mut max = 0;
            for child in store.children(&root)? {
                if segment_number("location", &child).is_none() {
                    continue;
                }
                let location = format!("{root}/{child}");
                if !store.is_group(&location) {
                    continue;
                }
                let count = store
                    .children(&location)?
                    .iter()
                    .filter(|name| segment_number("datacapture", name).is_some())
                    .count();
                max = max.max(count);
            }
            Ok(max)
        })
    }

    /// The sample vector of one trace.
    pub fn extract_trace(
        &self,
        line: u32,
        location: u32,
        datacapture: u32,
        echogram: u32,
    ) -> Result<Vec<f64>, SurveyError> {
        let path = NodePath::full(line, location, datacapture, echogram).to_string();
        self.with_store(|store| store.samples(&path))
    }

    /// Canonical cache entry location for `line` under `options`.
    pub fn cache_path(&self, line: u32, options: &ExtractOptions) -> PathBuf {
        cache::cache_path(&self.store_path, line, &options.channels, &options.cache_dir)
    }

    /// Extract every selected trace on `line` into an [`AssembledLine`],
    /// parsing annotations with the bundled [`NameValParser`].
    pub fn extract_line(
        &self,
        line: u32,
        options: &ExtractOptions,
    ) -> Result<AssembledLine, SurveyError> {
        self.extract_line_with_parser(line, options, &NameValParser)
    }

    /// [`extract_line`](Self::extract_line) with a caller-supplied record
    /// parser.
    ///
    /// With `from_cache`, the cache is probed first and a hit is returned
    /// directly; a miss logs a diagnostic and falls through to full
    /// assembly. One trace's annotation failing to parse crops that record
    /// (logged) and the extraction continues; everything else propagates.
    ///
    /// # Errors
    /// [`SurveyError::LineNotFound`], [`SurveyError::DegenerateLine`],
    /// [`SurveyError::PathFormat`] (identifier integrity), and store
    /// failures.
    pub fn extract_line_with_parser(
        &self,
        line: u32,
        options: &ExtractOptions,
        parser: &dyn RecordParser,
    ) -> Result<AssembledLine, SurveyError> {
        if options.from_cache {
            let entry = self.cache_path(line, options);
            if let Some(hit) = cache::try_load(&entry) {
                return Ok(hit);
            }
        }

        self.with_store(|store| {
            let paths = select_line_traces(store, line, &options.channels, options.bounds)?;
            let (matrix, sample_counts) = assemble(store, line, &paths)?;

            let mut records = RecordSet::default();
            for path in &paths {
                let fid = Fid::from_path(path, false)?;
                match store.annotation(path)? {
                    None => records.push(TraceRecord::empty(fid)),
                    Some(annotation) => match parser.parse(fid, annotation) {
                        Ok(record) => records.push(record),
                        Err(err) => log::warn!("cropping metadata record for trace {fid}: {err}"),
                    },
                }
            }

            Ok(AssembledLine {
                matrix,
                store_path: self.store_path.clone(),
                line,
                channels: options.channels.clone(),
                sample_counts,
                records,
                retain: self.retention.line_view(line),
            })
        })
    }

    /// Write a copy of the archive to `dest` containing only retained
    /// locations. See [`crate::retain::write_filtered`].
    pub fn write_filtered(
        &self,
        dest: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<(), SurveyError> {
        let dest = dest.as_ref();
        self.with_store(|store| write_filtered(store, dest, &self.retention, overwrite))
    }
}
