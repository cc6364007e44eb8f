//! Retention flags and the filtered-rewrite engine.
//!
//! Analysis marks bad locations by clearing their retention flag; the
//! rewrite engine then emits a new archive containing only the retained
//! location subtrees. The map is keyed by an explicit `(line, location)`
//! pair with entries created only for pairs observed when the survey was
//! opened; querying an unobserved pair answers "not retained".

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::store::archive::FileArchive;
use crate::store::path::segment_number;
use crate::store::tree::{TreeStore, TreeStoreMut, copy_subtree};
use crate::survey_error::SurveyError;

/// Per-location retention flags for a whole survey.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionMap {
    flags: BTreeMap<(u32, u32), bool>,
}

impl RetentionMap {
    /// Observe every `line_<n>/location_<n>` pair in the store, defaulting
    /// each to retained.
    ///
    /// Top-level nodes that are not line groups, and children that are not
    /// location groups, are skipped without comment; the map covers exactly
    /// what the schema defines.
    pub fn from_store<S>(store: &S) -> Result<Self, SurveyError>
    where
        S: TreeStore + ?Sized,
    {
        let mut flags = BTreeMap::new();
        for name in store.children("")? {
            let Some(line) = segment_number("line", &name) else {
                continue;
            };
            if !store.is_group(&name) {
                continue;
            }
            for child in store.children(&name)? {
                if let Some(location) = segment_number("location", &child) {
                    flags.insert((line, location), true);
                }
            }
        }
        Ok(RetentionMap { flags })
    }

    /// Whether `(line, location)` is retained. Unobserved pairs are not.
    pub fn is_retained(&self, line: u32, location: u32) -> bool {
        self.flags.get(&(line, location)).copied().unwrap_or(false)
    }

    /// Update the flag for an observed pair. Returns `false` (and inserts
    /// nothing) if the pair was never observed; the map only ever covers
    /// what the store held at construction time.
    pub fn set(&mut self, line: u32, location: u32, retained: bool) -> bool {
        match self.flags.get_mut(&(line, location)) {
            Some(flag) => {
                *flag = retained;
                true
            }
            None => false,
        }
    }

    /// Location → flag snapshot for one line.
    pub fn line_view(&self, line: u32) -> BTreeMap<u32, bool> {
        self.flags
            .range((line, 0)..=(line, u32::MAX))
            .map(|(&(_, location), &flag)| (location, flag))
            .collect()
    }

    /// Line numbers with at least one observed location, ascending.
    pub fn lines(&self) -> Vec<u32> {
        let mut lines: Vec<u32> = self.flags.keys().map(|&(line, _)| line).collect();
        lines.dedup();
        lines
    }

    /// Number of observed `(line, location)` pairs.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no pair was observed.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// All observed pairs with their flags, ascending.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), bool)> + '_ {
        self.flags.iter().map(|(&pair, &flag)| (pair, flag))
    }
}

/// Write a filtered copy of `store` to `dest`: every line group is
/// recreated, and under it only the retained location subtrees are copied
/// (verbatim, annotations included). Store-level attributes beyond what
/// subtree copy carries are not preserved.
///
/// # Errors
/// [`SurveyError::DestinationExists`] before any write when `dest` exists
/// and `overwrite` is not set; [`SurveyError::StructuralConflict`] if a
/// line group collides inside the freshly created destination (cannot
/// happen without an integrity bug, hence loud); otherwise store and
/// filesystem failures.
pub fn write_filtered<S>(
    store: &S,
    dest: &Path,
    retention: &RetentionMap,
    overwrite: bool,
) -> Result<(), SurveyError>
where
    S: TreeStore + ?Sized,
{
    if dest.exists() && !overwrite {
        return Err(SurveyError::DestinationExists(dest.to_path_buf()));
    }

    let mut out = FileArchive::create(dest);
    for name in store.children("")? {
        let Some(line) = segment_number("line", &name) else {
            continue;
        };
        if !store.is_group(&name) {
            continue;
        }
        match out.create_group(&name) {
            Err(SurveyError::NodeExists(_)) => {
                return Err(SurveyError::StructuralConflict(name));
            }
            other => other?,
        }
        log::info!("rewriting {name}");
        for child in store.children(&name)? {
            let Some(location) = segment_number("location", &child) else {
                continue;
            };
            if retention.is_retained(line, location) {
                let subtree = format!("{name}/{child}");
                copy_subtree(store, &subtree, &mut out, &subtree)?;
            }
        }
    }
    out.close()
}
