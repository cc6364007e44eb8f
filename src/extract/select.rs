//! Dataset selection: which leaves of a line participate in assembly.
//!
//! Selection is a filter pipeline over the line's descendants: derived
//! (`picked`) overlays are dropped first, then non-leaves, then leaves whose
//! parent data-capture segment is outside the requested channel set. What
//! survives is sorted numerically by location and windowed by the optional
//! index bounds.
//!
//! An empty selection is a *successful* outcome with a logged diagnostic,
//! distinguishable from the error cases (missing line, malformed leaf
//! path); callers decide how to proceed.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::store::path::{NodePath, segment_number};
use crate::store::tree::{PICKED_MARKER, TreeStore};
use crate::survey_error::SurveyError;

/// Requested data-capture channels: one channel or an explicit set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSpec {
    /// A single channel number.
    Single(u32),
    /// A set of channel numbers.
    Set(BTreeSet<u32>),
}

impl Default for ChannelSpec {
    fn default() -> Self {
        ChannelSpec::Single(0)
    }
}

impl From<u32> for ChannelSpec {
    fn from(channel: u32) -> Self {
        ChannelSpec::Single(channel)
    }
}

impl FromIterator<u32> for ChannelSpec {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        ChannelSpec::Set(iter.into_iter().collect())
    }
}

impl ChannelSpec {
    /// The requested channel numbers, ascending.
    pub fn channels(&self) -> Vec<u32> {
        match self {
            ChannelSpec::Single(channel) => vec![*channel],
            ChannelSpec::Set(set) => set.iter().copied().collect(),
        }
    }

    /// Normalized `datacapture_<n>` label strings, ascending.
    pub fn labels(&self) -> BTreeSet<String> {
        self.channels()
            .into_iter()
            .map(|channel| format!("datacapture_{channel}"))
            .collect()
    }

    /// Whether a `datacapture_<n>` path segment names a requested channel.
    pub fn matches(&self, segment: &str) -> bool {
        let Some(channel) = segment_number("datacapture", segment) else {
            return false;
        };
        match self {
            ChannelSpec::Single(single) => channel == *single,
            ChannelSpec::Set(set) => set.contains(&channel),
        }
    }

    /// Label used in cache file names: the channel number, or dash-joined
    /// numbers for a set.
    pub fn cache_label(&self) -> String {
        self.channels().iter().join("-")
    }
}

/// Index window applied to the location-sorted selection, half-open:
/// `[lower, upper)`. `None` on either side leaves that side unbounded.
///
/// An inverted pair (`lower > upper`) is the representable malformed case;
/// it is reported and ignored rather than aborting the extraction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// First index kept.
    pub lower: Option<usize>,
    /// First index excluded.
    pub upper: Option<usize>,
}

impl Bounds {
    /// No bounding.
    pub const UNBOUNDED: Bounds = Bounds {
        lower: None,
        upper: None,
    };

    /// Window `[lower, upper)`.
    pub fn new(lower: Option<usize>, upper: Option<usize>) -> Self {
        Bounds { lower, upper }
    }

    pub(crate) fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
            if lower > upper {
                log::warn!("ignoring inverted extraction bounds ({lower}, {upper})");
                return items;
            }
        }
        if let Some(upper) = self.upper {
            items.truncate(upper);
        }
        if let Some(lower) = self.lower {
            if lower >= items.len() {
                items.clear();
            } else {
                items.drain(..lower);
            }
        }
        items
    }
}

fn parent_segment(path: &str) -> Option<&str> {
    path.rsplit('/').nth(1)
}

/// Select the ordered raw-trace leaves of `line`.
///
/// # Errors
/// [`SurveyError::LineNotFound`] when the line group does not exist;
/// [`SurveyError::PathFormat`] when a surviving leaf path does not follow
/// the segment grammar (location order would be meaningless).
pub fn select_line_traces<S>(
    store: &S,
    line: u32,
    channels: &ChannelSpec,
    bounds: Bounds,
) -> Result<Vec<String>, SurveyError>
where
    S: TreeStore + ?Sized,
{
    let root = format!("line_{line}");
    if !store.is_group(&root) {
        return Err(SurveyError::LineNotFound(line));
    }

    let candidates: Vec<String> = store
        .descendants(&root)?
        .into_iter()
        .map(|rel| format!("{root}/{rel}"))
        .filter(|path| !path.split('/').any(|seg| seg.contains(PICKED_MARKER)))
        .filter(|path| store.is_leaf(path))
        .filter(|path| parent_segment(path).is_some_and(|seg| channels.matches(seg)))
        .collect();

    if candidates.is_empty() {
        log::warn!(
            "line {line}: no traces match channel(s) {}",
            channels.cache_label()
        );
        return Ok(Vec::new());
    }

    // Numeric location order: location_10 sorts after location_9. The sort
    // key comes from the parsed path, so a malformed survivor fails here
    // instead of silently landing somewhere in the sequence.
    let keyed: Vec<(u32, String)> = candidates
        .into_iter()
        .map(|path| NodePath::parse(&path).map(|parsed| (parsed.location, path)))
        .collect::<Result<_, _>>()?;
    let sorted: Vec<String> = keyed
        .into_iter()
        .sorted_by_key(|&(location, _)| location)
        .map(|(_, path)| path)
        .collect();

    Ok(bounds.apply(sorted))
}
