//! `Fid`: a fixed-width trace identifier derived from a hierarchical path.
//!
//! Traces are joined against their metadata records by identifier, so the
//! codec must be injective over everything an archive can hold: four
//! zero-padded 4-digit fields (line, location, datacapture, echogram)
//! concatenated into exactly 16 ASCII digits. A field that does not fit in
//! its width is a hard [`SurveyError::FidFieldOverflow`]; truncating would
//! silently alias two different traces, which corrupts every downstream
//! join.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::path::NodePath;
use crate::survey_error::SurveyError;

/// Digits per identifier field.
pub const FID_FIELD_WIDTH: usize = 4;
/// Total identifier width: four fields of [`FID_FIELD_WIDTH`] digits.
pub const FID_WIDTH: usize = 4 * FID_FIELD_WIDTH;

/// Largest value representable in one field.
const FIELD_LIMIT: u32 = 10_000;

/// Fixed-width identifier for one trace.
///
/// Ordering and hashing follow the (line, location, datacapture, echogram)
/// tuple, which coincides with lexicographic order of the rendered digits.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Fid {
    line: u16,
    location: u16,
    datacapture: u16,
    echogram: u16,
}

impl Fid {
    /// Build an identifier from its four fields.
    ///
    /// # Errors
    /// Returns [`SurveyError::FidFieldOverflow`] if any field is ≥ 10000.
    ///
    /// # Example
    /// ```rust
    /// use trace_sieve::store::fid::Fid;
    /// let fid = Fid::new(1, 12, 0, 0)?;
    /// assert_eq!(fid.to_string(), "0001001200000000");
    /// # Ok::<(), trace_sieve::survey_error::SurveyError>(())
    /// ```
    pub fn new(line: u32, location: u32, datacapture: u32, echogram: u32) -> Result<Self, SurveyError> {
        let narrow = |field: &'static str, value: u32| -> Result<u16, SurveyError> {
            if value >= FIELD_LIMIT {
                return Err(SurveyError::FidFieldOverflow {
                    field,
                    value,
                    width: FID_FIELD_WIDTH,
                });
            }
            Ok(value as u16)
        };
        Ok(Fid {
            line: narrow("line", line)?,
            location: narrow("location", location)?,
            datacapture: narrow("datacapture", datacapture)?,
            echogram: narrow("echogram", echogram)?,
        })
    }

    /// Derive an identifier from an archive path.
    ///
    /// With `linloc_only` the path only needs to resolve to line/location
    /// granularity and the datacapture/echogram fields are forced to zero;
    /// this is the form used for retention bookkeeping. Otherwise the path
    /// must carry all four segments, each field taken from its own segment.
    ///
    /// # Errors
    /// [`SurveyError::PathFormat`] for grammar violations or (without
    /// `linloc_only`) a path lacking the deep segments;
    /// [`SurveyError::FidFieldOverflow`] when a segment index is too wide.
    pub fn from_path(path: &str, linloc_only: bool) -> Result<Self, SurveyError> {
        let parsed = NodePath::parse(path)?;
        let (datacapture, echogram) = if linloc_only {
            (0, 0)
        } else {
            match (parsed.datacapture, parsed.echogram) {
                (Some(dc), Some(eg)) => (dc, eg),
                _ => {
                    return Err(SurveyError::PathFormat {
                        path: path.to_string(),
                        reason: "datacapture and echogram segments are required for a full identifier"
                            .to_string(),
                    });
                }
            }
        };
        Fid::new(parsed.line, parsed.location, datacapture, echogram)
    }

    /// Line field.
    #[inline]
    pub const fn line(self) -> u32 {
        self.line as u32
    }

    /// Location field.
    #[inline]
    pub const fn location(self) -> u32 {
        self.location as u32
    }

    /// Data-capture (channel) field.
    #[inline]
    pub const fn datacapture(self) -> u32 {
        self.datacapture as u32
    }

    /// Echogram field.
    #[inline]
    pub const fn echogram(self) -> u32 {
        self.echogram as u32
    }
}

/// Renders the canonical 16-digit form used as a database join key.
impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:04}{:04}{:04}",
            self.line, self.location, self.datacapture, self.echogram
        )
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fid").field(&self.to_string()).finish()
    }
}
