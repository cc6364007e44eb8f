//! Typed hierarchical paths for survey archives.
//!
//! Archive nodes live on slash-delimited paths of the form
//! `line_<n>/location_<n>/datacapture_<n>/echogram_<n>`, where each segment
//! prefix is followed by a non-negative integer with no separators inside
//! the numeric part. Not every path carries all four levels: retention
//! bookkeeping only resolves to line/location granularity.
//!
//! [`NodePath`] is the parsed form. Parsing goes through a single anchored
//! regular expression rather than ad-hoc string splitting, so a malformed
//! path is rejected with a [`SurveyError::PathFormat`] naming the reason
//! instead of panicking on a bad index.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::survey_error::SurveyError;

/// Anchored grammar for survey paths. Levels nest strictly: an echogram
/// segment can only appear under a datacapture segment.
static PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/?line_(\d+)/location_(\d+)(?:/datacapture_(\d+)(?:/echogram_(\d+))?)?/?$")
        .expect("path grammar must compile")
});

/// A parsed hierarchical path.
///
/// `line` and `location` are always present; `datacapture` and `echogram`
/// are present only when the path descends that far. The two deep fields are
/// each derived from their own segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    /// Line (transect) number.
    pub line: u32,
    /// Location number along the line.
    pub location: u32,
    /// Data-capture (channel) number, when the path descends to one.
    pub datacapture: Option<u32>,
    /// Echogram number, when the path descends to one.
    pub echogram: Option<u32>,
}

impl NodePath {
    /// Path resolving to line/location granularity only.
    pub fn line_location(line: u32, location: u32) -> Self {
        NodePath {
            line,
            location,
            datacapture: None,
            echogram: None,
        }
    }

    /// Fully-resolved path down to one echogram leaf.
    pub fn full(line: u32, location: u32, datacapture: u32, echogram: u32) -> Self {
        NodePath {
            line,
            location,
            datacapture: Some(datacapture),
            echogram: Some(echogram),
        }
    }

    /// Parse a slash-delimited archive path.
    ///
    /// # Errors
    /// Returns [`SurveyError::PathFormat`] when the path does not match the
    /// segment grammar or a numeric suffix does not fit in `u32`.
    ///
    /// # Example
    /// ```rust
    /// use trace_sieve::store::path::NodePath;
    /// let p = NodePath::parse("line_1/location_12/datacapture_0/echogram_0")?;
    /// assert_eq!(p.line, 1);
    /// assert_eq!(p.location, 12);
    /// assert_eq!(p.datacapture, Some(0));
    /// # Ok::<(), trace_sieve::survey_error::SurveyError>(())
    /// ```
    pub fn parse(path: &str) -> Result<Self, SurveyError> {
        let caps = PATH_RE.captures(path).ok_or_else(|| SurveyError::PathFormat {
            path: path.to_string(),
            reason: "expected line_<n>/location_<n>[/datacapture_<n>[/echogram_<n>]]".to_string(),
        })?;
        let field = |idx: usize, name: &str| -> Result<Option<u32>, SurveyError> {
            match caps.get(idx) {
                None => Ok(None),
                Some(m) => m.as_str().parse::<u32>().map(Some).map_err(|_| {
                    SurveyError::PathFormat {
                        path: path.to_string(),
                        reason: format!("{name} index `{}` does not fit in u32", m.as_str()),
                    }
                }),
            }
        };
        let line = field(1, "line")?.expect("anchored grammar guarantees a line capture");
        let location = field(2, "location")?.expect("anchored grammar guarantees a location capture");
        Ok(NodePath {
            line,
            location,
            datacapture: field(3, "datacapture")?,
            echogram: field(4, "echogram")?,
        })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line_{}/location_{}", self.line, self.location)?;
        if let Some(dc) = self.datacapture {
            write!(f, "/datacapture_{dc}")?;
        }
        if let Some(eg) = self.echogram {
            write!(f, "/echogram_{eg}")?;
        }
        Ok(())
    }
}

/// Extract the numeric suffix of a single `<prefix>_<n>` segment, e.g.
/// `segment_number("location", "location_9") == Some(9)`. Returns `None`
/// for any deviation from that exact shape.
pub(crate) fn segment_number(prefix: &str, segment: &str) -> Option<u32> {
    let rest = segment.strip_prefix(prefix)?.strip_prefix('_')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_depth() {
        let p = NodePath::parse("line_3/location_14/datacapture_1/echogram_2").unwrap();
        assert_eq!(p, NodePath::full(3, 14, 1, 2));
    }

    #[test]
    fn parse_line_location_only() {
        let p = NodePath::parse("line_0/location_7").unwrap();
        assert_eq!(p, NodePath::line_location(0, 7));
        assert_eq!(p.datacapture, None);
        assert_eq!(p.echogram, None);
    }

    #[test]
    fn leading_and_trailing_slash_tolerated() {
        let p = NodePath::parse("/line_1/location_2/").unwrap();
        assert_eq!(p, NodePath::line_location(1, 2));
    }

    #[test]
    fn datacapture_and_echogram_parse_independently() {
        let p = NodePath::parse("line_0/location_0/datacapture_3/echogram_5").unwrap();
        assert_eq!(p.datacapture, Some(3));
        assert_eq!(p.echogram, Some(5));
    }

    #[test]
    fn echogram_without_datacapture_rejected() {
        assert!(matches!(
            NodePath::parse("line_0/location_0/echogram_1"),
            Err(SurveyError::PathFormat { .. })
        ));
    }

    #[test]
    fn missing_segment_rejected() {
        for bad in ["line_1", "location_0/line_1", "line_/location_2", "line_a/location_2", ""] {
            assert!(
                matches!(NodePath::parse(bad), Err(SurveyError::PathFormat { .. })),
                "`{bad}` should not parse"
            );
        }
    }

    #[test]
    fn oversized_index_rejected() {
        let e = NodePath::parse("line_99999999999/location_0").unwrap_err();
        assert!(matches!(e, SurveyError::PathFormat { .. }));
    }

    #[test]
    fn display_round_trip() {
        for p in [
            NodePath::line_location(4, 9),
            NodePath::full(0, 10, 2, 0),
        ] {
            assert_eq!(NodePath::parse(&p.to_string()).unwrap(), p);
        }
    }

    #[test]
    fn segment_number_is_strict() {
        assert_eq!(segment_number("line", "line_12"), Some(12));
        assert_eq!(segment_number("line", "line_"), None);
        assert_eq!(segment_number("line", "line_1a"), None);
        assert_eq!(segment_number("line", "lines_1"), None);
        assert_eq!(segment_number("line", "picked"), None);
    }
}
