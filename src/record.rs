//! Per-trace metadata records and the ingestion boundary.
//!
//! For every selected leaf the extraction layer derives a [`Fid`] and hands
//! the leaf's raw annotation to a [`RecordParser`]. The parser is the seam
//! to the external record-interpretation component; the bundled
//! [`NameValParser`] only understands flat `<Name>…</Name><Val>…</Val>`
//! pair sequences, which is what acquisition software writes into trace
//! annotations. A failure to parse one trace's annotation crops that one
//! record and extraction continues.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::fid::Fid;
use crate::survey_error::SurveyError;

/// Parsed metadata for one trace, joined to the trace by its identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Identifier of the trace this record belongs to.
    pub fid: Fid,
    /// Field name → value, in name order.
    pub fields: BTreeMap<String, String>,
}

impl TraceRecord {
    /// Record with no fields, used for traces whose leaf carries no
    /// annotation at all.
    pub fn empty(fid: Fid) -> Self {
        TraceRecord {
            fid,
            fields: BTreeMap::new(),
        }
    }
}

/// Records accumulated over one extraction, in selection order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    records: Vec<TraceRecord>,
}

impl RecordSet {
    /// Append a record.
    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were accumulated.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// The record for `fid`, if one survived parsing.
    pub fn get(&self, fid: Fid) -> Option<&TraceRecord> {
        self.records.iter().find(|record| record.fid == fid)
    }
}

/// The record-interpretation boundary.
pub trait RecordParser {
    /// Interpret one trace's raw annotation.
    ///
    /// # Errors
    /// [`SurveyError::MetadataParse`] describing why the annotation was
    /// rejected; the caller crops the record and continues.
    fn parse(&self, fid: Fid, annotation: &str) -> Result<TraceRecord, SurveyError>;
}

static NAME_VAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<Name>\s*(.*?)\s*</Name>\s*<Val>\s*(.*?)\s*</Val>")
        .expect("name/val grammar must compile")
});

/// Minimal bundled parser for flat `<Name>…</Name><Val>…</Val>` sequences.
#[derive(Copy, Clone, Debug, Default)]
pub struct NameValParser;

impl RecordParser for NameValParser {
    fn parse(&self, fid: Fid, annotation: &str) -> Result<TraceRecord, SurveyError> {
        if annotation.trim().is_empty() {
            return Ok(TraceRecord::empty(fid));
        }
        let names = annotation.matches("<Name>").count();
        let mut fields = BTreeMap::new();
        let mut pairs = 0;
        for caps in NAME_VAL_RE.captures_iter(annotation) {
            fields.insert(caps[1].to_string(), caps[2].to_string());
            pairs += 1;
        }
        if names == 0 {
            return Err(SurveyError::MetadataParse {
                fid,
                reason: "no <Name>/<Val> pairs found".to_string(),
            });
        }
        if pairs < names {
            return Err(SurveyError::MetadataParse {
                fid,
                reason: format!("{names} <Name> tag(s) but only {pairs} complete pair(s)"),
            });
        }
        Ok(TraceRecord { fid, fields })
    }
}
