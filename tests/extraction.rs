use std::path::PathBuf;

use tempfile::TempDir;
use trace_sieve::extract::select::{Bounds, ChannelSpec};
use trace_sieve::store::archive::FileArchive;
use trace_sieve::store::tree::{TraceLeaf, TreeStoreMut};
use trace_sieve::survey::{ExtractOptions, Survey};
use trace_sieve::survey_error::SurveyError;

fn annotation(lat: f64) -> String {
    format!("<Name>GPS Lat</Name><Val>{lat}</Val><Name>Digitizer</Name><Val>pico</Val>")
}

/// One line (number 3) with three locations of lengths 5, 3, 7 on channel 0
/// and a short companion trace on channel 1; plus an empty line_8 group.
fn build_archive(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("glacier24.tsv");
    let mut archive = FileArchive::create(&path);
    let traces: [(u32, Vec<f64>); 3] = [
        (0, vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        (1, vec![6.0, 7.0, 8.0]),
        (2, vec![9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0]),
    ];
    for (location, samples) in &traces {
        archive
            .put_leaf(
                &format!("line_3/location_{location}/datacapture_0/echogram_0"),
                TraceLeaf {
                    samples: samples.clone(),
                    annotation: Some(annotation(61.0 + *location as f64)),
                },
            )
            .unwrap();
    }
    archive
        .put_leaf(
            "line_3/location_1/datacapture_1/echogram_0",
            TraceLeaf::from_samples(vec![0.5, 0.6]),
        )
        .unwrap();
    // A picked overlay that must never be re-assembled as a raw trace.
    archive
        .put_leaf(
            "line_3/location_0/datacapture_0/picked_0",
            TraceLeaf::from_samples(vec![99.0]),
        )
        .unwrap();
    archive.create_group("line_8").unwrap();
    archive.close().unwrap();
    path
}

#[test]
fn assembles_padded_matrix_in_location_order() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();

    let gather = survey.extract_line(3, &ExtractOptions::default()).unwrap();
    assert_eq!(gather.matrix.shape(), (7, 3));
    assert_eq!(gather.sample_counts, vec![5, 3, 7]);
    assert_eq!(gather.matrix.column(0), &[1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0]);
    assert_eq!(gather.matrix.column(1), &[6.0, 7.0, 8.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(gather.line, 3);
    assert_eq!(gather.channels, ChannelSpec::Single(0));
}

#[test]
fn gather_carries_records_and_retention_view() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();

    let gather = survey.extract_line(3, &ExtractOptions::default()).unwrap();
    assert_eq!(gather.records.len(), 3);
    let first = gather.records.iter().next().unwrap();
    assert_eq!(first.fid.to_string(), "0003000000000000");
    assert_eq!(first.fields["GPS Lat"], "61");
    assert_eq!(gather.retain.len(), 3);
    assert!(gather.retain.values().all(|&kept| kept));
}

#[test]
fn channel_selection_and_empty_channel() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();

    let options = ExtractOptions {
        channels: ChannelSpec::Single(1),
        ..ExtractOptions::default()
    };
    let gather = survey.extract_line(3, &options).unwrap();
    assert_eq!(gather.matrix.shape(), (2, 1));

    let options = ExtractOptions {
        channels: ChannelSpec::Single(5),
        ..ExtractOptions::default()
    };
    assert!(matches!(
        survey.extract_line(3, &options),
        Err(SurveyError::DegenerateLine { line: 3, .. })
    ));
}

#[test]
fn bounds_restrict_the_selection() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();

    let options = ExtractOptions {
        bounds: Bounds::new(Some(1), Some(3)),
        ..ExtractOptions::default()
    };
    let gather = survey.extract_line(3, &options).unwrap();
    assert_eq!(gather.matrix.cols(), 2);
    assert_eq!(gather.sample_counts, vec![3, 7]);
}

#[test]
fn unparseable_annotation_crops_one_record_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.tsv");
    let mut archive = FileArchive::create(&path);
    archive
        .put_leaf(
            "line_0/location_0/datacapture_0/echogram_0",
            TraceLeaf {
                samples: vec![1.0, 2.0],
                annotation: Some(annotation(60.0)),
            },
        )
        .unwrap();
    archive
        .put_leaf(
            "line_0/location_1/datacapture_0/echogram_0",
            TraceLeaf {
                samples: vec![3.0, 4.0],
                annotation: Some("<Name>orphaned".to_string()),
            },
        )
        .unwrap();
    archive.close().unwrap();

    let survey = Survey::open(&path).unwrap();
    let gather = survey.extract_line(0, &ExtractOptions::default()).unwrap();
    // The bad annotation costs its record, not the trace column.
    assert_eq!(gather.matrix.cols(), 2);
    assert_eq!(gather.records.len(), 1);
    assert_eq!(gather.records.iter().next().unwrap().fid.location(), 0);
}

#[test]
fn lines_sorted_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many_lines.tsv");
    let mut archive = FileArchive::create(&path);
    for line in [10u32, 2, 0] {
        archive
            .put_leaf(
                &format!("line_{line}/location_0/datacapture_0/echogram_0"),
                TraceLeaf::from_samples(vec![1.0]),
            )
            .unwrap();
    }
    archive.close().unwrap();

    let survey = Survey::open(&path).unwrap();
    assert_eq!(survey.lines().unwrap(), vec!["line_0", "line_2", "line_10"]);
}

#[test]
fn channels_in_line_takes_the_maximum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("channels.tsv");
    let mut archive = FileArchive::create(&path);
    for dc in 0..2 {
        archive
            .put_leaf(
                &format!("line_0/location_0/datacapture_{dc}/echogram_0"),
                TraceLeaf::from_samples(vec![1.0]),
            )
            .unwrap();
    }
    archive
        .put_leaf(
            "line_0/location_1/datacapture_0/echogram_0",
            TraceLeaf::from_samples(vec![1.0]),
        )
        .unwrap();
    archive.close().unwrap();

    let survey = Survey::open(&path).unwrap();
    assert_eq!(survey.channels_in_line(0).unwrap(), 2);
    assert!(matches!(
        survey.channels_in_line(9),
        Err(SurveyError::LineNotFound(9))
    ));
}

#[test]
fn extract_trace_returns_one_vector() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();
    assert_eq!(survey.extract_trace(3, 1, 0, 0).unwrap(), vec![6.0, 7.0, 8.0]);
    assert!(matches!(
        survey.extract_trace(3, 9, 0, 0),
        Err(SurveyError::MissingNode(_))
    ));
}

#[test]
fn missing_archive_is_reported_not_a_panic() {
    let err = Survey::open("/no/such/archive.tsv").unwrap_err();
    assert!(matches!(err, SurveyError::StoreNotFound(_)));
}

#[test]
fn empty_line_group_cannot_assemble() {
    let dir = tempfile::tempdir().unwrap();
    let survey = Survey::open(build_archive(&dir)).unwrap();
    assert!(matches!(
        survey.extract_line(8, &ExtractOptions::default()),
        Err(SurveyError::DegenerateLine { line: 8, .. })
    ));
}
