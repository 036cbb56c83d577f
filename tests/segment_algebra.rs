// tests/segment_algebra.rs

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use coincflow::errors::CoincflowError;
use coincflow::segments::{
    MAX_GPS_SECONDS, Segment, SegmentDocument, SegmentList, SegmentListDict, VetoSource, VetoTier, coalesce,
    compute_analyzable, compute_cumulative_veto_groups, dedupe, verify_veto_ladder,
};
use coincflow::types::DetectorSet;
use coincflow_test_utils::builders::{sample_segments, seg, segdict, seglist};

fn vetoes(entries: &[(&str, SegmentListDict)]) -> VetoSource {
    let mut source = VetoSource::new();
    for (name, dict) in entries {
        source.insert(*name, dict.clone());
    }
    source
}

#[test]
fn science_minus_veto_worked_example() {
    let science = segdict(&[("H1", &[(100, 200), (250, 300)])]);
    let source = vetoes(&[("CAT1", segdict(&[("H1", &[(150, 180)])]))]);

    let analyzable = compute_analyzable(&science, &source, &["CAT1".to_string()]).unwrap();

    assert_eq!(
        analyzable.get("H1").unwrap(),
        &seglist(&[(100, 150), (180, 200), (250, 300)])
    );
    // Inputs are untouched.
    assert_eq!(science.get("H1").unwrap(), &seglist(&[(100, 200), (250, 300)]));
}

#[test]
fn analyzable_without_vetoes_is_coalesced_science() {
    let raw = vec![seg(300, 400), seg(100, 200), seg(150, 250), seg(400, 450)];
    let science: SegmentListDict = [("L1".to_string(), SegmentList::from_segments(raw.clone()))]
        .into_iter()
        .collect();

    let analyzable = compute_analyzable(&science, &VetoSource::new(), &[]).unwrap();

    assert_eq!(analyzable.get("L1").unwrap(), &coalesce(raw));
    assert_eq!(analyzable.get("L1").unwrap(), &seglist(&[(100, 250), (300, 450)]));
}

#[test]
fn coalesce_merges_touching_and_drops_empty() {
    let merged = coalesce(vec![seg(10, 20), seg(20, 30), seg(5, 5), seg(40, 50), seg(45, 47)]);
    assert_eq!(merged.segments(), &[seg(10, 30), seg(40, 50)]);
}

#[test]
fn dedupe_removes_only_exact_duplicates() {
    let reported = vec![seg(0, 10), seg(0, 10), seg(5, 12), seg(0, 10)];
    assert_eq!(dedupe(&reported), vec![seg(0, 10), seg(5, 12)]);
}

#[test]
fn set_operations() {
    let a = seglist(&[(0, 10), (20, 30)]);
    let b = seglist(&[(5, 25)]);

    assert_eq!(a.union(&b), seglist(&[(0, 30)]));
    assert_eq!(a.intersection(&b), seglist(&[(5, 10), (20, 25)]));
    assert_eq!(a.difference(&b), seglist(&[(0, 5), (25, 30)]));
    assert_eq!(a.total_duration(), 20);
    assert_eq!(a.extent(), Some(seg(0, 30)));
    assert!(seglist(&[(2, 4)]).is_subset_of(&a));
    assert!(!b.is_subset_of(&a));
}

#[test]
fn segment_rejects_reversed_bounds() {
    assert!(matches!(
        Segment::new(10, 5),
        Err(CoincflowError::SegmentAlgebra(_))
    ));
}

#[test]
fn cumulative_tiers_shrink_and_are_named_by_categories() {
    let base = segdict(&[("H1", &[(0, 1000)]), ("L1", &[(0, 1000)])]);
    let source = vetoes(&[
        ("CAT2", segdict(&[("H1", &[(100, 200)]), ("L1", &[])])),
        ("CAT3", segdict(&[("H1", &[(500, 510)]), ("L1", &[(900, 1000)])])),
    ]);

    let tiers =
        compute_cumulative_veto_groups(&base, &source, &["CAT2".to_string(), "CAT3".to_string()])
            .unwrap();

    let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["CUMULATIVE_CAT2", "CUMULATIVE_CAT2_CAT3"]);
    assert_eq!(
        tiers[1].segments.get("H1").unwrap(),
        &seglist(&[(0, 100), (200, 500), (510, 1000)])
    );
    assert_eq!(tiers[1].segments.get("L1").unwrap(), &seglist(&[(0, 900)]));
    assert!(tiers[1].segments.is_subset_of(&tiers[0].segments));
}

#[test]
fn ladder_that_grows_is_rejected() {
    let base = segdict(&[("H1", &[(0, 100)])]);
    let tiers = vec![
        VetoTier {
            name: "CUMULATIVE_CAT2".to_string(),
            categories: vec!["CAT2".to_string()],
            segments: segdict(&[("H1", &[(0, 50)])]),
        },
        VetoTier {
            name: "CUMULATIVE_CAT2_CAT3".to_string(),
            categories: vec!["CAT2".to_string(), "CAT3".to_string()],
            segments: segdict(&[("H1", &[(0, 60)])]),
        },
    ];

    match verify_veto_ladder(&base, &tiers) {
        Err(CoincflowError::SegmentAlgebra(msg)) => {
            assert!(msg.contains("CUMULATIVE_CAT2_CAT3"));
        }
        other => panic!("expected SegmentAlgebra error, got {other:?}"),
    }
}

#[test]
fn unknown_veto_category_is_a_configuration_error() {
    let science = segdict(&[("H1", &[(0, 100)])]);
    let err = compute_analyzable(&science, &VetoSource::new(), &["CAT9".to_string()]).unwrap_err();

    assert!(matches!(err, CoincflowError::MissingVetoCategory { ref category, .. } if category == "CAT9"));
    assert!(err.is_configuration());
}

#[test]
fn veto_list_missing_from_document_fails_but_empty_list_is_fine() {
    let doc = sample_segments();
    let detectors = DetectorSet::new(["H1", "L1"]);

    // L1:CAT1 is present but empty.
    let source = VetoSource::from_document(&doc, &["CAT1".to_string()], &detectors).unwrap();
    assert!(source.category("CAT1").unwrap().get("L1").unwrap().is_empty());

    match VetoSource::from_document(&doc, &["CAT4".to_string()], &detectors) {
        Err(CoincflowError::MissingVetoCategory { detector, category }) => {
            assert_eq!(detector, "H1");
            assert_eq!(category, "CAT4");
        }
        other => panic!("expected MissingVetoCategory, got {other:?}"),
    }
}

#[test]
fn segment_document_round_trips_through_json() {
    let mut doc = SegmentDocument::new(seg(1000, 2000));
    doc.insert("H1", "SCIENCE", &seglist(&[(900, 1100), (1500, 2500)]));

    // Clipped to span on insert.
    assert_eq!(doc.get("H1", "SCIENCE").unwrap(), &seglist(&[(1000, 1100), (1500, 2000)]));

    let json = doc.to_json_string().unwrap();
    assert!(json.contains("\"H1:SCIENCE\""));
    assert_eq!(SegmentDocument::from_json_str(&json).unwrap(), doc);
}

#[test]
fn segment_document_parses_literal_json() {
    let doc = SegmentDocument::from_json_str(
        r#"{ "span": [0, 100], "segments": { "V1:DATA": [[50, 60], [0, 10], [5, 20]] } }"#,
    )
    .unwrap();
    assert_eq!(doc.get("V1", "DATA").unwrap(), &seglist(&[(0, 20), (50, 60)]));

    assert!(SegmentDocument::from_json_str(r#"{ "span": [10, 0] }"#).is_err());
}

#[test]
fn bounds_outside_the_gps_range_are_rejected() {
    let widest = Segment::new(-MAX_GPS_SECONDS, MAX_GPS_SECONDS).unwrap();
    assert_eq!(widest.duration(), 2 * MAX_GPS_SECONDS);

    for (start, end) in [(i64::MIN, 0), (0, i64::MAX), (-MAX_GPS_SECONDS - 1, 0)] {
        assert!(matches!(
            Segment::new(start, end),
            Err(CoincflowError::SegmentAlgebra(_))
        ));
    }

    let extreme = format!(
        r#"{{ "span": [0, 100], "segments": {{ "H1:DATA": [[{}, {}]] }} }}"#,
        i64::MIN,
        i64::MAX
    );
    assert!(SegmentDocument::from_json_str(&extreme).is_err());
}

#[test]
fn livetime_of_far_apart_segments_does_not_overflow() {
    let list = SegmentList::from_segments([
        Segment::new(-MAX_GPS_SECONDS, 0).unwrap(),
        Segment::new(1, MAX_GPS_SECONDS).unwrap(),
    ]);
    assert_eq!(list.total_duration(), 2 * MAX_GPS_SECONDS - 1);
}

fn segment_strategy() -> impl Strategy<Value = Segment> {
    (0i64..1000, 0i64..200).prop_map(|(start, len)| seg(start, start + len))
}

fn segments_strategy() -> impl Strategy<Value = Vec<Segment>> {
    proptest::collection::vec(segment_strategy(), 0..20)
}

proptest! {
    #[test]
    fn coalesce_is_idempotent(raw in segments_strategy()) {
        let once = coalesce(raw);
        let twice = coalesce(once.segments().to_vec());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn coalesced_segments_are_disjoint_and_sorted(raw in segments_strategy()) {
        let list = coalesce(raw);
        for pair in list.segments().windows(2) {
            prop_assert!(pair[0].end() < pair[1].start());
        }
        for s in list.iter() {
            prop_assert!(!s.is_empty());
        }
    }

    #[test]
    fn difference_never_grows(a in segments_strategy(), b in segments_strategy()) {
        let a = SegmentList::from_segments(a);
        let b = SegmentList::from_segments(b);
        let diff = a.difference(&b);
        prop_assert!(diff.is_subset_of(&a));
        prop_assert!(diff.intersection(&b).is_empty());
        prop_assert_eq!(diff.union(&a.intersection(&b)), a);
    }

    #[test]
    fn cumulative_tiers_never_grow(
        base in segments_strategy(),
        cats in proptest::collection::vec(segments_strategy(), 1..5),
    ) {
        let base: SegmentListDict =
            [("H1".to_string(), SegmentList::from_segments(base))].into_iter().collect();
        let mut source = VetoSource::new();
        let mut names = Vec::new();
        for (i, cat) in cats.into_iter().enumerate() {
            let name = format!("CAT{i}");
            source.insert(
                name.clone(),
                [("H1".to_string(), SegmentList::from_segments(cat))].into_iter().collect(),
            );
            names.push(name);
        }

        let tiers = compute_cumulative_veto_groups(&base, &source, &names).unwrap();
        prop_assert_eq!(tiers.len(), names.len());
        prop_assert!(tiers[0].segments.is_subset_of(&base));
        for pair in tiers.windows(2) {
            prop_assert!(pair[1].segments.is_subset_of(&pair[0].segments));
        }
    }
}
