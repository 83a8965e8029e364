use cctag_core::{GrayImage, GrayImageView};
use cctag_detector::{
    DetectionStatus, DetectorParams, MarkerBank, MarkerDetection, MarkerDetector, ThresholdMode,
};
use cctag_print::{render_marker, render_sheet, MarkerRenderSpec, Placement};

fn view(img: &GrayImage) -> GrayImageView<'_> {
    GrayImageView::new(img.width, img.height, &img.data).expect("view")
}

fn detect(img: &GrayImage, params: DetectorParams) -> Vec<MarkerDetection> {
    let detector = MarkerDetector::with_builtin_bank(params).expect("detector");
    detector.detect(&view(img)).expect("detect")
}

fn find(markers: &[MarkerDetection], x: f32, y: f32) -> &MarkerDetection {
    markers
        .iter()
        .find(|m| (m.x - x).hypot(m.y - y) < 5.0)
        .unwrap_or_else(|| panic!("no marker near ({x}, {y}) in {markers:?}"))
}

fn assert_center(m: &MarkerDetection, x: f32, y: f32) {
    let err = (m.x - x).hypot(m.y - y);
    assert!(err < 0.5, "center ({}, {}) is {err:.3} px from ({x}, {y})", m.x, m.y);
}

#[test]
fn sheet_yields_exactly_the_rendered_ids() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let placements = [
        Placement::new(0, 90.0, 100.0, 60.0),
        Placement::new(3, 240.0, 100.0, 60.0),
        Placement::new(7, 390.0, 100.0, 60.0),
    ];
    let img = render_sheet(&bank, &placements, 480, 200).expect("sheet");
    let markers = detect(&img, DetectorParams::default());

    assert_eq!(markers.len(), 3, "{markers:?}");
    for p in &placements {
        let m = find(&markers, p.center[0] as f32, p.center[1] as f32);
        assert_eq!(m.status, DetectionStatus::Reliable);
        assert_eq!(m.id, p.id as i32);
        assert!(m.quality > 0.9, "quality {}", m.quality);
        assert_center(m, p.center[0] as f32, p.center[1] as f32);
    }
}

#[test]
fn results_are_ordered_by_row_then_column() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let placements = [
        Placement::new(1, 240.0, 80.0, 50.0),
        Placement::new(2, 80.0, 230.0, 50.0),
        Placement::new(4, 240.0, 230.0, 50.0),
    ];
    let img = render_sheet(&bank, &placements, 320, 310).expect("sheet");
    let markers = detect(&img, DetectorParams::default());
    let ids: Vec<i32> = markers.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
}

#[test]
fn oblique_marker_keeps_its_id_and_center() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let mut spec = MarkerRenderSpec::centered(220, 70.0);
    spec.aspect = 0.8;
    spec.angle = 0.5;
    let img = render_marker(&bank, 5, &spec).expect("render");

    let markers = detect(&img, DetectorParams::default());
    assert_eq!(markers.len(), 1, "{markers:?}");
    let m = &markers[0];
    assert_eq!((m.id, m.status), (5, DetectionStatus::Reliable));
    assert_center(m, spec.center[0] as f32, spec.center[1] as f32);

    let e = m.outer_ellipse.expect("outer ellipse");
    assert!((e.a - 70.0).abs() < 1.0, "a = {}", e.a);
    assert!((e.b - 56.0).abs() < 1.0, "b = {}", e.b);
}

#[test]
fn id_outside_a_custom_bank_is_not_reliable() {
    let builtin = MarkerBank::builtin(3).expect("bank");
    let img = render_marker(&builtin, 0, &MarkerRenderSpec::centered(180, 60.0)).expect("render");

    let custom = MarkerBank::from_signatures(3, vec![vec![0.95, 0.6, 0.5, 0.3, 0.2]]).expect("bank");
    let detector = MarkerDetector::new(DetectorParams::default(), custom.clone()).expect("detector");
    let markers = detector.detect(&view(&img)).expect("detect");
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].status, DetectionStatus::IdNotReliable);
    assert_eq!(markers[0].id, 0);

    let strict = DetectorParams {
        keep_unreliable: false,
        ..DetectorParams::default()
    };
    let detector = MarkerDetector::new(strict, custom).expect("detector");
    assert!(detector.detect(&view(&img)).expect("detect").is_empty());
}

#[test]
fn detection_is_idempotent() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let placements = [
        Placement::new(6, 80.0, 80.0, 55.0),
        Placement::new(2, 220.0, 90.0, 45.0),
    ];
    let img = render_sheet(&bank, &placements, 300, 180).expect("sheet");
    let detector = MarkerDetector::with_builtin_bank(DetectorParams::default()).expect("detector");
    let first = detector.detect(&view(&img)).expect("detect");
    let second = detector.detect(&view(&img)).expect("detect");
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[test]
fn four_crown_markers() {
    let bank = MarkerBank::builtin(4).expect("bank");
    let placements = [
        Placement::new(0, 100.0, 100.0, 80.0),
        Placement::new(2, 300.0, 100.0, 80.0),
    ];
    let img = render_sheet(&bank, &placements, 400, 200).expect("sheet");
    let markers = detect(&img, DetectorParams::with_crowns(4));

    assert_eq!(markers.len(), 2, "{markers:?}");
    for p in &placements {
        let m = find(&markers, p.center[0] as f32, p.center[1] as f32);
        assert_eq!((m.id, m.status), (p.id as i32, DetectionStatus::Reliable));
    }
}

#[test]
fn adaptive_threshold_agrees_with_otsu() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let placements = [
        Placement::new(1, 90.0, 90.0, 60.0),
        Placement::new(5, 250.0, 100.0, 60.0),
    ];
    let img = render_sheet(&bank, &placements, 340, 200).expect("sheet");

    let otsu = detect(&img, DetectorParams::default());
    let adaptive = detect(
        &img,
        DetectorParams {
            threshold: ThresholdMode::Adaptive {
                window: 31,
                offset: 10.0,
            },
            ..DetectorParams::default()
        },
    );
    assert_eq!(otsu.len(), 2);
    assert_eq!(adaptive.len(), otsu.len());
    for (a, b) in otsu.iter().zip(&adaptive) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.status, b.status);
        assert!((a.x - b.x).hypot(a.y - b.y) < 0.1);
    }
}

#[test]
fn eccentric_outer_ellipse_is_degenerate() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let mut spec = MarkerRenderSpec::centered(200, 70.0);
    spec.aspect = 0.8;
    let img = render_marker(&bank, 1, &spec).expect("render");

    let params = DetectorParams {
        min_axis_ratio: 0.9,
        ..DetectorParams::default()
    };
    let markers = detect(&img, params);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].status, DetectionStatus::Degenerate);
    assert_eq!(markers[0].id, -1);
    assert!(markers[0].outer_ellipse.is_some());
}

#[test]
fn low_contrast_cuts_are_not_selected() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let img = render_marker(&bank, 1, &MarkerRenderSpec::centered(180, 60.0)).expect("render");
    let params = DetectorParams {
        min_contrast: 300.0,
        ..DetectorParams::default()
    };
    let markers = detect(&img, params);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].status, DetectionStatus::NoSelectedCuts);
    assert_eq!(markers[0].quality, 0.0);
}

#[test]
fn oversized_adaptive_window_from_json_runs() {
    let bank = MarkerBank::builtin(3).expect("bank");
    let img = render_marker(&bank, 2, &MarkerRenderSpec::centered(180, 60.0)).expect("render");
    let params: DetectorParams = serde_json::from_str(
        r#"{"threshold": {"mode": "adaptive", "window": 18446744073709551615, "offset": 5.0}}"#,
    )
    .expect("params");
    assert_eq!(
        params.threshold,
        ThresholdMode::Adaptive {
            window: usize::MAX,
            offset: 5.0
        }
    );
    let markers = detect(&img, params);
    assert!(markers.len() <= 1, "{markers:?}");
}
