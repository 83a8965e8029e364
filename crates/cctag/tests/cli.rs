use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use cctag::{DetectReport, DetectionStatus};

fn cctag() -> Command {
    Command::cargo_bin("cctag").expect("cctag binary")
}

fn print_marker(dir: &Path, id: usize) -> std::path::PathBuf {
    let out = dir.join(format!("marker_{id}.png"));
    cctag()
        .args(["print", "--id", &id.to_string(), "--size", "200", "--radius", "70"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    out
}

#[test]
fn print_then_detect_reports_the_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 3);

    cctag()
        .arg("detect")
        .arg(&png)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3   1\nx: "))
        .stdout(predicate::str::contains("   y: "));
}

#[test]
fn json_report_carries_image_size_and_markers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 6);

    let output = cctag()
        .arg("detect")
        .arg(&png)
        .arg("--json")
        .output()
        .expect("run");
    assert!(output.status.success());
    let report: DetectReport = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!((report.width, report.height), (200, 200));
    assert_eq!(report.markers.len(), 1);
    assert_eq!(report.markers[0].id, 6);
    assert_eq!(report.markers[0].status, DetectionStatus::Reliable);
}

#[test]
fn annotate_writes_an_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 1);
    let annotated = dir.path().join("annotated.png");

    cctag()
        .arg("detect")
        .arg(&png)
        .arg("--annotate")
        .arg(&annotated)
        .assert()
        .success();
    let img = image::open(&annotated).expect("annotated image").to_rgb8();
    assert_eq!(img.get_pixel(100, 100), &image::Rgb([0, 255, 0]));
}

#[test]
fn reliable_only_hides_markers_missing_from_the_bank() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 0);
    let bank = dir.path().join("bank.txt");
    std::fs::write(&bank, "# one id\n0.95 0.6 0.5 0.3 0.2\n").expect("bank");

    cctag()
        .arg("detect")
        .arg(&png)
        .arg("--bank")
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0   -5\n"));

    cctag()
        .arg("detect")
        .arg(&png)
        .arg("--bank")
        .arg(&bank)
        .arg("--reliable-only")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn config_file_sets_parameters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 2);
    let cfg = dir.path().join("cfg.json");
    let report = dir.path().join("report.json");
    let json = serde_json::json!({
        "output_path": report.to_string_lossy(),
        "params": { "threshold": { "mode": "adaptive", "window": 31, "offset": 10.0 } }
    });
    std::fs::write(&cfg, json.to_string()).expect("cfg");

    cctag()
        .arg("detect")
        .arg(&png)
        .arg("--config")
        .arg(&cfg)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2   1\n"));
    let saved = DetectReport::load_json(&report).expect("report");
    assert_eq!(saved.markers.len(), 1);
    assert!(saved.image_path.ends_with("marker_2.png"));
}

#[test]
fn missing_image_fails_with_a_diagnostic() {
    let dir = tempfile::tempdir().expect("tempdir");
    cctag()
        .arg("detect")
        .arg(dir.path().join("missing.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unsupported_crown_count_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let png = print_marker(dir.path(), 0);
    cctag()
        .arg("detect")
        .arg(&png)
        .args(["--crowns", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("crown"));
}

#[test]
fn print_svg() {
    let dir = tempfile::tempdir().expect("tempdir");
    let svg = dir.path().join("m.svg");
    cctag()
        .args(["print", "--id", "4", "--radius", "30"])
        .arg("--out")
        .arg(&svg)
        .assert()
        .success();
    let text = std::fs::read_to_string(&svg).expect("svg");
    assert!(text.contains("<svg"));
    assert_eq!(text.matches("<circle").count(), 6);
}

#[test]
fn print_rejects_unknown_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    cctag()
        .args(["print", "--id", "100000", "--crowns", "2"])
        .arg("--out")
        .arg(dir.path().join("x.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown marker id"));
}
