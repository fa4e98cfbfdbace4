use ndarray::Array2;
use sasred_algorithms::{Reduction, ReductionOutput, SweepOptions};
use sasred_core::{Detector, DetectorFrame, Source, Vector2};
use sasred_io::{load_frame, load_plan, save_frame, Error, ProfileWriter};
use tempfile::TempDir;

fn frame() -> DetectorFrame {
    DetectorFrame::new(
        Array2::from_elem((16, 16), 50.0),
        Detector::new(Vector2::new(5.0, 5.0), Vector2::new(40.0, 40.0), 2000.0),
        Source::new(6.0),
    )
    .with_error(Array2::from_elem((16, 16), 7.0))
}

#[test]
fn test_reduce_saved_frame_to_text() {
    let dir = TempDir::new().unwrap();
    let frame_path = dir.path().join("frame.json");
    let plan_path = dir.path().join("plan.json");
    let out_path = dir.path().join("profile.txt");

    save_frame(&frame_path, &frame()).unwrap();
    std::fs::write(
        &plan_path,
        r#"{"kind": "circular", "r_min": 0.0, "r_max": 1.0, "bin_width": 0.002}"#,
    )
    .unwrap();

    let loaded = load_frame(&frame_path).unwrap();
    assert_eq!(loaded, frame());

    let reductions = load_plan(&plan_path).unwrap();
    assert_eq!(reductions.len(), 1);
    let ReductionOutput::Profile(profile) =
        reductions[0].run(&loaded, SweepOptions::default()).unwrap()
    else {
        panic!("circular average yields a profile");
    };

    let mut writer = ProfileWriter::create(&out_path).unwrap();
    writer.write_profile(&profile).unwrap();

    let content = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("<X>   <Y>   <dY>"));
    let rows: Vec<Vec<&str>> = lines.map(|line| line.split("  ").collect()).collect();
    assert_eq!(rows.len(), profile.populated_bins());
    for row in rows {
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], "50");
    }
}

#[test]
fn test_plan_with_unknown_kind() {
    let dir = TempDir::new().unwrap();
    let plan_path = dir.path().join("plan.json");
    std::fs::write(&plan_path, r#"{"kind": "hexagon"}"#).unwrap();
    assert!(matches!(load_plan(&plan_path), Err(Error::Json(_))));
}

#[test]
fn test_missing_frame_file() {
    let dir = TempDir::new().unwrap();
    let err = load_frame(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_sector_plan_list() {
    let dir = TempDir::new().unwrap();
    let plan_path = dir.path().join("plan.json");
    std::fs::write(
        &plan_path,
        r#"[
            {"kind": "sector_phi", "r_min": 0.0, "r_max": 1.0, "phi_min": 0.0, "phi_max": 3.0},
            {"kind": "sector_q_symmetric", "r_min": 0.0, "r_max": 1.0, "phi_min": 0.5, "phi_max": 1.5, "nbins": 8}
        ]"#,
    )
    .unwrap();
    let reductions = load_plan(&plan_path).unwrap();
    assert_eq!(reductions.len(), 2);
    assert!(reductions[0].is_angular());
    assert!(matches!(&reductions[1], Reduction::SectorQSymmetric(config) if config.nbins == 8));
}
