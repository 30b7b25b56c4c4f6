use std::collections::HashMap;

use approx::assert_relative_eq;
use speedtrack_rs::tracker::FrameOutput;
use speedtrack_rs::{AppConfig, Calibration, Detection, Homography, PixelPoint, TrackingSession};

fn config() -> AppConfig {
    AppConfig::from_json_str(
        r#"{
            "geometry": {
                "validation_zone": [[0, 0], [640, 0], [640, 480], [0, 480]],
                "lanes": [
                    {"name": "lane_1", "points": [[0, 0], [320, 0], [320, 480], [0, 480]]},
                    {"name": "lane_2", "points": [[320, 0], [640, 0], [640, 480], [320, 480]]}
                ],
                "calibration_region": [[220, 100], [420, 110], [600, 400], [40, 380]]
            },
            "tracking": {"max_frames_lost": 3},
            "calculation": {"units_per_meter": 1.0}
        }"#,
    )
    .unwrap()
}

fn car(id: u64) -> Detection {
    Detection::new(id, 100.0, 100.0, 150.0, 200.0, "car", 0.9)
}

fn run(session: &mut TrackingSession, frame: u64, dets: &[Detection]) -> FrameOutput {
    session.process_frame(frame, dets, None, &HashMap::new())
}

#[test]
fn test_stable_object_in_lane() {
    let mut session = TrackingSession::from_config(&config(), Homography::identity());

    for frame in 1..=5 {
        let out = run(&mut session, frame, &[car(5)]);
        assert_eq!(out.csv_records.len(), 1);
        let rec = &out.csv_records[0];
        assert_eq!(rec.track_id, 5);
        assert_eq!(rec.lane.as_deref(), Some("lane_1"));
        // a standing object never gets above the 0 km/h floor
        assert_eq!(rec.speed_kmh, None);
    }
}

#[test]
fn test_broken_id_is_repaired() {
    let mut session = TrackingSession::from_config(&config(), Homography::identity());

    for frame in 1..=5 {
        run(&mut session, frame, &[car(5)]);
    }
    // Detector loses the object for three frames
    for frame in 6..=8 {
        let out = run(&mut session, frame, &[]);
        assert!(out.csv_records.is_empty());
    }
    assert!(session.tracked_objects().contains_key(&5));

    // ...and brings it back under a new id
    let out = run(&mut session, 9, &[car(9)]);
    assert_eq!(session.final_id(9), 5);
    assert_eq!(out.csv_records[0].track_id, 5);

    let obj = &session.tracked_objects()[&5];
    assert_eq!(obj.creation_frame, 1);
    assert_eq!(obj.last_seen_frame, 9);
    assert!(!session.tracked_objects().contains_key(&9));
}

#[test]
fn test_long_gap_starts_new_track() {
    let mut session = TrackingSession::from_config(&config(), Homography::identity());

    for frame in 1..=5 {
        run(&mut session, frame, &[car(5)]);
    }
    for frame in 6..=9 {
        run(&mut session, frame, &[]);
    }
    assert!(!session.tracked_objects().contains_key(&5));

    let out = run(&mut session, 10, &[car(9)]);
    assert_eq!(session.final_id(9), 9);
    assert_eq!(out.csv_records[0].track_id, 9);
    assert_eq!(session.tracked_objects()[&9].creation_frame, 10);
}

#[test]
fn test_other_class_is_not_adopted() {
    let mut session = TrackingSession::from_config(&config(), Homography::identity());

    run(&mut session, 1, &[car(5)]);
    run(&mut session, 2, &[]);
    let truck = Detection::new(9, 100.0, 100.0, 150.0, 200.0, "truck", 0.9);
    let out = run(&mut session, 3, &[truck]);

    assert_eq!(session.final_id(9), 9);
    assert_eq!(out.csv_records[0].class_name, "truck");
}

#[test]
fn test_duplicate_stable_id_keeps_most_confident() {
    let mut session = TrackingSession::from_config(&config(), Homography::identity());

    run(&mut session, 1, &[car(5)]);
    run(&mut session, 2, &[]);
    run(&mut session, 3, &[car(9)]);
    assert_eq!(session.final_id(9), 5);

    // The detector revives the old id next to the new one
    let old = Detection::new(5, 102.0, 100.0, 152.0, 200.0, "car", 0.95);
    let new = Detection::new(9, 100.0, 100.0, 150.0, 200.0, "car", 0.6);
    let out = run(&mut session, 4, &[old, new]);

    assert_eq!(out.csv_records.len(), 1);
    assert_eq!(out.csv_records[0].track_id, 5);
    assert_eq!(out.csv_records[0].x1, 102.0);
}

#[test]
fn test_calibrated_speed() {
    let mut config = config();
    // mesh spacing is in millimetres
    config.calculation.units_per_meter = 1000.0;
    let calibration = Calibration::from_config(&config.geometry, &config.mesh).unwrap();
    let homography = calibration.homography;
    let mut session = TrackingSession::from_config(&config, homography);

    let mut speeds = Vec::new();
    for frame in 1..=30 {
        let dy = frame as f32 * 2.0;
        let det = Detection::new(7, 280.0, 150.0 + dy, 340.0, 200.0 + dy, "car", 0.9);
        let out = run(&mut session, frame, &[det]);
        speeds.push(out.csv_records[0].speed_kmh);
    }

    assert!(speeds[..2].iter().all(Option::is_none));
    let last = speeds[29].unwrap();

    // ground contact is the bottom centre of the box
    let ground = |frame: u64| {
        let p = PixelPoint::new(310.0, 200.0 + 2.0 * frame as f64);
        homography.project(&p).unwrap()
    };
    let kmh = |from: u64, to: u64| {
        let (a, b) = (ground(from), ground(to));
        let units_per_frame = (b.x - a.x).hypot(b.y - a.y) / (to - from) as f64;
        units_per_frame * config.calculation.fps / config.calculation.units_per_meter * 3.6
    };

    let first_step = kmh(1, 2);
    let last_step = kmh(29, 30);
    let (slow, fast) = (first_step.min(last_step), first_step.max(last_step));
    assert!(last > slow * 0.95 && last < fast * 1.05, "{last} not in [{slow}, {fast}]");
    assert_relative_eq!(last, kmh(1, 30), max_relative = 0.2);
}
