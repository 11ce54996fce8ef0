// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pilot_core::test_support::intent_event;
use pilot_core::Behavior;
use std::io::Write as _;
use tempfile::TempDir;

fn sample_projection() -> Projection {
    let mut projection = Projection::default();
    projection.apply_event(&intent_event("task-1", "hello", Behavior::Answer));
    projection
}

#[test]
fn save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("projection.snap");

    let snapshot = ProjectionSnapshot::new(1, sample_projection());
    snapshot.save(&path).unwrap();

    let loaded = ProjectionSnapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.event_count, 1);
    assert!(loaded.projection.task("task-1").is_some());
}

#[test]
fn load_missing_returns_none() {
    let dir = TempDir::new().unwrap();
    let loaded = ProjectionSnapshot::load(&dir.path().join("absent.snap")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_snapshot_is_rotated_to_bak() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("projection.snap");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not a snapshot").unwrap();
    }

    let loaded = ProjectionSnapshot::load(&path).unwrap();
    assert!(loaded.is_none());
    assert!(path.with_extension("bak").exists());
    assert!(!path.exists());
}

#[test]
fn bak_rotation_keeps_three() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("projection.snap");

    for _ in 0..4 {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"junk").unwrap();
        drop(file);
        ProjectionSnapshot::load(&path).unwrap();
    }

    assert!(path.with_extension("bak").exists());
    assert!(path.with_extension("bak.2").exists());
    assert!(path.with_extension("bak.3").exists());
    assert!(!path.with_extension("bak.4").exists());
}

#[test]
fn save_is_atomic_no_tmp_left_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("projection.snap");
    ProjectionSnapshot::new(0, Projection::default())
        .save(&path)
        .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}
