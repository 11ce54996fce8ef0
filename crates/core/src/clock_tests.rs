// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let before = clock.epoch_ms();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), before + 250);
}

#[test]
fn fake_clock_utc_tracks_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    assert_eq!(clock.utc_now().timestamp_millis(), 1_700_000_000_000);
}

#[test]
fn system_clock_is_nonzero() {
    let clock = SystemClock;
    assert!(clock.epoch_ms() > 0);
}
