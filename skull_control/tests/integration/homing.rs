//! Homing: range discovery, progress, and the failure paths.

use std::collections::BTreeSet;

use skull_common::prelude::*;
use skull_control::drive::SimAxisConfig;
use skull_control::engine::limits::LimitSide;

use super::support::{Rig, test_axis, test_config};

#[test]
fn homing_discovers_range_and_parks_at_home_percent() {
    let mut r = Rig::standard();
    r.home();

    let s = r.status();
    assert_eq!(s.position_limits, PositionLimits::new(50, 3950));
    assert_eq!(s.current_position, 2000);
    assert_eq!(s.target_position, 2000);
    assert!(s.homed);
    assert_eq!(s.faults, FaultFlags::empty());
    assert_eq!(s.homing_progress, 100);
    // Zero reference is the back-off point at raw −950.
    assert_eq!(r.sim.position(), 1050);
    assert!(r.engine.is_homed());
    assert_eq!(r.engine.position_limits(), PositionLimits::new(50, 3950));
}

#[test]
fn homing_progress_walks_through_phases() {
    let mut r = Rig::standard();
    r.run(1);
    assert!(r.send(CommandKind::Home));
    let mut seen = BTreeSet::new();
    let done = r.run_until(40_000, |s| {
        seen.insert(s.homing_progress);
        s.homed
    });
    assert!(done);
    let expected: BTreeSet<u8> = [10, 25, 50, 75, 90, 100].into_iter().collect();
    assert!(expected.is_subset(&seen), "seen {seen:?}");
}

#[test]
fn homing_starts_from_pressed_min_switch() {
    let axis = SimAxisConfig {
        start_position: -1000,
        ..test_axis()
    };
    let mut r = Rig::new(test_config(), axis);
    r.home();
    assert_eq!(r.status().position_limits, PositionLimits::new(50, 3950));
    assert_eq!(r.status().current_position, 2000);
}

#[test]
fn home_while_homing_is_acknowledged_without_restart() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(3000);
    let before = r.status();
    assert_eq!(before.state, SystemState::Homing);
    assert!(before.homing_progress >= 25);

    assert!(r.send(CommandKind::Home));
    r.run(1);
    let after = r.status();
    assert_eq!(after.state, SystemState::Homing);
    assert!(after.homing_progress >= before.homing_progress);

    assert!(r.run_until(40_000, |s| s.homed));
    assert_eq!(r.status().current_position, 2000);
}

#[test]
fn too_small_range_fails_into_error() {
    let axis = SimAxisConfig {
        start_position: -900,
        min_switch: Some(-1000),
        max_switch: Some(-800),
    };
    let mut r = Rig::new(test_config(), axis);
    assert!(r.send(CommandKind::Home));
    assert!(r.run_until(20_000, |s| s.state == SystemState::Error));

    let s = r.status();
    assert!(!s.homed);
    assert!(s.faults.contains(FaultFlags::HOMING_FAILED | FaultFlags::RANGE_TOO_SMALL));
    // Partial data discarded: configured limits stay in force.
    assert_eq!(s.position_limits, PositionLimits::new(0, 800));
}

#[test]
fn missing_switch_times_out() {
    let mut config = test_config();
    config.homing.timeout_ms = 500;
    let axis = SimAxisConfig {
        min_switch: None,
        ..test_axis()
    };
    let mut r = Rig::new(config, axis);
    assert!(r.send(CommandKind::Home));
    r.run(400);
    assert_eq!(r.status().state, SystemState::Homing);
    assert!(r.run_until(200, |s| s.state == SystemState::Error));
    assert!(r.status().faults.contains(FaultFlags::HOMING_TIMEOUT));
}

#[test]
fn unexpected_max_edge_aborts_seek() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(500);
    assert_eq!(r.status().homing_progress, 10);

    // Max switch suddenly reads active under the carriage.
    r.sim.set_switches(Some(-1000), Some(r.sim.position() - 100));
    assert!(r.run_until(10, |s| s.state == SystemState::Error));
    let s = r.status();
    assert!(s.faults.contains(FaultFlags::HOMING_FAILED | FaultFlags::LIMIT_MAX));
    assert_eq!(s.current_speed, 0.0);
}

#[test]
fn bounce_without_level_does_not_end_seek() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(200);
    r.sim.inject_edge(LimitSide::Min);
    r.sim.inject_edge(LimitSide::Max);
    r.run(10);
    let s = r.status();
    assert_eq!(s.state, SystemState::Homing);
    assert_eq!(s.homing_progress, 10);
}

#[test]
fn alarm_during_homing_fails_run() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(100);
    r.sim.set_alarm(true);
    assert!(r.run_until(5, |s| s.state == SystemState::Error));
    assert!(
        r.status()
            .faults
            .contains(FaultFlags::HOMING_FAILED | FaultFlags::DRIVE_ALARM)
    );
}

#[test]
fn stop_cancels_homing() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(300);
    assert!(r.send(CommandKind::Stop));
    assert!(r.run_until(5, |s| s.state == SystemState::NotHomed));
    assert!(r.settle());
    assert!(!r.status().homed);
    assert_eq!(r.status().homing_progress, 0);
}

#[test]
fn auto_home_on_boot() {
    let mut config = test_config();
    config.engine.auto_home_on_boot = true;
    let mut r = Rig::new(config, test_axis());
    r.run(1);
    assert_eq!(r.status().state, SystemState::Homing);
    assert!(r.run_until(40_000, |s| s.homed));
}
