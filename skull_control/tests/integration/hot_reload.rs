//! Config swaps between ticks.

use std::io::Write;

use tempfile::NamedTempFile;

use skull_common::prelude::*;
use skull_control::config::ReloadResult;

use super::support::{Rig, test_config};

#[test]
fn reloaded_speed_limit_applies_to_next_move() {
    let mut r = Rig::standard();
    r.home();

    let mut shadow = test_config();
    shadow.motion.max_speed = 1000.0;
    assert_eq!(r.config.replace(shadow), ReloadResult::Success);
    assert_eq!(r.config.generation(), 1);

    assert!(r.send(CommandKind::MoveAbsolute { target: 3900 }));
    let mut peak: f64 = 0.0;
    assert!(r.run_until(30_000, |s| {
        peak = peak.max(s.current_speed.abs());
        s.state == SystemState::Ready && s.current_position == 3900
    }));
    assert!(peak <= 1000.0 + 1e-6, "peak {peak}");
}

#[test]
fn cycle_time_change_is_out_of_scope() {
    let r = Rig::standard();
    let mut shadow = test_config();
    shadow.engine.cycle_time_us = 2000;
    assert!(matches!(
        r.config.replace(shadow),
        ReloadResult::ScopeViolation(_)
    ));
    assert_eq!(r.config.generation(), 0);
    assert_eq!(r.config.snapshot().engine.cycle_time_us, 1000);
}

#[test]
fn invalid_limits_are_rejected() {
    let mut r = Rig::standard();
    let mut shadow = test_config();
    shadow.limits.min_position = 500;
    shadow.limits.max_position = 100;
    assert!(matches!(
        r.config.replace(shadow),
        ReloadResult::ValidationFailed(_)
    ));
    assert_eq!(r.config.generation(), 0);

    r.run(5);
    assert_eq!(r.status().position_limits, PositionLimits::new(0, 800));
}

#[test]
fn decoder_follows_reloaded_base_channel() {
    let mut r = Rig::standard();
    r.home();
    let mut shadow = test_config();
    shadow.decoder.base_channel = 10;
    assert_eq!(r.config.replace(shadow), ReloadResult::Success);
    r.run(5);
    assert_eq!(r.decoder_handle().base_channel(), 10);

    r.frame([128, 0, 255, 255, 200]);
    assert!(r.run_until(20_000, |s| s.current_position == 2008 && !s.is_moving()));
}

#[test]
fn unhomed_engine_adopts_reloaded_limits() {
    let mut r = Rig::standard();
    r.run(1);

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[limits]\nmin_position = -200\nmax_position = 400").unwrap();
    assert_eq!(r.config.reload_from_file(file.path()), ReloadResult::Success);

    assert!(r.send(CommandKind::MoveAbsolute { target: 5000 }));
    assert!(r.settle());
    let s = r.status();
    assert_eq!(s.position_limits, PositionLimits::new(-200, 400));
    assert_eq!(s.current_position, 400);
}

#[test]
fn homed_limits_survive_reload() {
    let mut r = Rig::standard();
    r.home();
    assert_eq!(
        r.config.reload_from_str("[limits]\nmax_position = 400\n"),
        ReloadResult::Success
    );
    r.run(5);
    assert_eq!(r.status().position_limits, PositionLimits::new(50, 3950));
}

#[test]
fn malformed_toml_is_rejected() {
    let r = Rig::standard();
    assert!(matches!(
        r.config.reload_from_str("[motion\nmax_speed = fast"),
        ReloadResult::ValidationFailed(_)
    ));
    assert_eq!(r.config.generation(), 0);
}
