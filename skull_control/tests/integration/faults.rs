//! Limit, alarm, following-error and emergency-stop handling.

use skull_common::prelude::*;

use super::support::{Rig, test_axis, test_config};

/// Homed rig with a long move toward the max end in progress.
fn moving_rig(config: CoreConfig) -> Rig {
    let mut r = Rig::new(config, test_axis());
    r.home();
    assert!(r.send(CommandKind::MoveAbsolute { target: 3900 }));
    r.run(300);
    assert_eq!(r.status().state, SystemState::Moving);
    r
}

/// Put the max switch 20 steps ahead and tick until the drive trips it.
fn trip_max_switch(r: &mut Rig) {
    r.sim.set_switches(Some(-1000), Some(r.sim.position() + 20));
    for _ in 0..100 {
        if r.sim.limit_levels().1 {
            return;
        }
        r.tick();
    }
    panic!("max switch never tripped");
}

#[test]
fn limit_edge_halts_before_pending_command() {
    let mut r = moving_rig(test_config());
    trip_max_switch(&mut r);

    // Queued in the same tick the edge is confirmed: must not run.
    assert!(r.send(CommandKind::MoveAbsolute { target: 100 }));
    r.run(1);

    let s = r.status();
    assert_eq!(s.state, SystemState::Error);
    assert!(s.faults.contains(FaultFlags::LIMIT_MAX));
    assert!(s.limit_max_active);
    assert!(s.is_limit_fault_active());
    assert!(!s.homed);
    assert_eq!(s.current_speed, 0.0);
    assert_eq!(s.target_position, s.current_position);

    let frozen = r.sim.position();
    r.run(100);
    assert_eq!(r.sim.position(), frozen);
    assert_eq!(r.status().current_position, s.current_position);
}

#[test]
fn error_refuses_moves_until_rehomed() {
    let mut r = moving_rig(test_config());
    trip_max_switch(&mut r);
    r.run(1);
    assert_eq!(r.status().state, SystemState::Error);

    let here = r.status().current_position;
    assert!(r.send(CommandKind::MoveAbsolute { target: 1000 }));
    assert!(r.send(CommandKind::MoveRelative { delta: -100 }));
    r.run(50);
    assert_eq!(r.status().state, SystemState::Error);
    assert_eq!(r.status().current_position, here);

    r.sim.set_switches(Some(-1000), Some(3050));
    r.home();
    let s = r.status();
    assert_eq!(s.faults, FaultFlags::empty());
    assert_eq!(s.current_position, 2000);

    assert!(r.send(CommandKind::MoveAbsolute { target: 1000 }));
    assert!(r.settle());
    assert_eq!(r.status().current_position, 1000);
}

#[test]
fn decelerate_action_ramps_down_past_switch() {
    let mut config = test_config();
    config.engine.limit_action = LimitAction::Decelerate;
    let mut r = moving_rig(config);
    trip_max_switch(&mut r);
    r.run(1);

    let s = r.status();
    assert_eq!(s.state, SystemState::Error);
    assert!(s.faults.contains(FaultFlags::LIMIT_MAX));
    assert!(s.current_speed > 0.0);

    assert!(r.settle());
    let end = r.status();
    assert_eq!(end.state, SystemState::Error);
    assert!(end.current_position > s.current_position);
    assert!(end.current_position < 3900);
}

#[test]
fn emergency_stop_latches_until_home() {
    let mut r = moving_rig(test_config());
    assert!(r.send(CommandKind::EmergencyStop));
    r.run(1);
    let s = r.status();
    assert_eq!(s.state, SystemState::EmergencyStop);
    assert!(s.faults.contains(FaultFlags::EMERGENCY_STOP));
    assert_eq!(s.current_speed, 0.0);
    assert!(!s.homed);

    for kind in [
        CommandKind::MoveAbsolute { target: 100 },
        CommandKind::Stop,
        CommandKind::Enable,
        CommandKind::MoveRelative { delta: 10 },
    ] {
        assert!(r.send(kind));
        r.run(1);
        assert_eq!(r.status().state, SystemState::EmergencyStop, "{kind:?}");
        assert_eq!(r.status().current_position, s.current_position);
    }

    r.home();
    assert_eq!(r.status().faults, FaultFlags::empty());
}

#[test]
fn emergency_stop_aborts_homing() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Home));
    r.run(500);
    assert!(r.send(CommandKind::EmergencyStop));
    r.run(1);
    let s = r.status();
    assert_eq!(s.state, SystemState::EmergencyStop);
    assert_eq!(s.current_speed, 0.0);
    assert_eq!(s.homing_progress, 0);
}

#[test]
fn drive_alarm_faults_and_blocks_homing_while_active() {
    let mut r = Rig::standard();
    r.home();
    r.sim.set_alarm(true);
    r.run(1);
    let s = r.status();
    assert_eq!(s.state, SystemState::Error);
    assert!(s.faults.contains(FaultFlags::DRIVE_ALARM));

    // Alarm still asserted: homing fails straight away.
    assert!(r.send(CommandKind::Home));
    assert!(r.run_until(5, |s| s.state == SystemState::Homing));
    assert!(r.run_until(5, |s| s.state == SystemState::Error));
    assert!(r.status().faults.contains(FaultFlags::HOMING_FAILED));

    r.sim.set_alarm(false);
    r.home();
    assert_eq!(r.status().faults, FaultFlags::empty());
}

#[test]
fn stalled_motor_trips_following_error() {
    let mut r = Rig::standard();
    r.home();
    r.sim.set_stalled(true);
    let stalled_at = r.sim.position();
    assert!(r.send(CommandKind::MoveAbsolute { target: 3900 }));
    assert!(r.run_until(2000, |s| s.state == SystemState::Error));

    let s = r.status();
    assert!(s.faults.contains(FaultFlags::FOLLOWING_ERROR));
    assert_eq!(s.current_speed, 0.0);
    // Commanded position resynchronized to where the motor actually is.
    assert_eq!(s.current_position, 2000);
    assert_eq!(r.sim.position(), stalled_at);

    r.sim.set_stalled(false);
    r.home();
    assert!(r.send(CommandKind::MoveAbsolute { target: 2500 }));
    assert!(r.settle());
    assert_eq!(r.status().current_position, 2500);
}

#[test]
fn following_error_check_can_be_disabled() {
    let mut config = test_config();
    config.engine.following_error_limit = 0;
    let mut r = Rig::new(config, test_axis());
    r.home();
    r.sim.set_stalled(true);
    let stalled_at = r.sim.position();
    assert!(r.send(CommandKind::MoveAbsolute { target: 2500 }));
    assert!(r.run_until(5000, |s| {
        s.state == SystemState::Ready && s.target_position == 2500
    }));
    r.run(10);

    // No fault, but the status shows where the motor really is.
    let s = r.status();
    assert_eq!(s.state, SystemState::Ready);
    assert_eq!(s.faults, FaultFlags::empty());
    assert_eq!(s.current_position, 2000);
    assert_eq!(s.distance_to_go(), 500);
    assert_eq!(r.sim.position(), stalled_at);
    assert_eq!(r.engine.position(), 2500);
    assert_eq!(r.engine.actual_position(), 2000);
}
