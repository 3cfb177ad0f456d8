//! Move execution: clamping, retargeting, idempotence, queue behaviour.

use skull_common::prelude::*;

use super::support::{Rig, test_axis, test_config};

#[test]
fn targets_are_clamped_to_discovered_limits() {
    let mut r = Rig::standard();
    r.home();

    assert!(r.send(CommandKind::MoveAbsolute { target: 10_000 }));
    r.run(1);
    assert_eq!(r.status().target_position, 3950);
    assert!(r.settle());
    assert_eq!(r.status().current_position, 3950);

    assert!(r.send(CommandKind::MoveAbsolute { target: -5 }));
    r.run(1);
    assert_eq!(r.status().target_position, 50);
    assert!(r.settle());
    assert_eq!(r.status().current_position, 50);
    assert_eq!(r.status().state, SystemState::Ready);
}

#[test]
fn accepted_targets_always_within_limits() {
    let mut r = Rig::standard();
    r.home();
    for target in [i32::MIN, -1, 0, 49, 50, 1234, 3950, 3951, i32::MAX] {
        assert!(r.send(CommandKind::MoveAbsolute { target }));
        r.run(1);
        let s = r.status();
        assert!(
            s.position_limits.contains(s.target_position),
            "target {target} → {}",
            s.target_position
        );
    }
}

#[test]
fn repeated_target_after_settle_does_not_move() {
    let mut r = Rig::standard();
    r.home();
    assert!(r.send(CommandKind::MoveAbsolute { target: 3000 }));
    assert!(r.settle());
    let steps = r.sim.steps_travelled();

    assert!(r.send(CommandKind::MoveAbsolute { target: 3000 }));
    r.run(500);
    assert_eq!(r.sim.steps_travelled(), steps);
    assert_eq!(r.status().current_position, 3000);
    assert_eq!(r.status().state, SystemState::Ready);
}

#[test]
fn move_relative_is_relative_to_commanded_target() {
    let mut r = Rig::standard();
    r.home();
    assert!(r.send(CommandKind::MoveAbsolute { target: 3000 }));
    r.run(100);
    let mid = r.status();
    assert!(mid.current_position > 2000 && mid.current_position < 3000);

    assert!(r.send(CommandKind::MoveRelative { delta: -500 }));
    r.run(1);
    assert_eq!(r.status().target_position, 2500);
    assert!(r.settle());
    assert_eq!(r.status().current_position, 2500);
}

#[test]
fn retarget_mid_move_keeps_velocity_continuous() {
    let mut r = Rig::standard();
    r.home();
    let bound = test_config().motion.acceleration * 0.001 + 1e-6;

    assert!(r.send(CommandKind::MoveAbsolute { target: 3900 }));
    let mut last = r.status().current_speed;
    for i in 0..3000 {
        match i {
            150 => assert!(r.send(CommandKind::MoveAbsolute { target: 100 })),
            400 => assert!(r.send(CommandKind::MoveAbsolute { target: 3000 })),
            410 => assert!(r.send(CommandKind::MoveAbsolute { target: 2900 })),
            _ => {}
        }
        r.tick();
        let v = r.status().current_speed;
        assert!((v - last).abs() <= bound, "tick {i}: {last} → {v}");
        last = v;
    }
    assert!(r.settle());
    assert_eq!(r.status().current_position, 2900);
}

#[test]
fn speed_override_caps_velocity() {
    let mut r = Rig::standard();
    r.home();
    let kind = CommandKind::MoveAbsolute { target: 3900 };
    assert!(r.bus.submit(r.bus.command_with(kind, ProfileOverride::new(800.0, 2000.0))));
    let mut peak: f64 = 0.0;
    let done = r.run_until(30_000, |s| {
        peak = peak.max(s.current_speed.abs());
        s.state == SystemState::Ready && s.current_position == 3900
    });
    assert!(done);
    assert!(peak <= 800.0 + 1e-6, "peak {peak}");
    assert!(peak > 700.0);
}

#[test]
fn moves_before_homing_use_configured_limits() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::MoveAbsolute { target: 5000 }));
    r.run(1);
    assert_eq!(r.status().state, SystemState::Moving);
    assert_eq!(r.status().target_position, 800);
    assert!(r.settle());
    assert_eq!(r.status().current_position, 800);
    assert_eq!(r.status().state, SystemState::NotHomed);
}

#[test]
fn disabled_drive_rejects_moves() {
    let mut r = Rig::standard();
    assert!(r.send(CommandKind::Disable));
    assert!(r.send(CommandKind::MoveAbsolute { target: 400 }));
    r.run(50);
    let s = r.status();
    assert!(!s.enabled);
    assert_eq!(s.current_position, 0);
    assert_eq!(s.state, SystemState::NotHomed);
    assert!(!r.sim.is_enabled());

    assert!(r.send(CommandKind::Enable));
    assert!(r.send(CommandKind::MoveAbsolute { target: 400 }));
    r.run(2);
    assert!(r.settle());
    assert_eq!(r.status().current_position, 400);
}

#[test]
fn stop_brakes_short_of_target() {
    let mut r = Rig::standard();
    r.home();
    assert!(r.send(CommandKind::MoveAbsolute { target: 3900 }));
    r.run(300);
    let at_stop = r.status().current_position;
    assert!(r.send(CommandKind::Stop));
    assert!(r.settle());
    let end = r.status().current_position;
    assert!(end > at_stop && end < 3900, "{at_stop} → {end}");
    assert_eq!(r.status().state, SystemState::Ready);
}

#[test]
fn commands_apply_one_per_tick_in_order() {
    let mut r = Rig::standard();
    r.run(1);
    let ids: Vec<u32> = (0..3)
        .map(|i| {
            let cmd = r.bus.command(CommandKind::MoveAbsolute { target: 100 * (i + 1) });
            assert!(r.bus.submit(cmd));
            cmd.id()
        })
        .collect();
    for (i, id) in ids.iter().enumerate() {
        r.run(1);
        let s = r.status();
        assert_eq!(s.last_command_id, *id);
        assert_eq!(s.target_position, 100 * (i as i32 + 1));
    }
}

#[test]
fn full_queue_rejects_without_blocking() {
    let mut config = test_config();
    config.engine.queue_capacity = 4;
    let mut r = Rig::new(config, test_axis());
    for i in 0..4 {
        assert!(r.send(CommandKind::MoveAbsolute { target: i }), "slot {i}");
    }
    assert!(!r.send(CommandKind::MoveAbsolute { target: 99 }));
    assert_eq!(r.bus.queue().dropped(), 1);

    r.run(1);
    assert!(r.send(CommandKind::MoveAbsolute { target: 99 }));
    assert_eq!(r.bus.queue().len(), 4);
}

#[test]
fn engine_handle_reports_status() {
    let mut r = Rig::standard();
    let handle = r.engine.handle();
    assert!(!handle.is_homed());
    r.home();
    assert!(handle.is_homed());
    assert!(!handle.is_moving());
    assert!(!handle.is_limit_fault_active());
    assert_eq!(handle.position_limits(), PositionLimits::new(50, 3950));
    assert!(handle.send(CommandKind::MoveAbsolute { target: 3000 }));
    r.run(2);
    assert!(handle.is_moving());
    assert!(handle.status().distance_to_go() > 0);
}
