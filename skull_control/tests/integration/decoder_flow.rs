//! Frames on the universe driving the engine through the decoder.

use skull_common::prelude::*;

use super::support::{Rig, test_axis, test_config};

const CONTROL_MID: [u8; 5] = [128, 0, 255, 255, 200];
const HOME: [u8; 5] = [128, 0, 128, 128, 255];

/// Tick until the published position is `target` and the axis is at rest.
fn arrive(r: &mut Rig, target: i32) -> bool {
    r.run_until(20_000, |s| {
        s.current_position == target && s.target_position == target && !s.is_moving()
    })
}

#[test]
fn control_frame_positions_axis_inside_discovered_limits() {
    let mut r = Rig::standard();
    r.home();
    r.frame(CONTROL_MID);
    assert_eq!(r.decoder_handle().current_mode(), ControlMode::Control);
    assert_eq!(r.decoder_handle().link_state(), LinkState::Up);
    assert!(arrive(&mut r, 2008));
    assert_eq!(r.status().link, LinkState::Up);
    assert_eq!(r.decoder_handle().channel_snapshot(), CONTROL_MID);

    r.frame([255, 0, 255, 255, 200]);
    assert!(arrive(&mut r, 3950));
    r.frame([0, 0, 255, 255, 200]);
    assert!(arrive(&mut r, 50));
}

#[test]
fn home_mode_sends_exactly_one_home() {
    let mut r = Rig::standard();
    let handle = r.decoder_handle();
    let mut homed = false;
    for _ in 0..8000 {
        r.frame(HOME);
        if r.status().homed {
            homed = true;
            break;
        }
    }
    assert!(homed, "homing never completed: {:?}", r.status());
    assert_eq!(handle.current_mode(), ControlMode::Home);

    // Still holding the Home value: nothing more is sent.
    r.hold_frame(HOME, 2000);
    assert_eq!(handle.stats().commands_emitted, 1);
    assert_eq!(r.status().state, SystemState::Ready);
}

#[test]
fn two_home_frames_are_not_enough() {
    let mut r = Rig::standard();
    r.frame(HOME);
    r.frame(HOME);
    r.frame(CONTROL_MID);
    r.run(50);
    assert_ne!(r.status().state, SystemState::Homing);
    assert_eq!(r.decoder_handle().current_mode(), ControlMode::Control);
}

#[test]
fn control_during_homing_waits_until_homing_ends() {
    let mut r = Rig::standard();
    for _ in 0..3 {
        r.frame(HOME);
    }
    r.run(1);
    assert_eq!(r.status().state, SystemState::Homing);

    // Switching to Control mid-run neither cancels nor retargets homing.
    let mut homed = false;
    for _ in 0..8000 {
        r.frame(CONTROL_MID);
        let s = r.status();
        if s.homed {
            homed = true;
            break;
        }
        assert_eq!(s.state, SystemState::Homing);
    }
    assert!(homed);
    assert_eq!(r.status().position_limits, PositionLimits::new(50, 3950));
    assert!(arrive(&mut r, 2008));
    assert_eq!(r.decoder_handle().stats().commands_emitted, 2);
}

#[test]
fn link_loss_freezes_decoder() {
    let mut r = Rig::standard();
    r.home();
    r.frame(CONTROL_MID);
    assert!(arrive(&mut r, 2008));

    // No new frames: the link drops after the 5 s timeout.
    assert!(r.run_until(6000, |s| s.link == LinkState::Down));
    assert_eq!(r.decoder_handle().link_state(), LinkState::Down);

    let accepted = r.bus.queue().accepted();
    r.run(3000);
    assert_eq!(r.bus.queue().accepted(), accepted);
    assert_eq!(r.status().current_position, 2008);

    r.frame([255, 0, 255, 255, 200]);
    assert_eq!(r.status().link, LinkState::Up);
    assert!(arrive(&mut r, 3950));
}

#[test]
fn corrupt_frames_are_ignored() {
    let mut r = Rig::standard();
    r.home();
    r.frame(CONTROL_MID);
    assert!(arrive(&mut r, 2008));

    let before = r.decoder_handle().stats();
    r.frame([255; 5]);
    for _ in 0..3 {
        r.frame([0, 0, 0, 0, 255]);
    }
    r.run(500);

    let stats = r.decoder_handle().stats();
    assert_eq!(stats.frames_corrupt - before.frames_corrupt, 4);
    assert_eq!(stats.frames_total - before.frames_total, 4);
    assert_eq!(r.decoder_handle().channel_snapshot(), CONTROL_MID);
    assert_eq!(r.decoder_handle().current_mode(), ControlMode::Control);
    assert_eq!(r.status().current_position, 2008);
    assert_eq!(r.status().state, SystemState::Ready);
}

#[test]
fn sixteen_bit_position_survives_stuck_low_byte() {
    let mut r = Rig::standard();
    r.decoder_handle().set_16bit_position_mode(true);
    r.home();

    r.frame([0x80, 0x40, 255, 255, 200]);
    assert!(arrive(&mut r, 2004));

    r.frame([0x80, 0x00, 255, 255, 200]);
    r.run(500);
    let s = r.status();
    assert_eq!(s.target_position, 2004);
    assert_eq!(s.current_position, 2004);
}

#[test]
fn stop_mode_brakes_short() {
    let mut r = Rig::standard();
    r.home();
    r.frame([255, 0, 255, 255, 200]);
    r.run(300);
    assert_eq!(r.status().state, SystemState::Moving);

    r.frame([255, 0, 255, 255, 50]);
    assert_eq!(r.decoder_handle().current_mode(), ControlMode::Stop);
    assert!(r.settle());
    let stopped = r.status().current_position;
    assert!(stopped > 2000 && stopped < 3950, "stopped at {stopped}");

    // Stop mode holds: the cached position byte is not acted on.
    r.run(2000);
    assert_eq!(r.status().current_position, stopped);
}

#[test]
fn disabled_decoder_sends_nothing() {
    let mut r = Rig::standard();
    r.home();
    let handle = r.decoder_handle();
    handle.set_enabled(false);
    r.frame(CONTROL_MID);
    r.run(100);
    assert_eq!(handle.stats().commands_emitted, 0);
    assert_eq!(handle.link_state(), LinkState::Down);
    assert_eq!(r.status().current_position, 2000);

    handle.set_enabled(true);
    r.frame(CONTROL_MID);
    assert!(arrive(&mut r, 2008));
}

#[test]
fn base_channel_and_timeout_setters_check_range() {
    let handle = Rig::standard().decoder_handle();
    assert!(!handle.set_base_channel(0));
    assert!(!handle.set_base_channel(509));
    assert!(handle.set_base_channel(508));
    assert_eq!(handle.base_channel(), 508);
    assert!(!handle.set_timeout(99));
    assert!(!handle.set_timeout(60_001));
    assert!(handle.set_timeout(250));
    assert_eq!(handle.timeout_ms(), 250);
}

#[test]
fn stalled_axis_is_resent_its_target() {
    let mut config = test_config();
    config.engine.following_error_limit = 0;
    let mut r = Rig::new(config, test_axis());
    r.home();
    r.sim.set_stalled(true);
    r.frame(CONTROL_MID);
    assert!(r.run_until(5000, |s| s.target_position == 2008 && !s.is_moving()));

    // The motor never left 2000, so each decoder tick asks again.
    let handle = r.decoder_handle();
    let before = handle.stats().commands_emitted;
    r.hold_frame(CONTROL_MID, 200);
    assert_eq!(r.status().current_position, 2000);
    assert!(handle.stats().commands_emitted >= before + 20);

    r.sim.set_stalled(false);
    assert!(arrive(&mut r, 2008));
    r.run(10);
    let settled = handle.stats().commands_emitted;
    r.hold_frame(CONTROL_MID, 500);
    assert_eq!(handle.stats().commands_emitted, settled);
}
