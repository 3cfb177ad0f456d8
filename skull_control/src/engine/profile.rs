//! S-curve velocity planner.
//!
//! Stateless per tick: every `step` looks only at the current position,
//! velocity, acceleration and target, so a new target simply replaces the
//! old one and the ramp continues from the present kinematic state.
//!
//! ## Shape
//! - Acceleration slews toward a `tanh`-eased demand at no more than the
//!   jerk limit `a / T`, both when speeding up and when braking, giving an
//!   S-shaped velocity ramp at either end of a move.
//! - Slowing down: the desired velocity follows a stopping curve planned at
//!   `k·d` with `k < 1` and a lead time for the braking jerk ramp, so
//!   `v²/(2·k·d) + v·T_lead/2` never exceeds the distance left. The curve's
//!   own slope is fed forward so the axis rides it without lagging behind.
//! - Every tick changes velocity by at most `max(accel, decel)·dt`.

use skull_common::control::motion::MotionProfile;

/// Fraction of the deceleration the stopping curve is planned with.
const BRAKE_MARGIN: f64 = 0.9;

/// Width of the acceleration knee [s]; also sets the jerk limit `a / T`.
const BLEND_TIME_S: f64 = 0.02;

/// Extra braking time the stopping curve reserves for the jerk ramp [s].
const BRAKE_LEAD_S: f64 = 0.04;

/// Position error below which the planner may snap onto the target [steps].
const SETTLE_DISTANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    /// Converge on `target` and stop there.
    Position,
    /// Hold a constant velocity.
    Velocity(f64),
}

#[derive(Debug, Clone)]
pub struct SCurvePlanner {
    position: f64,
    velocity: f64,
    acceleration: f64,
    target: i32,
    mode: Mode,
    profile: MotionProfile,
}

impl SCurvePlanner {
    /// At rest at `position`.
    pub fn new(position: i32, profile: MotionProfile) -> Self {
        Self {
            position: f64::from(position),
            velocity: 0.0,
            acceleration: 0.0,
            target: position,
            mode: Mode::Position,
            profile,
        }
    }

    /// Commanded position, rounded to whole steps.
    #[inline]
    pub fn position(&self) -> i32 {
        self.position.round() as i32
    }

    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    #[inline]
    pub fn target(&self) -> i32 {
        self.target
    }

    #[inline]
    pub fn profile(&self) -> MotionProfile {
        self.profile
    }

    /// At rest exactly on the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.mode == Mode::Position && self.velocity == 0.0 && self.position == f64::from(self.target)
    }

    /// Retarget. The ramp continues from the current velocity.
    pub fn move_to(&mut self, target: i32, profile: MotionProfile) {
        self.mode = Mode::Position;
        self.target = target;
        self.profile = profile;
    }

    /// Run at constant `velocity` until told otherwise.
    pub fn jog(&mut self, velocity: f64, profile: MotionProfile) {
        self.mode = Mode::Velocity(velocity);
        self.profile = profile;
    }

    /// Drop to zero velocity on the spot.
    pub fn halt(&mut self) {
        let here = self.position();
        self.halt_at(here);
    }

    /// Drop to zero velocity and resynchronize to `position`.
    pub fn halt_at(&mut self, position: i32) {
        self.position = f64::from(position);
        self.velocity = 0.0;
        self.acceleration = 0.0;
        self.target = position;
        self.mode = Mode::Position;
    }

    /// Where the axis comes to rest when braking from the current state.
    ///
    /// Acceleration still pushing along the motion is ramped out at the
    /// braking jerk before the stopping curve takes over.
    pub fn stopping_point(&self) -> i32 {
        if self.velocity == 0.0 {
            return self.position();
        }
        let direction = self.velocity.signum();
        let jerk = self.braking_jerk();
        let mut speed = self.velocity.abs();
        let mut distance = 0.0;
        let pushing = self.acceleration * direction;
        if pushing > 0.0 {
            let ramp = pushing / jerk;
            distance += speed * ramp + pushing * ramp * ramp / 3.0;
            speed += pushing * pushing / (2.0 * jerk);
        }
        distance += self.braking_distance(speed);
        (self.position + direction * distance).round() as i32
    }

    /// Controlled stop: retarget to the stopping point.
    pub fn stop(&mut self) {
        self.target = self.stopping_point();
        self.mode = Mode::Position;
    }

    /// Shift the coordinate frame so that `origin` becomes zero.
    pub fn rebase(&mut self, origin: i32) {
        self.position -= f64::from(origin);
        self.target -= origin;
    }

    /// Advance one period of `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        match self.mode {
            Mode::Position => {
                let err = f64::from(self.target) - self.position;
                if err.abs() < SETTLE_DISTANCE
                    && self.velocity.abs() <= self.profile.deceleration * dt
                    && self.acceleration.abs() <= self.braking_jerk() * dt
                {
                    self.position = f64::from(self.target);
                    self.velocity = 0.0;
                    self.acceleration = 0.0;
                    return;
                }
                let braking = self.braking_speed(err.abs());
                let desired = err.signum() * self.profile.max_speed.min(braking);
                // On the stopping curve its slope is fed forward.
                let feed_forward = if braking < self.profile.max_speed {
                    let toward = (self.velocity * err.signum()).max(0.0);
                    -err.signum() * toward * self.brake_decel() / (braking + self.brake_offset())
                } else {
                    0.0
                };
                self.track(desired, feed_forward, dt);
            }
            Mode::Velocity(v) => {
                let desired = v.clamp(-self.profile.max_speed, self.profile.max_speed);
                self.track(desired, 0.0, dt);
            }
        }
        self.position += self.velocity * dt;
    }

    /// Slew the acceleration toward what closes on `desired`, within the
    /// jerk limit of the current regime.
    fn track(&mut self, desired: f64, feed_forward: f64, dt: f64) {
        let dv = desired - self.velocity;
        let slowing = feed_forward != 0.0
            || (self.velocity != 0.0 && dv != 0.0 && dv.signum() != self.velocity.signum());
        let limit = if slowing {
            self.profile.deceleration
        } else {
            self.profile.acceleration
        };
        let limit = limit.max(f64::EPSILON);
        let eased = limit * (dv / (limit * BLEND_TIME_S)).tanh();
        let demand = (feed_forward + eased).clamp(-limit, limit);
        let max_change = limit / BLEND_TIME_S * dt;
        self.acceleration += (demand - self.acceleration).clamp(-max_change, max_change);
        self.velocity += self.acceleration * dt;
    }

    /// Deceleration the stopping curve is planned with.
    #[inline]
    fn brake_decel(&self) -> f64 {
        BRAKE_MARGIN * self.profile.deceleration.max(f64::EPSILON)
    }

    /// Speed term of the stopping curve: `k·d·T_lead/2`.
    #[inline]
    fn brake_offset(&self) -> f64 {
        self.brake_decel() * BRAKE_LEAD_S / 2.0
    }

    #[inline]
    fn braking_jerk(&self) -> f64 {
        self.profile.deceleration.max(f64::EPSILON) / BLEND_TIME_S
    }

    /// Highest speed that can still stop within `distance`.
    fn braking_speed(&self, distance: f64) -> f64 {
        let offset = self.brake_offset();
        (offset * offset + 2.0 * self.brake_decel() * distance).sqrt() - offset
    }

    /// Distance the stopping curve needs from `speed`.
    fn braking_distance(&self, speed: f64) -> f64 {
        speed * (speed + 2.0 * self.brake_offset()) / (2.0 * self.brake_decel())
    }
}
