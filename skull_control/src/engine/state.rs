//! Engine lifecycle state machine.
//!
//! `Init → NotHomed ⇄ Homing → Ready ⇄ Moving`. Any state goes to `Error`
//! on a fault and to `EmergencyStop` on an emergency command; both are left
//! only through a successful homing run.

use skull_common::control::status::SystemState;

/// Events that drive the engine state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// First tick ran.
    Boot,
    StartHoming,
    HomingComplete,
    HomingFailed,
    /// Homing interrupted by `Stop` or `Disable`.
    HomingCancelled,
    StartMotion,
    MotionSettled,
    /// Limit switch, drive alarm or following error.
    Fault,
    EmergencyStop,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineTransition {
    Ok(SystemState),
    Rejected(&'static str),
}

#[derive(Debug, Clone)]
pub struct EngineStateMachine {
    state: SystemState,
    homed: bool,
}

impl EngineStateMachine {
    pub const fn new() -> Self {
        Self {
            state: SystemState::Init,
            homed: false,
        }
    }

    #[inline]
    pub const fn state(&self) -> SystemState {
        self.state
    }

    /// A homing run has completed and no fault has occurred since.
    #[inline]
    pub const fn is_homed(&self) -> bool {
        self.homed
    }

    #[inline]
    pub const fn is_moving(&self) -> bool {
        matches!(self.state, SystemState::Moving | SystemState::Homing)
    }

    pub fn handle_event(&mut self, event: EngineEvent) -> EngineTransition {
        use EngineEvent as E;
        use SystemState as S;

        let next = match (self.state, event) {
            (S::Init, E::Boot) => S::NotHomed,

            (S::Homing, E::StartHoming) => {
                return EngineTransition::Rejected("homing already active");
            }
            // Home is accepted everywhere else, including Error and EmergencyStop.
            (_, E::StartHoming) => {
                self.homed = false;
                S::Homing
            }
            (S::Homing, E::HomingComplete) => {
                self.homed = true;
                S::Ready
            }
            (S::Homing, E::HomingFailed) => S::Error,
            (S::Homing, E::HomingCancelled) => S::NotHomed,

            (S::Error | S::EmergencyStop, E::StartMotion) => {
                return EngineTransition::Rejected("faulted: home required");
            }
            (S::Homing, E::StartMotion) => {
                return EngineTransition::Rejected("homing in progress");
            }
            (S::NotHomed | S::Ready | S::Moving, E::StartMotion) => S::Moving,
            (S::Moving, E::MotionSettled) => {
                if self.homed {
                    S::Ready
                } else {
                    S::NotHomed
                }
            }

            (S::EmergencyStop, E::Fault) => {
                return EngineTransition::Rejected("emergency stop latched");
            }
            (_, E::Fault) => {
                self.homed = false;
                S::Error
            }
            (_, E::EmergencyStop) => {
                self.homed = false;
                S::EmergencyStop
            }

            _ => return EngineTransition::Rejected("invalid transition"),
        };

        self.state = next;
        EngineTransition::Ok(next)
    }
}

impl Default for EngineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
