//! Fault flags published by the motion engine.
//!
//! Faults never propagate as `Err` out of a tick. They are latched here and
//! read by every status consumer; `Home` is the only way to clear them.

use bitflags::bitflags;

bitflags! {
    /// Latched engine faults.
    ///
    /// LIMIT_* and DRIVE_ALARM / FOLLOWING_ERROR move the engine to `Error`.
    /// HOMING_* record why the last homing run failed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u16 {
        /// Min-side limit switch triggered outside an expected homing edge.
        const LIMIT_MIN        = 0x0001;
        /// Max-side limit switch triggered outside an expected homing edge.
        const LIMIT_MAX        = 0x0002;
        /// Drive alarm input active.
        const DRIVE_ALARM      = 0x0004;
        /// Actual position lost track of the commanded position.
        const FOLLOWING_ERROR  = 0x0008;
        /// Homing aborted.
        const HOMING_FAILED    = 0x0010;
        /// A homing phase ran out of time.
        const HOMING_TIMEOUT   = 0x0020;
        /// Discovered travel is shorter than the usable minimum.
        const RANGE_TOO_SMALL  = 0x0040;
        /// Emergency stop command received.
        const EMERGENCY_STOP   = 0x0080;
    }
}

impl FaultFlags {
    /// Limit switch faults.
    pub const LIMIT_MASK: Self =
        Self::from_bits_truncate(Self::LIMIT_MIN.bits() | Self::LIMIT_MAX.bits());

    /// Faults reported by the drive itself.
    pub const DRIVE_MASK: Self =
        Self::from_bits_truncate(Self::DRIVE_ALARM.bits() | Self::FOLLOWING_ERROR.bits());

    /// Faults describing a failed homing run.
    pub const HOMING_MASK: Self = Self::from_bits_truncate(
        Self::HOMING_FAILED.bits() | Self::HOMING_TIMEOUT.bits() | Self::RANGE_TOO_SMALL.bits(),
    );

    #[inline]
    pub const fn has_limit_fault(&self) -> bool {
        self.intersects(Self::LIMIT_MASK)
    }

    #[inline]
    pub const fn has_drive_fault(&self) -> bool {
        self.intersects(Self::DRIVE_MASK)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}
