//! # Drive Kinematics Module
//!
//! Converts three joystick axes into four mecanum wheel powers.
//!
//! ## Pipeline
//!
//! 1. **Deadzone** on each input axis separately, before mixing
//! 2. **Mix** with the mecanum inverse kinematics:
//!
//! ```text
//! leftFront  = speed + strafe + turn
//! leftBack   = speed - strafe + turn
//! rightFront = speed - strafe - turn
//! rightBack  = speed + strafe - turn
//! ```
//!
//! 3. **Peak normalization**: divide all wheels by
//!    `max(|lf|, |lb|, |rf|, |rb|, 1)`, keeping the ratio between wheels
//! 4. **Scale** by the configured max speed
//!
//! ## Usage
//!
//! ```
//! use mecanum_teleop::drive::kinematics::compute_wheel_powers;
//!
//! let cmd = compute_wheel_powers(1.0, 0.0, 0.0, 0.08, 0.8);
//! assert_eq!(cmd.left_front, 0.8);
//! assert_eq!(cmd.right_back, 0.8);
//! ```

/// Power for each wheel, each in [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveCommand {
    pub left_front: f32,
    pub left_back: f32,
    pub right_front: f32,
    pub right_back: f32,
}

impl DriveCommand {
    /// All wheels stopped.
    pub const STOP: DriveCommand = DriveCommand {
        left_front: 0.0,
        left_back: 0.0,
        right_front: 0.0,
        right_back: 0.0,
    };

    #[must_use]
    pub fn new(left_front: f32, left_back: f32, right_front: f32, right_back: f32) -> Self {
        Self {
            left_front,
            left_back,
            right_front,
            right_back,
        }
    }

    /// Wheel powers as `[left_front, left_back, right_front, right_back]`.
    #[must_use]
    pub fn to_array(&self) -> [f32; 4] {
        [self.left_front, self.left_back, self.right_front, self.right_back]
    }

    /// Largest wheel magnitude.
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.to_array().iter().fold(0.0_f32, |acc, v| acc.max(v.abs()))
    }

    fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(
            f(self.left_front),
            f(self.left_back),
            f(self.right_front),
            f(self.right_back),
        )
    }
}

/// Zeroes `value` if its magnitude is strictly below `deadzone`.
///
/// Values at or above the threshold pass through unchanged (no rescaling).
///
/// # Examples
///
/// ```
/// use mecanum_teleop::drive::kinematics::apply_deadzone;
///
/// assert_eq!(apply_deadzone(0.05, 0.08), 0.0);
/// assert_eq!(apply_deadzone(-0.05, 0.08), 0.0);
/// assert_eq!(apply_deadzone(0.08, 0.08), 0.08);
/// assert_eq!(apply_deadzone(-0.5, 0.08), -0.5);
/// ```
#[must_use]
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone.abs() {
        0.0
    } else {
        value
    }
}

/// Raw mecanum mix, before normalization.
#[must_use]
pub fn mix(speed: f32, strafe: f32, turn: f32) -> DriveCommand {
    DriveCommand::new(
        speed + strafe + turn,
        speed - strafe + turn,
        speed - strafe - turn,
        speed + strafe - turn,
    )
}

/// Computes wheel powers from stick axes.
///
/// # Arguments
///
/// * `speed` - Forward/back (-1.0 to 1.0, forward positive)
/// * `strafe` - Left/right (-1.0 to 1.0, right positive)
/// * `turn` - Rotation (-1.0 to 1.0, clockwise positive)
/// * `deadzone` - Per-axis threshold (>= 0.0)
/// * `max_speed` - Output scale (0.0 exclusive to 1.0)
///
/// # Returns
///
/// A [`DriveCommand`] with every wheel in `[-max_speed, max_speed]`.
/// Non-finite inputs are treated as centred.
///
/// # Examples
///
/// ```
/// use mecanum_teleop::drive::kinematics::compute_wheel_powers;
///
/// // Forward + strafe right saturates two wheels; ratios are kept
/// let cmd = compute_wheel_powers(1.0, 1.0, 0.0, 0.0, 1.0);
/// assert_eq!(cmd.to_array(), [1.0, 0.0, 0.0, 1.0]);
/// ```
#[must_use]
pub fn compute_wheel_powers(
    speed: f32,
    strafe: f32,
    turn: f32,
    deadzone: f32,
    max_speed: f32,
) -> DriveCommand {
    let sanitize = |v: f32| if v.is_finite() { apply_deadzone(v, deadzone) } else { 0.0 };

    let raw = mix(sanitize(speed), sanitize(strafe), sanitize(turn));

    let peak = raw.peak().max(1.0);
    raw.map(|v| v / peak * max_speed)
}

/// Returns true if any wheel differs between two commands.
///
/// # Examples
///
/// ```
/// use mecanum_teleop::drive::kinematics::{did_change, DriveCommand};
///
/// let a = DriveCommand::STOP;
/// let b = DriveCommand::new(0.1, 0.1, 0.1, 0.1);
/// assert!(did_change(&a, &b));
/// assert!(!did_change(&b, &b));
/// ```
#[must_use]
pub fn did_change(previous: &DriveCommand, current: &DriveCommand) -> bool {
    previous != current
}
