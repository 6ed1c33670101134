//! # Wire Frame Encoder
//!
//! Encodes drive commands into 4-byte wire frames.

use super::frame::{Wheel, WireFrame, HALF_RANGE};
use crate::drive::kinematics::DriveCommand;

/// Power of `wheel` in a drive command.
pub(crate) fn wheel_power(command: &DriveCommand, wheel: Wheel) -> f32 {
    match wheel {
        Wheel::RightBack => command.right_back,
        Wheel::RightFront => command.right_front,
        Wheel::LeftBack => command.left_back,
        Wheel::LeftFront => command.left_front,
    }
}

/// Encode one wheel power into its byte
///
/// `byte = round(power * 63 + center)`, clamped to 0-255. Non-finite powers
/// encode as the wheel's center (stopped).
///
/// # Examples
///
/// ```
/// use mecanum_teleop::protocol::encoder::encode_channel;
/// use mecanum_teleop::protocol::frame::Wheel;
///
/// assert_eq!(encode_channel(0.0, Wheel::LeftFront), 64);
/// assert_eq!(encode_channel(1.0, Wheel::LeftFront), 127);
/// assert_eq!(encode_channel(-1.0, Wheel::RightBack), 129);
/// ```
pub fn encode_channel(power: f32, wheel: Wheel) -> u8 {
    if !power.is_finite() {
        return wheel.center();
    }
    let value = (power * f32::from(HALF_RANGE) + f32::from(wheel.center())).round();
    value.clamp(0.0, 255.0) as u8
}

/// Encode a drive command into a wire frame
///
/// # Arguments
///
/// * `command` - Wheel powers (-1.0 to 1.0)
///
/// # Returns
///
/// * `WireFrame` - Bytes in order right back, right front, left back, left front
///
/// # Examples
///
/// ```
/// use mecanum_teleop::drive::kinematics::DriveCommand;
/// use mecanum_teleop::protocol::encoder::encode;
///
/// let frame = encode(&DriveCommand::new(1.0, 1.0, 1.0, 1.0));
/// assert_eq!(frame.as_bytes(), &[255, 127, 255, 127]);
/// ```
pub fn encode(command: &DriveCommand) -> WireFrame {
    let mut frame = WireFrame::STOP;
    for wheel in Wheel::WIRE_ORDER {
        frame.set(wheel, encode_channel(wheel_power(command, wheel), wheel));
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::{BACK_CENTER, FRONT_CENTER};

    #[test]
    fn test_encode_stop() {
        assert_eq!(encode(&DriveCommand::STOP), WireFrame::STOP);
    }

    #[test]
    fn test_encode_full_reverse() {
        let frame = encode(&DriveCommand::new(-1.0, -1.0, -1.0, -1.0));
        assert_eq!(frame.as_bytes(), &[129, 1, 129, 1]);
    }

    #[test]
    fn test_encode_channel_order() {
        // Distinct powers per wheel to pin each byte to its wheel
        let cmd = DriveCommand {
            left_front: 1.0,
            left_back: -1.0,
            right_front: 0.0,
            right_back: 0.5,
        };
        let frame = encode(&cmd);
        assert_eq!(frame.get(Wheel::RightBack), 224); // round(31.5 + 192)
        assert_eq!(frame.get(Wheel::RightFront), FRONT_CENTER);
        assert_eq!(frame.get(Wheel::LeftBack), 129);
        assert_eq!(frame.get(Wheel::LeftFront), 127);
        assert_eq!(frame.as_bytes(), &[224, 64, 129, 127]);
    }

    #[test]
    fn test_encode_rounds_to_nearest() {
        // 0.3 * 63 = 18.9 -> 19
        assert_eq!(encode_channel(0.3, Wheel::LeftFront), 83);
        // -0.3 * 63 = -18.9 -> -19
        assert_eq!(encode_channel(-0.3, Wheel::LeftFront), 45);
    }

    #[test]
    fn test_encode_clamps_overshoot() {
        assert_eq!(encode_channel(1.5, Wheel::RightBack), 255);
        assert_eq!(encode_channel(-1.5, Wheel::RightBack), 98);
        assert_eq!(encode_channel(-3.0, Wheel::LeftFront), 0);
        assert_eq!(encode_channel(100.0, Wheel::LeftFront), 255);
    }

    #[test]
    fn test_encode_non_finite_is_stop() {
        assert_eq!(encode_channel(f32::NAN, Wheel::LeftFront), FRONT_CENTER);
        assert_eq!(encode_channel(f32::INFINITY, Wheel::RightBack), BACK_CENTER);
    }

    #[test]
    fn test_encode_monotonic_per_channel() {
        for wheel in Wheel::WIRE_ORDER {
            let mut previous = encode_channel(-1.0, wheel);
            for i in -1000..=1000 {
                let byte = encode_channel(i as f32 / 1000.0, wheel);
                assert!(byte >= previous, "{:?} not monotonic at {}", wheel, i);
                previous = byte;
            }
        }
    }

    #[test]
    fn test_front_and_back_ranges() {
        for i in -100..=100 {
            let v = i as f32 / 100.0;
            let front = encode_channel(v, Wheel::RightFront);
            let back = encode_channel(v, Wheel::RightBack);
            assert!((1..=127).contains(&front), "front {} -> {}", v, front);
            assert!(back >= 129, "back {} -> {}", v, back);
        }
    }
}
