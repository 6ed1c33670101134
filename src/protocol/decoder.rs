//! # Wire Frame Decoder
//!
//! Decodes wire frames back into wheel powers, as the receiver does.

use super::encoder::wheel_power;
use super::frame::{Wheel, WireFrame, HALF_RANGE};
use crate::drive::kinematics::DriveCommand;
use crate::error::{Result, TeleopError};

/// Decode one byte into a wheel power (-1.0 to 1.0)
///
/// Bytes outside the wheel's band are clamped to full power.
pub fn decode_channel(byte: u8, wheel: Wheel) -> f32 {
    let offset = f32::from(byte) - f32::from(wheel.center());
    (offset / f32::from(HALF_RANGE)).clamp(-1.0, 1.0)
}

/// Decode a wire frame into a drive command
///
/// # Examples
///
/// ```
/// use mecanum_teleop::protocol::decoder::decode;
/// use mecanum_teleop::protocol::frame::WireFrame;
///
/// let cmd = decode(&WireFrame::new([255, 127, 129, 1]));
/// assert_eq!(cmd.right_back, 1.0);
/// assert_eq!(cmd.left_front, -1.0);
/// ```
pub fn decode(frame: &WireFrame) -> DriveCommand {
    let channel = |wheel: Wheel| decode_channel(frame.get(wheel), wheel);
    DriveCommand {
        left_front: channel(Wheel::LeftFront),
        left_back: channel(Wheel::LeftBack),
        right_front: channel(Wheel::RightFront),
        right_back: channel(Wheel::RightBack),
    }
}

/// Check that every byte lies in its wheel's band
///
/// # Errors
///
/// Returns `Protocol` error naming the first wheel whose byte is more than
/// [`HALF_RANGE`] away from its center. A receiver seeing this is most likely
/// reading frames with the wrong alignment or wheel order.
pub fn validate(frame: &WireFrame) -> Result<()> {
    for wheel in Wheel::WIRE_ORDER {
        let byte = frame.get(wheel);
        let distance = (i16::from(byte) - i16::from(wheel.center())).abs();
        if distance > i16::from(HALF_RANGE) {
            return Err(TeleopError::Protocol(format!(
                "{:?} byte {} outside {}±{}",
                wheel,
                byte,
                wheel.center(),
                HALF_RANGE
            )));
        }
    }
    Ok(())
}

/// Largest per-wheel difference between two commands.
pub fn max_channel_error(a: &DriveCommand, b: &DriveCommand) -> f32 {
    Wheel::WIRE_ORDER
        .iter()
        .map(|w| (wheel_power(a, *w) - wheel_power(b, *w)).abs())
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encoder::encode;

    #[test]
    fn test_decode_stop() {
        assert_eq!(decode(&WireFrame::STOP), DriveCommand::STOP);
    }

    #[test]
    fn test_decode_channel_endpoints() {
        assert_eq!(decode_channel(127, Wheel::LeftFront), 1.0);
        assert_eq!(decode_channel(1, Wheel::LeftFront), -1.0);
        assert_eq!(decode_channel(255, Wheel::LeftBack), 1.0);
        assert_eq!(decode_channel(129, Wheel::LeftBack), -1.0);
    }

    #[test]
    fn test_decode_out_of_band_clamps() {
        assert_eq!(decode_channel(200, Wheel::RightFront), 1.0);
        assert_eq!(decode_channel(0, Wheel::RightBack), -1.0);
    }

    #[test]
    fn test_round_trip_within_quantization_step() {
        let step = 1.0 / f32::from(HALF_RANGE);
        for i in -200..=200 {
            let v = i as f32 / 200.0;
            let cmd = DriveCommand::new(v, -v, v * 0.5, -v * 0.25);
            let decoded = decode(&encode(&cmd));
            assert!(
                max_channel_error(&cmd, &decoded) <= step,
                "{:?} -> {:?}",
                cmd,
                decoded
            );
        }
    }

    #[test]
    fn test_validate_accepts_encoded_frames() {
        for i in -10..=10 {
            let v = i as f32 / 10.0;
            let frame = encode(&DriveCommand::new(v, v, -v, -v));
            assert!(validate(&frame).is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_swapped_order() {
        // Front byte where a back byte belongs
        let frame = WireFrame::new([64, 192, 192, 64]);
        match validate(&frame) {
            Err(TeleopError::Protocol(msg)) => assert!(msg.contains("RightBack")),
            other => panic!("Expected Protocol error, got: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_and_128() {
        assert!(validate(&WireFrame::new([192, 0, 192, 64])).is_err());
        assert!(validate(&WireFrame::new([128, 64, 192, 64])).is_err());
    }
}
