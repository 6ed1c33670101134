//! # Wire Frame Constants and Types
//!
//! Fixed protocol definitions shared with the robot-side receiver.
//!
//! ## Frame Layout
//!
//! Every control tick sends exactly 4 unsigned bytes, one per wheel:
//!
//! | Byte | Wheel | Center | Range |
//! |------|-------|--------|-------|
//! | 0 | Right back | 192 | 129-255 |
//! | 1 | Right front | 64 | 1-127 |
//! | 2 | Left back | 192 | 129-255 |
//! | 3 | Left front | 64 | 1-127 |
//!
//! Front wheels live in the low half of the byte range and back wheels in the
//! high half. This offset encoding is what the receiver decodes; it is a
//! protocol constant and must not be changed on one side only.

/// Number of bytes per frame
pub const FRAME_SIZE: usize = 4;

/// Byte value for a stopped front wheel
pub const FRONT_CENTER: u8 = 64;

/// Byte value for a stopped back wheel
pub const BACK_CENTER: u8 = 192;

/// Byte offset from center for full power
pub const HALF_RANGE: u8 = 63;

/// Default TCP port of the receiver
pub const DEFAULT_PORT: u16 = 9999;

/// Wheel carried by each frame position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    RightBack,
    RightFront,
    LeftBack,
    LeftFront,
}

impl Wheel {
    /// Canonical transmission order.
    pub const WIRE_ORDER: [Wheel; FRAME_SIZE] = [
        Wheel::RightBack,
        Wheel::RightFront,
        Wheel::LeftBack,
        Wheel::LeftFront,
    ];

    #[must_use]
    pub fn is_front(&self) -> bool {
        matches!(self, Wheel::RightFront | Wheel::LeftFront)
    }

    /// Byte that encodes zero power for this wheel.
    #[must_use]
    pub fn center(&self) -> u8 {
        if self.is_front() {
            FRONT_CENTER
        } else {
            BACK_CENTER
        }
    }

    /// Position of this wheel within a frame.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Wheel::RightBack => 0,
            Wheel::RightFront => 1,
            Wheel::LeftBack => 2,
            Wheel::LeftFront => 3,
        }
    }
}

/// One encoded drive command as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireFrame([u8; FRAME_SIZE]);

impl WireFrame {
    /// Frame for all wheels stopped.
    pub const STOP: WireFrame = WireFrame([BACK_CENTER, FRONT_CENTER, BACK_CENTER, FRONT_CENTER]);

    #[must_use]
    pub const fn new(bytes: [u8; FRAME_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw bytes in wire order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    /// Byte carrying `wheel`.
    #[must_use]
    pub fn get(&self, wheel: Wheel) -> u8 {
        self.0[wheel.offset()]
    }

    pub(crate) fn set(&mut self, wheel: Wheel, value: u8) {
        self.0[wheel.offset()] = value;
    }
}
