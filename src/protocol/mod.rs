//! # Wire Protocol Module
//!
//! Fixed 4-byte frame format understood by the robot-side receiver.
//!
//! This module handles:
//! - Frame layout and constants
//! - Encoding drive commands into frames
//! - Decoding and validating frames (receiver side and tests)

pub mod decoder;
pub mod encoder;
pub mod frame;
