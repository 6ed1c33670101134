//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Controller profiles mapping physical layouts to logical controls
//! - Sampling logical controls with neutral fallback for unknown pads
//! - Reading evdev gamepads under `/dev/input`
//! - Attach/detach notifications for the control loop

pub mod device;
pub mod hotplug;
pub mod mapper;
pub mod profile;
