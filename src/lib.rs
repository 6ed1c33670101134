//! # Mecanum Teleop Library
//!
//! Drive a mecanum-wheeled robot from a game controller over TCP.
//!
//! This library provides the teleop pipeline: controller profiles normalize
//! heterogeneous gamepads into logical controls, drive kinematics turn three
//! stick axes into four wheel powers, and the command link streams 4-byte
//! wire frames to the robot, reconnecting on failure.

pub mod config;
pub mod control_loop;
pub mod controller;
pub mod drive;
pub mod error;
pub mod link;
pub mod protocol;
