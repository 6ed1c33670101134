//! # Drive Module
//!
//! Mecanum drivetrain math.
//!
//! This module handles:
//! - Per-axis deadzone on the operator's stick inputs
//! - Mixing speed/strafe/turn into four wheel powers
//! - Peak normalization and max-speed scaling
//! - Detecting when the commanded wheel powers change

pub mod kinematics;
