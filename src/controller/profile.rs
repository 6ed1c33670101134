//! # Controller Profile Module
//!
//! Maps physical gamepad layouts to a stable set of logical controls.
//!
//! Every gamepad model reports its buttons, axes and hats under its own raw
//! indices. A [`ControllerProfile`] records, for one device name, where each
//! [`LogicalControl`] lives. The [`ProfileRegistry`] holds all known profiles
//! and is looked up by the exact name the device reports.
//!
//! ## Built-in Profiles
//!
//! | Device name | Triggers | Right stick X |
//! |-------------|----------|---------------|
//! | Pro Controller | Buttons 7/8 | Axis 2 |
//! | Nintendo Switch Pro Controller | Buttons 7/8 | Axis 2 |
//! | Xbox One S Controller | Axes 4/5 | Axis 2 |
//! | Xbox 360 Controller | Axes 4/5 | Axis 3 |
//! | DualSense Wireless Controller | Axes 2/5 | Axis 3 |
//!
//! Vertical stick axes are mapped with [`AxisSign::Negative`] so that pushing
//! a stick up reads as a positive value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Device-independent input names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogicalControl {
    LeftStickX,
    LeftStickY,
    LeftStickIn,
    RightStickX,
    RightStickY,
    RightStickIn,
    LeftBumper,
    RightBumper,
    LeftTrigger,
    RightTrigger,
    A,
    B,
    X,
    Y,
    DpadX,
    DpadY,
    Home,
}

/// Whether a logical control reads as a continuous value or a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Axis,
    Button,
}

impl ControlKind {
    /// Reading of an idle control of this kind.
    #[must_use]
    pub fn neutral(self) -> f32 {
        match self {
            // Centred
            ControlKind::Axis => 0.0,
            // Released
            ControlKind::Button => 0.0,
        }
    }
}

impl LogicalControl {
    /// All logical controls, in declaration order.
    pub const ALL: [LogicalControl; 17] = [
        LogicalControl::LeftStickX,
        LogicalControl::LeftStickY,
        LogicalControl::LeftStickIn,
        LogicalControl::RightStickX,
        LogicalControl::RightStickY,
        LogicalControl::RightStickIn,
        LogicalControl::LeftBumper,
        LogicalControl::RightBumper,
        LogicalControl::LeftTrigger,
        LogicalControl::RightTrigger,
        LogicalControl::A,
        LogicalControl::B,
        LogicalControl::X,
        LogicalControl::Y,
        LogicalControl::DpadX,
        LogicalControl::DpadY,
        LogicalControl::Home,
    ];

    /// Name used in configuration files and log output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalControl::LeftStickX => "left_stick_x",
            LogicalControl::LeftStickY => "left_stick_y",
            LogicalControl::LeftStickIn => "left_stick_in",
            LogicalControl::RightStickX => "right_stick_x",
            LogicalControl::RightStickY => "right_stick_y",
            LogicalControl::RightStickIn => "right_stick_in",
            LogicalControl::LeftBumper => "left_bumper",
            LogicalControl::RightBumper => "right_bumper",
            LogicalControl::LeftTrigger => "left_trigger",
            LogicalControl::RightTrigger => "right_trigger",
            LogicalControl::A => "a",
            LogicalControl::B => "b",
            LogicalControl::X => "x",
            LogicalControl::Y => "y",
            LogicalControl::DpadX => "dpad_x",
            LogicalControl::DpadY => "dpad_y",
            LogicalControl::Home => "home",
        }
    }

    /// Kind of the control. Triggers count as axes even on pads that report
    /// them as digital buttons.
    #[must_use]
    pub fn kind(&self) -> ControlKind {
        match self {
            LogicalControl::LeftStickX
            | LogicalControl::LeftStickY
            | LogicalControl::RightStickX
            | LogicalControl::RightStickY
            | LogicalControl::LeftTrigger
            | LogicalControl::RightTrigger
            | LogicalControl::DpadX
            | LogicalControl::DpadY => ControlKind::Axis,
            _ => ControlKind::Button,
        }
    }

    /// Value reported when the control cannot be read, per its kind.
    #[must_use]
    pub fn neutral(&self) -> f32 {
        self.kind().neutral()
    }
}

impl fmt::Display for LogicalControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogicalControl::ALL
            .iter()
            .copied()
            .find(|control| control.as_str() == s)
            .ok_or_else(|| format!("unknown logical control '{}'", s))
    }
}

/// Multiplier applied to a raw axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSign {
    Positive,
    Negative,
}

impl AxisSign {
    #[must_use]
    pub fn factor(&self) -> f32 {
        match self {
            AxisSign::Positive => 1.0,
            AxisSign::Negative => -1.0,
        }
    }
}

/// Component of a two-axis hat switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HatComponent {
    X,
    Y,
}

/// Where a logical control is read from on a specific device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalSource {
    Button(u8),
    Axis(u8, AxisSign),
    Hat(u8, HatComponent),
}

impl PhysicalSource {
    /// Shorthand for a non-inverted axis.
    #[must_use]
    pub const fn axis(index: u8) -> Self {
        PhysicalSource::Axis(index, AxisSign::Positive)
    }

    /// Shorthand for an inverted axis.
    #[must_use]
    pub const fn inverted_axis(index: u8) -> Self {
        PhysicalSource::Axis(index, AxisSign::Negative)
    }
}

/// Immutable mapping from logical controls to physical sources for one device model.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerProfile {
    name: String,
    controls: BTreeMap<LogicalControl, PhysicalSource>,
}

impl ControllerProfile {
    /// Creates a profile from a list of control assignments.
    ///
    /// # Examples
    ///
    /// ```
    /// use mecanum_teleop::controller::profile::{
    ///     ControllerProfile, LogicalControl, PhysicalSource,
    /// };
    ///
    /// let profile = ControllerProfile::new(
    ///     "Test Pad",
    ///     [(LogicalControl::A, PhysicalSource::Button(0))],
    /// );
    /// assert_eq!(profile.source(LogicalControl::A), Some(PhysicalSource::Button(0)));
    /// assert_eq!(profile.source(LogicalControl::B), None);
    /// ```
    pub fn new(
        name: impl Into<String>,
        controls: impl IntoIterator<Item = (LogicalControl, PhysicalSource)>,
    ) -> Self {
        Self {
            name: name.into(),
            controls: controls.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical source of `control`, if this profile maps it.
    #[must_use]
    pub fn source(&self, control: LogicalControl) -> Option<PhysicalSource> {
        self.controls.get(&control).copied()
    }

    /// Number of mapped controls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Set of known controller profiles keyed by reported device name.
///
/// Built once at startup and handed to the input mapper; never mutated while
/// the control loop runs.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ControllerProfile>,
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in profiles.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.insert(profile);
        }
        registry
    }

    /// Adds a profile, replacing any profile with the same name.
    pub fn insert(&mut self, profile: ControllerProfile) -> Option<ControllerProfile> {
        self.profiles.insert(profile.name.clone(), profile)
    }

    /// Looks up a profile by exact device name.
    #[must_use]
    pub fn get(&self, device_name: &str) -> Option<&ControllerProfile> {
        self.profiles.get(device_name)
    }

    /// Names of all registered profiles, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Nintendo Switch Pro Controller layout, shared by both names it reports under.
fn switch_pro_profile(name: &str) -> ControllerProfile {
    use LogicalControl::*;
    use PhysicalSource as P;

    ControllerProfile::new(
        name,
        [
            (A, P::Button(1)),
            (B, P::Button(0)),
            (X, P::Button(2)),
            (Y, P::Button(3)),
            (LeftBumper, P::Button(5)),
            (RightBumper, P::Button(6)),
            (LeftTrigger, P::Button(7)),
            (RightTrigger, P::Button(8)),
            (LeftStickIn, P::Button(12)),
            (RightStickIn, P::Button(13)),
            (Home, P::Button(11)),
            (LeftStickX, P::axis(0)),
            (LeftStickY, P::inverted_axis(1)),
            (RightStickX, P::axis(2)),
            (RightStickY, P::inverted_axis(3)),
            (DpadX, P::Hat(0, HatComponent::X)),
            (DpadY, P::Hat(0, HatComponent::Y)),
        ],
    )
}

fn builtin_profiles() -> Vec<ControllerProfile> {
    use LogicalControl::*;
    use PhysicalSource as P;

    vec![
        switch_pro_profile("Pro Controller"),
        switch_pro_profile("Nintendo Switch Pro Controller"),
        ControllerProfile::new(
            "Xbox One S Controller",
            [
                (A, P::Button(0)),
                (B, P::Button(1)),
                (X, P::Button(3)),
                (Y, P::Button(4)),
                (LeftBumper, P::Button(6)),
                (RightBumper, P::Button(7)),
                (LeftTrigger, P::axis(4)),
                (RightTrigger, P::axis(5)),
                (LeftStickIn, P::Button(13)),
                (RightStickIn, P::Button(14)),
                (Home, P::Button(12)),
                (LeftStickX, P::axis(0)),
                (LeftStickY, P::inverted_axis(1)),
                (RightStickX, P::axis(2)),
                (RightStickY, P::inverted_axis(3)),
                (DpadX, P::Hat(0, HatComponent::X)),
                (DpadY, P::Hat(0, HatComponent::Y)),
            ],
        ),
        // No dpad, stick-press or home entries: those read neutral.
        ControllerProfile::new(
            "Xbox 360 Controller",
            [
                (A, P::Button(0)),
                (B, P::Button(1)),
                (X, P::Button(3)),
                (Y, P::Button(2)),
                (LeftBumper, P::Button(4)),
                (RightBumper, P::Button(5)),
                (LeftTrigger, P::axis(4)),
                (RightTrigger, P::axis(5)),
                (LeftStickX, P::axis(0)),
                (LeftStickY, P::inverted_axis(1)),
                (RightStickX, P::axis(3)),
                (RightStickY, P::inverted_axis(4)),
            ],
        ),
        ControllerProfile::new(
            "DualSense Wireless Controller",
            [
                (A, P::Button(0)),
                (B, P::Button(1)),
                (X, P::Button(3)),
                (Y, P::Button(2)),
                (LeftBumper, P::Button(4)),
                (RightBumper, P::Button(5)),
                (LeftTrigger, P::axis(2)),
                (RightTrigger, P::axis(5)),
                (LeftStickIn, P::Button(13)),
                (RightStickIn, P::Button(14)),
                (Home, P::Button(12)),
                (LeftStickX, P::axis(0)),
                (LeftStickY, P::inverted_axis(1)),
                (RightStickX, P::axis(3)),
                (RightStickY, P::inverted_axis(4)),
                (DpadX, P::Hat(0, HatComponent::X)),
                (DpadY, P::Hat(0, HatComponent::Y)),
            ],
        ),
    ]
}
