//! # Input Mapper Module
//!
//! Answers "what is the current value of logical control X" for a connected
//! device.
//!
//! The mapper resolves the device's reported name against the
//! [`ProfileRegistry`] and reads the mapped physical source from the device's
//! raw state. A device without a profile, or a profile without the requested
//! control, reads as the control's neutral value; the control loop never
//! sees a mapping error.
//!
//! ## Source Semantics
//!
//! | Source | Reading |
//! |--------|---------|
//! | `Button(i)` | 0.0 or 1.0 |
//! | `Axis(i, sign)` | raw axis × sign, hardware range (not re-clamped) |
//! | `Hat(i, component)` | -1.0, 0.0 or 1.0 |
//!
//! ## Usage
//!
//! ```
//! use mecanum_teleop::controller::mapper::{InputMapper, RawDeviceState};
//! use mecanum_teleop::controller::profile::{LogicalControl, ProfileRegistry};
//!
//! struct Idle;
//!
//! impl RawDeviceState for Idle {
//!     fn name(&self) -> &str { "Unknown Pad" }
//!     fn button(&self, _index: u8) -> bool { true }
//!     fn axis(&self, _index: u8) -> f32 { 0.7 }
//!     fn hat(&self, _index: u8) -> (i8, i8) { (1, 1) }
//! }
//!
//! let mapper = InputMapper::new(ProfileRegistry::builtin());
//! // No profile for "Unknown Pad": neutral, no error.
//! assert_eq!(mapper.sample(&Idle, LogicalControl::LeftStickX), 0.0);
//! ```

use tracing::trace;

use super::profile::{
    ControlKind, ControllerProfile, HatComponent, LogicalControl, PhysicalSource, ProfileRegistry,
};
use crate::error::{Result, TeleopError};

/// Axis reading above which an axis-kind control counts as pressed.
const AXIS_PRESS_THRESHOLD: f32 = 0.5;

/// Read access to a connected device's raw report.
///
/// Implemented by the input backend. Out-of-range indices read as released /
/// centred rather than failing.
pub trait RawDeviceState {
    /// Name the device reports (the profile lookup key).
    fn name(&self) -> &str;

    /// Whether raw button `index` is pressed.
    fn button(&self, index: u8) -> bool;

    /// Raw axis `index`, normally in [-1.0, 1.0].
    fn axis(&self, index: u8) -> f32;

    /// Raw hat `index` as (x, y), each in {-1, 0, 1}.
    fn hat(&self, index: u8) -> (i8, i8);
}

impl PhysicalSource {
    /// Reads this source from a device.
    #[must_use]
    pub fn read(&self, device: &dyn RawDeviceState) -> f32 {
        match *self {
            PhysicalSource::Button(index) => {
                if device.button(index) {
                    1.0
                } else {
                    0.0
                }
            }
            PhysicalSource::Axis(index, sign) => device.axis(index) * sign.factor(),
            PhysicalSource::Hat(index, component) => {
                let (x, y) = device.hat(index);
                match component {
                    HatComponent::X => f32::from(x),
                    HatComponent::Y => f32::from(y),
                }
            }
        }
    }
}

/// Resolves devices against the profile registry and samples logical controls.
#[derive(Debug, Clone)]
pub struct InputMapper {
    registry: ProfileRegistry,
}

impl InputMapper {
    /// Creates a mapper over a fixed registry.
    #[must_use]
    pub fn new(registry: ProfileRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry the mapper resolves against.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Finds the profile for a device name.
    ///
    /// # Errors
    ///
    /// Returns [`TeleopError::UnmappedDevice`] if no profile has that exact name.
    pub fn resolve(&self, device_name: &str) -> Result<&ControllerProfile> {
        self.registry
            .get(device_name)
            .ok_or_else(|| TeleopError::UnmappedDevice(device_name.to_string()))
    }

    /// Finds the physical source of `control` on a named device.
    ///
    /// # Errors
    ///
    /// - [`TeleopError::UnmappedDevice`] if the device has no profile
    /// - [`TeleopError::UnmappedControl`] if the profile lacks the control
    pub fn lookup(&self, device_name: &str, control: LogicalControl) -> Result<PhysicalSource> {
        let profile = self.resolve(device_name)?;
        profile
            .source(control)
            .ok_or_else(|| TeleopError::UnmappedControl {
                device: device_name.to_string(),
                control,
            })
    }

    /// Current value of `control` on `device`.
    ///
    /// Never fails: unmapped devices and controls read as
    /// [`LogicalControl::neutral`].
    #[must_use]
    pub fn sample(&self, device: &dyn RawDeviceState, control: LogicalControl) -> f32 {
        match self.lookup(device.name(), control) {
            Ok(source) => source.read(device),
            Err(e) => {
                trace!("{}; reading neutral", e);
                control.neutral()
            }
        }
    }

    /// Whether `control` is held.
    ///
    /// Buttons are held when away from neutral; axes such as triggers when
    /// past half travel.
    #[must_use]
    pub fn pressed(&self, device: &dyn RawDeviceState, control: LogicalControl) -> bool {
        let value = self.sample(device, control);
        match control.kind() {
            ControlKind::Button => value != control.neutral(),
            ControlKind::Axis => value > AXIS_PRESS_THRESHOLD,
        }
    }

    /// Samples every logical control of a device.
    #[must_use]
    pub fn snapshot(&self, device: &dyn RawDeviceState) -> ControlSnapshot {
        let mut values = [0.0; LogicalControl::ALL.len()];
        for (slot, control) in values.iter_mut().zip(LogicalControl::ALL) {
            *slot = self.sample(device, control);
        }
        ControlSnapshot { values }
    }
}

/// Values of all logical controls of one device at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    values: [f32; LogicalControl::ALL.len()],
}

impl ControlSnapshot {
    /// Value of one control.
    #[must_use]
    pub fn get(&self, control: LogicalControl) -> f32 {
        LogicalControl::ALL
            .iter()
            .position(|c| *c == control)
            .map_or(control.neutral(), |i| self.values[i])
    }

    /// Controls that are away from neutral.
    pub fn active(&self) -> impl Iterator<Item = (LogicalControl, f32)> + '_ {
        LogicalControl::ALL
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .filter(|(control, value)| *value != control.neutral())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::RawDeviceState;

    /// In-memory device with settable raw state.
    #[derive(Debug, Clone, Default)]
    pub struct FakeDevice {
        pub name: String,
        pub buttons: Vec<bool>,
        pub axes: Vec<f32>,
        pub hats: Vec<(i8, i8)>,
    }

    impl FakeDevice {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                buttons: vec![false; 16],
                axes: vec![0.0; 6],
                hats: vec![(0, 0); 1],
            }
        }

        pub fn with_axis(mut self, index: usize, value: f32) -> Self {
            self.axes[index] = value;
            self
        }

        pub fn with_button(mut self, index: usize) -> Self {
            self.buttons[index] = true;
            self
        }

        pub fn with_hat(mut self, index: usize, value: (i8, i8)) -> Self {
            self.hats[index] = value;
            self
        }
    }

    impl RawDeviceState for FakeDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn button(&self, index: u8) -> bool {
            self.buttons.get(usize::from(index)).copied().unwrap_or(false)
        }

        fn axis(&self, index: u8) -> f32 {
            self.axes.get(usize::from(index)).copied().unwrap_or(0.0)
        }

        fn hat(&self, index: u8) -> (i8, i8) {
            self.hats.get(usize::from(index)).copied().unwrap_or((0, 0))
        }
    }
}
