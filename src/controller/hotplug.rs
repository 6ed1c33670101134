//! # Hotplug Module
//!
//! Delivers device attach/detach notifications to the control loop.
//!
//! [`InputSource`] is the seam between the control loop and the input
//! subsystem: the loop drains [`DeviceEvent`]s once per tick and reads device
//! state by [`DeviceId`]. Devices stay owned by the source.
//!
//! [`EvdevInputSource`] is the Linux implementation. It rescans
//! `/dev/input/event*` at a fixed interval to find new gamepads and reports a
//! device as detached as soon as reading it fails.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::device::Gamepad;
use super::mapper::RawDeviceState;

/// Directory scanned for evdev nodes.
const INPUT_DIR: &str = "/dev/input";

/// Identifier of one attached device, unique for the life of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notification from the input subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A device became available.
    Attached { id: DeviceId, name: String },
    /// A previously attached device went away.
    Detached { id: DeviceId },
    /// The operator asked to stop.
    Quit,
}

/// Input subsystem as seen by the control loop.
#[async_trait]
pub trait InputSource: Send {
    /// Returns notifications accumulated since the last call and refreshes
    /// the state of attached devices. Must not wait for input.
    async fn poll_events(&mut self) -> Vec<DeviceEvent>;

    /// Current raw state of an attached device.
    fn device(&self, id: DeviceId) -> Option<&dyn RawDeviceState>;
}

/// Evdev-backed input source with periodic rescans.
pub struct EvdevInputSource {
    input_dir: PathBuf,
    rescan_interval: Duration,
    last_scan: Option<Instant>,
    next_id: u32,
    devices: BTreeMap<DeviceId, Gamepad>,
    /// Paths already probed that are not gamepads.
    ignored: BTreeSet<PathBuf>,
}

impl fmt::Debug for EvdevInputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvdevInputSource")
            .field("input_dir", &self.input_dir)
            .field("devices", &self.devices.len())
            .finish_non_exhaustive()
    }
}

impl EvdevInputSource {
    /// Creates a source scanning `/dev/input`.
    #[must_use]
    pub fn new(rescan_interval: Duration) -> Self {
        Self::with_dir(INPUT_DIR, rescan_interval)
    }

    /// Creates a source scanning a custom directory.
    #[must_use]
    pub fn with_dir(input_dir: impl Into<PathBuf>, rescan_interval: Duration) -> Self {
        Self {
            input_dir: input_dir.into(),
            rescan_interval,
            last_scan: None,
            next_id: 0,
            devices: BTreeMap::new(),
            ignored: BTreeSet::new(),
        }
    }

    fn scan_due(&self, now: Instant) -> bool {
        self.last_scan
            .map_or(true, |last| now.duration_since(last) >= self.rescan_interval)
    }

    fn is_open(&self, path: &Path) -> bool {
        self.devices.values().any(|pad| pad.path() == path)
    }

    /// Opens gamepads that appeared since the last scan.
    fn scan(&mut self, events: &mut Vec<DeviceEvent>) {
        let entries = match std::fs::read_dir(&self.input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read {}: {}", self.input_dir.display(), e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map_or(false, |name| name.to_string_lossy().starts_with("event"))
            })
            .collect();
        // Sorted for deterministic ids when several pads are present at startup
        paths.sort();

        // Nodes that vanished may be reused by a different device later
        self.ignored.retain(|path| path.exists());

        for path in paths {
            if self.ignored.contains(&path) || self.is_open(&path) {
                continue;
            }

            match Gamepad::open(&path) {
                Ok(Some(pad)) => {
                    let id = DeviceId(self.next_id);
                    self.next_id += 1;
                    events.push(DeviceEvent::Attached {
                        id,
                        name: pad.name().to_string(),
                    });
                    self.devices.insert(id, pad);
                }
                Ok(None) => {
                    self.ignored.insert(path);
                }
                Err(e) => {
                    // Permission denied or node still initializing; retry next scan
                    debug!("{}", e);
                }
            }
        }
    }
}

#[async_trait]
impl InputSource for EvdevInputSource {
    async fn poll_events(&mut self) -> Vec<DeviceEvent> {
        let mut events = Vec::new();

        let now = Instant::now();
        if self.scan_due(now) {
            self.scan(&mut events);
            self.last_scan = Some(now);
        }

        let mut lost = Vec::new();
        for (id, pad) in self.devices.iter_mut() {
            if let Err(e) = pad.pump().await {
                debug!("{}", e);
                lost.push(*id);
            }
        }
        for id in lost {
            self.devices.remove(&id);
            events.push(DeviceEvent::Detached { id });
        }

        events
    }

    fn device(&self, id: DeviceId) -> Option<&dyn RawDeviceState> {
        self.devices.get(&id).map(|pad| pad as &dyn RawDeviceState)
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::controller::mapper::mocks::FakeDevice;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted input source: each `poll_events` call pops one batch.
    #[derive(Clone, Default)]
    pub struct MockInputSource {
        pub batches: Arc<Mutex<VecDeque<Vec<DeviceEvent>>>>,
        pub devices: BTreeMap<DeviceId, FakeDevice>,
    }

    impl MockInputSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers device state and queues its attach notification.
        pub fn attach(&mut self, id: u32, device: FakeDevice) {
            let id = DeviceId(id);
            self.push_batch(vec![DeviceEvent::Attached {
                id,
                name: device.name.clone(),
            }]);
            self.devices.insert(id, device);
        }

        pub fn push_batch(&self, batch: Vec<DeviceEvent>) {
            self.batches.lock().unwrap().push_back(batch);
        }
    }

    #[async_trait]
    impl InputSource for MockInputSource {
        async fn poll_events(&mut self) -> Vec<DeviceEvent> {
            self.batches.lock().unwrap().pop_front().unwrap_or_default()
        }

        fn device(&self, id: DeviceId) -> Option<&dyn RawDeviceState> {
            self.devices.get(&id).map(|d| d as &dyn RawDeviceState)
        }
    }
}
