//! # Control Loop
//!
//! Fixed-cadence orchestration of the teleop pipeline.
//!
//! Each tick:
//! 1. Drain device attach/detach notifications from the [`InputSource`]
//! 2. Sample the active controller through the [`InputMapper`]
//! 3. Compute wheel powers and encode a wire frame
//! 4. Send it over the [`CommandLink`]
//!
//! When the link is down the loop stalls in the reconnect policy: connect
//! attempts are repeated with a fixed delay until one succeeds. Commands
//! computed before the stall are dropped, never queued. Ctrl+C (via the
//! shutdown watch channel) or a quit event from the input source ends the
//! loop, including while stalled.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, trace, warn, Level};

use crate::config::Config;
use crate::controller::hotplug::{DeviceEvent, DeviceId, InputSource};
use crate::controller::mapper::{InputMapper, RawDeviceState};
use crate::controller::profile::LogicalControl;
use crate::drive::kinematics::{compute_wheel_powers, did_change, DriveCommand};
use crate::link::transport::Connector;
use crate::link::{CommandLink, ConnectionState};
use crate::protocol::encoder::encode;

/// Tuning values for the loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    pub deadzone: f32,
    pub max_speed: f32,
    pub loop_rate_hz: u32,
    pub reconnect_delay: Duration,
    pub status_interval_ticks: u64,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deadzone: config.drive.deadzone,
            max_speed: config.drive.max_speed,
            loop_rate_hz: config.control.loop_rate_hz,
            reconnect_delay: Duration::from_millis(config.link.reconnect_delay_ms),
            status_interval_ticks: config.control.status_interval_ticks,
        }
    }

    /// Time between ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.loop_rate_hz.max(1)
    }
}

/// Whether the loop keeps running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

/// Counters reported in the periodic status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_sent: u64,
    /// Commands computed but not delivered because the link was down
    pub frames_discarded: u64,
    pub reconnects: u64,
}

/// Resolves once quit has been requested. A dropped sender never resolves.
async fn quit_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|quit| *quit).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Teleop control loop
pub struct ControlLoop<S: InputSource, C: Connector> {
    source: S,
    mapper: InputMapper,
    link: CommandLink<C>,
    target: SocketAddr,
    settings: LoopSettings,
    /// Attached devices by id, with their reported names
    active: BTreeMap<DeviceId, String>,
    last_command: DriveCommand,
    stats: LoopStats,
    shutdown: watch::Receiver<bool>,
}

impl<S: InputSource, C: Connector> ControlLoop<S, C> {
    /// Create a loop
    ///
    /// # Arguments
    ///
    /// * `source` - Input subsystem delivering device events and state
    /// * `mapper` - Profile-aware control reader
    /// * `link` - Outbound link; connected on the first tick if needed
    /// * `target` - Robot address used for every connect attempt
    /// * `settings` - Drive and timing parameters
    /// * `shutdown` - Becomes `true` when the operator asks to quit
    pub fn new(
        source: S,
        mapper: InputMapper,
        link: CommandLink<C>,
        target: SocketAddr,
        settings: LoopSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            mapper,
            link,
            target,
            settings,
            active: BTreeMap::new(),
            last_command: DriveCommand::STOP,
            stats: LoopStats::default(),
            shutdown,
        }
    }

    /// Run until quit
    ///
    /// # Returns
    ///
    /// * `LoopStats` - Final counters
    pub async fn run(&mut self) -> LoopStats {
        let period = self.settings.tick_period();
        info!(
            "Control loop running at {} Hz ({:?} per tick), target {}",
            self.settings.loop_rate_hz, period, self.target
        );

        let mut ticker = interval(period);
        // A reconnect stall must not be followed by a burst of catch-up ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await == TickOutcome::Quit {
                        break;
                    }
                }
                _ = quit_requested(&mut self.shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.link.close().await;
        info!(
            "Control loop stopped: {} frames sent, {} discarded, {} reconnects",
            self.stats.frames_sent, self.stats.frames_discarded, self.stats.reconnects
        );
        self.stats
    }

    /// Run one iteration
    pub async fn tick(&mut self) -> TickOutcome {
        if *self.shutdown.borrow() {
            return TickOutcome::Quit;
        }
        self.stats.ticks += 1;

        for event in self.source.poll_events().await {
            match event {
                DeviceEvent::Attached { id, name } => self.attach(id, name),
                DeviceEvent::Detached { id } => self.detach(id),
                DeviceEvent::Quit => {
                    info!("Quit requested by input subsystem");
                    return TickOutcome::Quit;
                }
            }
        }

        let command = self.compute_command();
        if did_change(&self.last_command, &command) {
            debug!(
                "Command changed: lf={:.3} lb={:.3} rf={:.3} rb={:.3}",
                command.left_front, command.left_back, command.right_front, command.right_back
            );
        }
        self.last_command = command;

        let outcome = if self.link.is_connected() {
            match self.link.send(&encode(&command)).await {
                Ok(()) => {
                    self.stats.frames_sent += 1;
                    TickOutcome::Continue
                }
                Err(e) => {
                    debug!("Send failed: {}", e);
                    self.stats.frames_discarded += 1;
                    self.reestablish().await
                }
            }
        } else {
            self.stats.frames_discarded += 1;
            self.reestablish().await
        };

        if self.stats.ticks % self.settings.status_interval_ticks.max(1) == 0 {
            self.log_status();
        }
        outcome
    }

    fn attach(&mut self, id: DeviceId, name: String) {
        info!("Controller {} attached: {}", id, name);
        if let Err(e) = self.mapper.resolve(&name) {
            warn!("Controller {}: {}; its input will read as neutral", id, e);
        }
        self.active.insert(id, name);
    }

    fn detach(&mut self, id: DeviceId) {
        match self.active.remove(&id) {
            Some(name) => info!("Controller {} detached: {}", id, name),
            None => debug!("Detach for unknown device {}", id),
        }
    }

    /// Command from the last active device in id order, or STOP if none.
    fn compute_command(&self) -> DriveCommand {
        let device = self
            .active
            .keys()
            .rev()
            .find_map(|id| self.source.device(*id));

        match device {
            Some(device) => self.command_from(device),
            None => DriveCommand::STOP,
        }
    }

    fn command_from(&self, device: &dyn RawDeviceState) -> DriveCommand {
        if tracing::enabled!(Level::TRACE) {
            let snapshot = self.mapper.snapshot(device);
            let active: Vec<String> = snapshot
                .active()
                .map(|(control, value)| format!("{}={:.2}", control, value))
                .collect();
            trace!("{}: {}", device.name(), active.join(" "));
        }

        let speed = self.mapper.sample(device, LogicalControl::LeftStickY);
        let strafe = self.mapper.sample(device, LogicalControl::LeftStickX);
        let turn = self.mapper.sample(device, LogicalControl::RightStickX);
        compute_wheel_powers(
            speed,
            strafe,
            turn,
            self.settings.deadzone,
            self.settings.max_speed,
        )
    }

    /// Repeat connect attempts until one succeeds or quit is requested
    async fn reestablish(&mut self) -> TickOutcome {
        let first_connection = self.link.stats().connects == 0;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.link.connect(self.target.ip(), self.target.port()).await {
                Ok(()) => {
                    if first_connection {
                        info!("Connected to {} after {} attempt(s)", self.target, attempts);
                    } else {
                        self.stats.reconnects += 1;
                        info!("Reconnected to {} after {} attempt(s)", self.target, attempts);
                    }
                    return TickOutcome::Continue;
                }
                Err(e) => {
                    if attempts == 1 {
                        warn!("Link to {} is down, retrying: {}", self.target, e);
                    } else {
                        debug!("Connect attempt {} failed: {}", attempts, e);
                    }
                }
            }

            tokio::select! {
                _ = sleep(self.settings.reconnect_delay) => {}
                _ = quit_requested(&mut self.shutdown) => {
                    info!("Shutdown requested while disconnected");
                    return TickOutcome::Quit;
                }
            }
        }
    }

    fn log_status(&self) {
        info!(
            "Status: link {}, {} controller(s), {} frames sent, {} discarded, {} reconnects",
            self.link.state(),
            self.active.len(),
            self.stats.frames_sent,
            self.stats.frames_discarded,
            self.stats.reconnects
        );
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn link_state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn last_command(&self) -> DriveCommand {
        self.last_command
    }

    /// Ids of attached devices
    pub fn active_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.active.keys().copied()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
