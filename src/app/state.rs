//! Observed bus state.
//!
//! [`GatewayState`] is the only place bus observations land.  It is written
//! by accepted frames (through [`GatewayState::record`]) and by command
//! dispatch; everything else reads it.

use crate::protocol::{clamp_temperature, ControlStatus, HeaterStatus, PacketBytes};
use crate::timing::{age, Millis};

use super::classifier::Classified;
use super::commands::LogLevel;

/// Which panel slot a control frame is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSlot {
    /// Panel heard on tap B.  Template for every override.
    Local,
    /// Panel heard on tap A.  Diagnostics only.
    Remote,
}

/// Latest frame of one kind, with its raw payload and arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<T> {
    pub status: T,
    pub bytes: PacketBytes,
    pub at_ms: Millis,
}

/// What [`GatewayState::record`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// `target_initialised` is set on the first heater frame only.
    Heater { target_initialised: bool },
    Control(ControlSlot),
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayState {
    heater: Option<Observation<HeaterStatus>>,
    heater_count: u32,
    heater_delta_ms: Millis,

    local_control: Option<Observation<ControlStatus>>,
    local_count: u32,
    remote_control: Option<Observation<ControlStatus>>,
    remote_count: u32,

    unknown: Option<Observation<()>>,
    unknown_count: u32,

    target_temperature: Option<i32>,
    temperature_sync_disabled: bool,
    log_level: LogLevel,
}

impl GatewayState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Mutation ──────────────────────────────────────────────

    /// Store an accepted frame.
    pub fn record(&mut self, frame: &Classified) -> Recorded {
        match *frame {
            Classified::Heater { status, bytes, at_ms } => {
                if let Some(prev) = self.heater {
                    self.heater_delta_ms = at_ms.wrapping_sub(prev.at_ms);
                }
                self.heater = Some(Observation { status, bytes, at_ms });
                self.heater_count = self.heater_count.wrapping_add(1);

                let target_initialised = self.target_temperature.is_none();
                if target_initialised {
                    self.target_temperature = Some(clamp_temperature(status.temperature_celsius));
                }
                Recorded::Heater { target_initialised }
            }
            Classified::Control { slot, status, bytes, at_ms } => {
                let obs = Some(Observation { status, bytes, at_ms });
                match slot {
                    ControlSlot::Local => {
                        self.local_control = obs;
                        self.local_count = self.local_count.wrapping_add(1);
                    }
                    ControlSlot::Remote => {
                        self.remote_control = obs;
                        self.remote_count = self.remote_count.wrapping_add(1);
                    }
                }
                Recorded::Control(slot)
            }
            Classified::Unknown { bytes, at_ms } => {
                self.unknown = Some(Observation { status: (), bytes, at_ms });
                self.unknown_count = self.unknown_count.wrapping_add(1);
                Recorded::Unknown
            }
        }
    }

    /// Set the target, clamped into the heater's range.  Returns the value
    /// actually stored.
    pub fn set_target_temperature(&mut self, celsius: i32) -> i32 {
        let t = clamp_temperature(celsius);
        self.target_temperature = Some(t);
        t
    }

    pub fn set_temperature_sync(&mut self, enabled: bool) {
        self.temperature_sync_disabled = !enabled;
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn heater(&self) -> Option<&Observation<HeaterStatus>> {
        self.heater.as_ref()
    }

    pub fn local_control(&self) -> Option<&Observation<ControlStatus>> {
        self.local_control.as_ref()
    }

    pub fn remote_control(&self) -> Option<&Observation<ControlStatus>> {
        self.remote_control.as_ref()
    }

    pub fn unknown(&self) -> Option<&Observation<()>> {
        self.unknown.as_ref()
    }

    pub fn heater_count(&self) -> u32 {
        self.heater_count
    }

    pub fn local_count(&self) -> u32 {
        self.local_count
    }

    pub fn remote_count(&self) -> u32 {
        self.remote_count
    }

    pub fn unknown_count(&self) -> u32 {
        self.unknown_count
    }

    /// Gap between the last two heater frames; 0 until the second one.
    pub fn heater_delta_ms(&self) -> Millis {
        self.heater_delta_ms
    }

    pub fn target_temperature(&self) -> Option<i32> {
        self.target_temperature
    }

    pub fn temperature_sync_enabled(&self) -> bool {
        !self.temperature_sync_disabled
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Age of the last local panel frame at `now`.
    pub fn local_control_age(&self, now: Millis) -> Option<Millis> {
        self.local_control.map(|c| age(now, c.at_ms))
    }
}
