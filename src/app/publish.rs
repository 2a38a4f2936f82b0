//! State document rendering and publish policy.
//!
//! The *restricted* document is rendered every poll and is what change
//! detection compares.  When a publish is due it is expanded with fields
//! that change on every cycle (signal strength, frame timings), which
//! would otherwise force a publish each time.

use serde::Serialize;

use crate::protocol::PacketBytes;
use crate::timing::{positive_delta_in_cycle, Millis};

use super::state::GatewayState;

/// Inputs from the board that land in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Dotted quad; `0.0.0.0` while not associated.
    pub ip: String,
    pub test_input_active: bool,
    pub rssi: Option<i8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub ip: String,
    /// `ON` while the active-low test input is pulled low.
    pub test_pin: &'static str,
    pub enable_temperature_sync: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_temperature: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heater_bytes: Option<PacketBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_state: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_control_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_control_bytes: Option<PacketBytes>,
}

/// The restricted document plus the fields only sent alongside a publish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedStateDocument<'a> {
    #[serde(flatten)]
    pub base: &'a StateDocument,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heater_delta: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc_control_timing: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rem_control_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rem_control_bytes: Option<PacketBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rem_control_timing: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_bytes: Option<PacketBytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_timing: Option<i64>,
}

/// Render the restricted document.
pub fn render_state(state: &GatewayState, device: &DeviceSnapshot, research: bool) -> StateDocument {
    let mut doc = StateDocument {
        ip: device.ip.clone(),
        test_pin: if device.test_input_active { "ON" } else { "OFF" },
        enable_temperature_sync: state.temperature_sync_enabled(),
        current_temperature: None,
        target_temperature: None,
        mode: None,
        action: None,
        active_id: None,
        heater_bytes: None,
        startup_state: None,
        loc_control_id: None,
        loc_control_bytes: None,
    };

    if let Some(h) = state.heater() {
        let s = &h.status;
        doc.current_temperature = Some(s.temperature_celsius);
        doc.target_temperature = state.target_temperature();
        doc.mode = Some(if s.power_on { "heat" } else { "off" });
        doc.action = Some(match (s.in_use, s.power_on) {
            (true, _) => "heating",
            (false, true) => "idle",
            (false, false) => "off",
        });
        if research {
            doc.active_id = Some(s.active_id);
            doc.heater_bytes = Some(h.bytes);
            doc.startup_state = Some(s.startup_state);
        }
    }

    if research {
        if let Some(c) = state.local_control() {
            doc.loc_control_id = Some(c.status.owner_id);
            doc.loc_control_bytes = Some(c.bytes);
        }
    }

    doc
}

/// Add the per-publish fields.  Frame timings are offsets into the heater
/// cycle and are only present once a heater frame has been seen.
pub fn expand<'a>(
    base: &'a StateDocument,
    state: &GatewayState,
    rssi: Option<i8>,
    research: bool,
) -> ExpandedStateDocument<'a> {
    let mut doc = ExpandedStateDocument {
        base,
        rssi,
        heater_delta: None,
        loc_control_timing: None,
        rem_control_id: None,
        rem_control_bytes: None,
        rem_control_timing: None,
        unknown_bytes: None,
        unknown_timing: None,
    };
    if !research {
        return doc;
    }

    let cycle = state.heater_delta_ms();
    let heater_at = state.heater().map(|h| h.at_ms);
    let timing = |at: Millis| heater_at.map(|h| positive_delta_in_cycle(at, h, cycle));

    if heater_at.is_some() {
        doc.heater_delta = Some(cycle);
    }
    if let Some(c) = state.local_control() {
        doc.loc_control_timing = timing(c.at_ms);
    }
    if let Some(c) = state.remote_control() {
        doc.rem_control_id = Some(c.status.owner_id);
        doc.rem_control_bytes = Some(c.bytes);
        doc.rem_control_timing = timing(c.at_ms);
    }
    if let Some(u) = state.unknown() {
        doc.unknown_bytes = Some(u.bytes);
        doc.unknown_timing = timing(u.at_ms);
    }
    doc
}

// ───────────────────────────────────────────────────────────────
// Publish policy
// ───────────────────────────────────────────────────────────────

/// Change detection with a forced periodic flush.
#[derive(Debug, Clone)]
pub struct PublishPolicy {
    flush_interval_ms: Millis,
    last_payload: Option<String>,
    last_sent_ms: Option<Millis>,
}

impl PublishPolicy {
    pub fn new(flush_interval_ms: Millis) -> Self {
        Self {
            flush_interval_ms,
            last_payload: None,
            last_sent_ms: None,
        }
    }

    /// Due when `payload` differs from the last one sent, or the flush
    /// interval has elapsed.  Always due before the first send.
    pub fn is_due(&self, payload: &str, now: Millis) -> bool {
        let Some(sent) = self.last_sent_ms else {
            return true;
        };
        self.last_payload.as_deref() != Some(payload)
            || crate::timing::age(now, sent) >= self.flush_interval_ms
    }

    /// Record a send attempt as the new baseline, successful or not.
    pub fn mark_sent(&mut self, payload: String, now: Millis) {
        self.last_payload = Some(payload);
        self.last_sent_ms = Some(now);
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }
}
