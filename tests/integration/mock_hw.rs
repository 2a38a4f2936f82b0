//! Mock adapters for integration tests.
//!
//! Every port call is recorded so tests can assert on the full history
//! without a bus, a broker or a radio.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use rinnai_gateway::app::commands::LogDestination;
use rinnai_gateway::app::events::AppEvent;
use rinnai_gateway::app::ports::{
    BusPort, BusTap, ClockPort, DevicePort, EventSink, LogControlPort, MqttEvent, MqttPort, QoS,
    RawPacket, TapDiagnostics,
};
use rinnai_gateway::error::{CommsError, OverrideError};
use rinnai_gateway::protocol::PacketBytes;
use rinnai_gateway::timing::Millis;

// ── Frame builders ────────────────────────────────────────────

/// Heater frame payload: id 1, given temperature, power flag.
pub fn heater_bytes(celsius: i32, power_on: bool) -> PacketBytes {
    let code = (celsius - 37) as u8;
    PacketBytes::new([0b10_000_001, (code << 4) | u8::from(power_on), 0x00])
}

/// Local panel frame payload: id 2, nothing pressed.
pub fn panel_bytes() -> PacketBytes {
    PacketBytes::new([0b01_000_010, 0x00, 0x5a])
}

pub fn frame(tap: BusTap, data: PacketBytes, start_ms: Millis) -> RawPacket {
    RawPacket {
        tap,
        bits_present: 24,
        data,
        start_ms,
        valid_preamble: true,
        valid_parity: true,
        valid_checksum: true,
    }
}

// ── MockBus ───────────────────────────────────────────────────

pub struct MockBus {
    pub tap_a: VecDeque<RawPacket>,
    pub tap_b: VecDeque<RawPacket>,
    /// Armed override, not yet taken by the transmitter.
    pub pending: Option<PacketBytes>,
    /// Every override successfully armed.
    pub sent: Vec<PacketBytes>,
    pub diagnostics: TapDiagnostics,
}

#[allow(dead_code)]
impl MockBus {
    pub fn new() -> Self {
        Self {
            tap_a: VecDeque::new(),
            tap_b: VecDeque::new(),
            pending: None,
            sent: Vec::new(),
            diagnostics: TapDiagnostics::default(),
        }
    }

    pub fn push(&mut self, packet: RawPacket) {
        match packet.tap {
            BusTap::A => self.tap_a.push_back(packet),
            BusTap::B => self.tap_b.push_back(packet),
        }
    }

    /// What the transmitter does once the frame is on the wire.
    pub fn transmit(&mut self) -> Option<PacketBytes> {
        self.pending.take()
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusPort for MockBus {
    fn try_receive(&mut self, tap: BusTap) -> Option<RawPacket> {
        match tap {
            BusTap::A => self.tap_a.pop_front(),
            BusTap::B => self.tap_b.pop_front(),
        }
    }

    fn set_override_packet(&mut self, bytes: PacketBytes) -> Result<(), OverrideError> {
        if self.pending.is_some() {
            return Err(OverrideError::Busy);
        }
        self.pending = Some(bytes);
        self.sent.push(bytes);
        Ok(())
    }

    fn diagnostics(&self, _tap: BusTap) -> TapDiagnostics {
        self.diagnostics
    }
}

// ── MockMqtt ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttCall {
    Publish { topic: String, payload: String, retain: bool, qos: QoS },
    Subscribe(String),
    SetWill { topic: String, payload: String, retain: bool, qos: QoS },
}

pub struct MockMqtt {
    pub connected: bool,
    pub fail_publish: bool,
    pub events: VecDeque<MqttEvent>,
    pub calls: Vec<MqttCall>,
}

#[allow(dead_code)]
impl MockMqtt {
    pub fn new() -> Self {
        Self {
            connected: false,
            fail_publish: false,
            events: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    /// Mark the session up and queue the matching event.
    pub fn connect(&mut self) {
        self.connected = true;
        self.events.push_back(MqttEvent::Connected);
    }

    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.events.push_back(MqttEvent::Message {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    /// Payloads published to `topic`, oldest first.
    pub fn published_to(&self, topic: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MqttCall::Publish { topic: t, payload, .. } if t == topic => Some(payload.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockMqtt {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttPort for MockMqtt {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttNotConnected);
        }
        if self.fail_publish {
            return Err(CommsError::MqttPublishFailed);
        }
        self.calls.push(MqttCall::Publish {
            topic: topic.into(),
            payload: payload.into(),
            retain,
            qos,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic_filter: &str) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MqttNotConnected);
        }
        self.calls.push(MqttCall::Subscribe(topic_filter.into()));
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn set_will(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS) {
        self.calls.push(MqttCall::SetWill {
            topic: topic.into(),
            payload: payload.into(),
            retain,
            qos,
        });
    }

    fn poll_event(&mut self) -> Option<MqttEvent> {
        self.events.pop_front()
    }
}

// ── MockDevice ────────────────────────────────────────────────

pub struct MockDevice {
    pub ip: Option<Ipv4Addr>,
    pub rssi: Option<i8>,
    pub test_input: bool,
    pub now_ms: Millis,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            ip: Some(Ipv4Addr::new(192, 168, 1, 50)),
            rssi: Some(-55),
            test_input: false,
            now_ms: 0,
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DevicePort for MockDevice {
    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }

    fn test_input_active(&mut self) -> bool {
        self.test_input
    }
}

impl ClockPort for MockDevice {
    fn now_ms(&self) -> Millis {
        self.now_ms
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
    pub routed: Vec<LogDestination>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            routed: Vec::new(),
        }
    }

    pub fn has(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

impl LogControlPort for RecordingSink {
    fn route_logs(&mut self, destination: LogDestination) {
        self.routed.push(destination);
    }
}
