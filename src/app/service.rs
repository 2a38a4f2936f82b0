//! Gateway service: the hexagonal core.
//!
//! [`GatewayService`] owns the observed bus state and the publish baseline.
//! All I/O flows through port traits injected at call sites, so the whole
//! service runs against mock adapters on the host.
//!
//! ```text
//!   BusPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!               │      GatewayService      │
//!  MqttPort ◀──▶│ classify · sync · publish │ ◀── DevicePort / ClockPort
//!               └──────────────────────────┘
//! ```

use std::net::Ipv4Addr;

use log::{info, warn};

use crate::config::GatewayConfig;
use crate::error::{OverrideError, PacketError};
use crate::timing::Millis;

use super::classifier::{classify, Classified};
use super::commands::{GatewayCommand, LogLevel, ModeRequest};
use super::discovery::{DiscoveryDocument, Topics, AVAILABILITY_OFFLINE, AVAILABILITY_ONLINE};
use super::events::{AppEvent, Outbound};
use super::overrides::{self, OverrideCommand};
use super::ports::{
    BusPort, BusTap, ClockPort, DevicePort, EventSink, LogControlPort, MqttEvent, MqttPort, QoS,
    RawPacket,
};
use super::publish::{expand, render_state, DeviceSnapshot, PublishPolicy};
use super::state::{GatewayState, Recorded};
use super::sync;

// ───────────────────────────────────────────────────────────────
// GatewayService
// ───────────────────────────────────────────────────────────────

pub struct GatewayService {
    config: GatewayConfig,
    topics: Topics,
    state: GatewayState,
    policy: PublishPolicy,
}

impl GatewayService {
    /// Construct the service.  Call [`start`](Self::start) before the
    /// MQTT client first connects.
    pub fn new(config: GatewayConfig) -> Self {
        let topics = Topics::new(&config.base_topic);
        let policy = PublishPolicy::new(config.forced_flush_interval_ms);
        Self {
            config,
            topics,
            state: GatewayState::new(),
            policy,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Arm the retained `offline` last will.
    pub fn start(&mut self, mqtt: &mut impl MqttPort, sink: &mut impl EventSink) {
        mqtt.set_will(&self.topics.availability, AVAILABILITY_OFFLINE, true, QoS::AtMostOnce);
        sink.emit(&AppEvent::Started);
        info!("Gateway started, base topic '{}'", self.topics.base);
    }

    // ── Per-poll orchestration ────────────────────────────────

    /// One pass of the cooperative loop: decoder diagnostics, inbound MQTT,
    /// tap A, tap B, then the state publish decision.
    pub fn poll(
        &mut self,
        bus: &mut impl BusPort,
        mqtt: &mut impl MqttPort,
        device: &mut (impl DevicePort + ClockPort),
        sink: &mut (impl EventSink + LogControlPort),
    ) {
        // 1. Decoder health
        if self.state.log_level() == LogLevel::Raw {
            for tap in BusTap::ALL {
                sink.emit(&AppEvent::DecoderDiagnostics {
                    tap,
                    diagnostics: bus.diagnostics(tap),
                });
            }
        }

        // 2. Broker events queued since the last poll
        while let Some(event) = mqtt.poll_event() {
            match event {
                MqttEvent::Connected => self.on_connected(mqtt, sink),
                MqttEvent::Disconnected => sink.emit(&AppEvent::Disconnected),
                MqttEvent::Message { topic, payload } => {
                    self.handle_message(&topic, &payload, bus, &*device, sink)
                }
            }
        }

        // 3. Bus frames, each tap drained to empty
        for tap in BusTap::ALL {
            while let Some(packet) = bus.try_receive(tap) {
                // Rejections are already reported through the sink.
                let _ = self.ingest_packet(&packet, bus, &*device, sink);
            }
        }

        // 4. State document
        self.publish_state(mqtt, device, sink);
    }

    /// Validate, classify and record one frame.  After an accepted heater
    /// frame the sync controller gets a chance to step the temperature.
    pub fn ingest_packet(
        &mut self,
        packet: &RawPacket,
        bus: &mut impl BusPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), PacketError> {
        let frame = match classify(packet) {
            Ok(frame) => frame,
            Err(reason) => {
                sink.emit(&AppEvent::PacketRejected {
                    packet: *packet,
                    reason,
                });
                return Err(reason);
            }
        };

        let recorded = self.state.record(&frame);
        let parsed = self.state.log_level() == LogLevel::Parsed;

        match (frame, recorded) {
            (Classified::Heater { status, .. }, Recorded::Heater { target_initialised }) => {
                if target_initialised {
                    sink.emit(&AppEvent::TargetInitialised(status.temperature_celsius));
                }
                if parsed {
                    sink.emit(&AppEvent::HeaterParsed(status));
                }
                self.run_sync(bus, clock.now_ms(), sink);
            }
            (Classified::Control { slot, status, .. }, _) => {
                if parsed {
                    sink.emit(&AppEvent::ControlParsed { slot, status });
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ── Command handling ──────────────────────────────────────

    /// Parse and apply one MQTT delivery.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &str,
        bus: &mut impl BusPort,
        clock: &impl ClockPort,
        sink: &mut (impl EventSink + LogControlPort),
    ) {
        let Some(cmd) = GatewayCommand::parse(topic, payload) else {
            return;
        };
        sink.emit(&AppEvent::CommandReceived {
            topic: topic.into(),
            payload: payload.into(),
        });

        match cmd {
            GatewayCommand::SetTargetTemperature(requested) => {
                let t = self.state.set_target_temperature(requested);
                sink.emit(&AppEvent::TargetTemperatureSet(t));
                self.run_sync(bus, clock.now_ms(), sink);
            }
            GatewayCommand::SetTemperatureSync(enabled) => {
                self.state.set_temperature_sync(enabled);
                sink.emit(&AppEvent::TemperatureSyncChanged(enabled));
            }
            GatewayCommand::SetMode(Some(request)) => {
                // Power is a toggle button. Until the heater reports its
                // power state a press could just as well turn it off, so
                // no press is sent.
                let Some(heater) = self.state.heater() else {
                    sink.emit(&AppEvent::CommandIgnored {
                        command: "mode",
                        reason: "no heater status yet",
                    });
                    return;
                };
                let on = heater.status.power_on;
                let toggle = match request {
                    ModeRequest::Off => on,
                    ModeRequest::Heat => !on,
                };
                if toggle {
                    let _ = self.request_override(OverrideCommand::PowerToggle, bus, clock.now_ms(), sink);
                }
            }
            GatewayCommand::SetMode(None) => {}
            GatewayCommand::PressPriority => {
                let _ = self.request_override(OverrideCommand::Priority, bus, clock.now_ms(), sink);
            }
            GatewayCommand::SetLogLevel(Some(level)) => {
                self.state.set_log_level(level);
                sink.emit(&AppEvent::LogLevelChanged(level));
            }
            GatewayCommand::SetLogLevel(None) => {
                sink.emit(&AppEvent::CommandIgnored {
                    command: "log_level",
                    reason: "unknown level",
                });
            }
            GatewayCommand::SetLogDestination(dest) => {
                sink.route_logs(dest);
                sink.emit(&AppEvent::LogDestinationChanged(dest));
            }
            GatewayCommand::Unrecognized(segment) => {
                sink.emit(&AppEvent::UnknownTopic(segment));
            }
        }
    }

    /// Subscribe to the command topics, then announce discovery and
    /// availability.  Runs on every (re)connect.
    pub fn on_connected(&mut self, mqtt: &mut impl MqttPort, sink: &mut impl EventSink) {
        if let Err(e) = mqtt.subscribe(&self.topics.commands) {
            sink.emit(&AppEvent::SubscribeFailed(e));
        }

        let discovery = DiscoveryDocument::new(&self.topics, &self.config.device_name);
        let payload = match serde_json::to_string(&discovery) {
            Ok(p) => p,
            Err(e) => {
                warn!("Discovery document did not serialize: {}", e);
                String::new()
            }
        };
        if !payload.is_empty() {
            if let Err(error) = mqtt.publish(&self.topics.config, &payload, true, QoS::AtMostOnce) {
                sink.emit(&AppEvent::PublishFailed {
                    what: Outbound::Discovery,
                    error,
                });
            }
        }

        if let Err(error) =
            mqtt.publish(&self.topics.availability, AVAILABILITY_ONLINE, true, QoS::AtMostOnce)
        {
            sink.emit(&AppEvent::PublishFailed {
                what: Outbound::Availability,
                error,
            });
        }

        sink.emit(&AppEvent::Connected { discovery: payload });
    }

    /// Build and arm a single override frame.  Best effort: a failure is
    /// reported and dropped, never retried.
    pub fn request_override(
        &mut self,
        command: OverrideCommand,
        bus: &mut impl BusPort,
        now: Millis,
        sink: &mut impl EventSink,
    ) -> Result<(), OverrideError> {
        let result = overrides::synthesize(command, &self.state, now, self.config.override_freshness_ms)
            .and_then(|bytes| bus.set_override_packet(bytes).map(|()| bytes));

        match result {
            Ok(bytes) => {
                sink.emit(&AppEvent::OverrideSent { command, bytes });
                Ok(())
            }
            Err(error) => {
                sink.emit(&AppEvent::OverrideFailed { command, error });
                Err(error)
            }
        }
    }

    /// Render the restricted document and publish the expanded one when
    /// due.  Returns whether a publish was attempted.
    pub fn publish_state(
        &mut self,
        mqtt: &mut impl MqttPort,
        device: &mut (impl DevicePort + ClockPort),
        sink: &mut impl EventSink,
    ) -> bool {
        let research = self.config.report_research_fields;
        let snapshot = DeviceSnapshot {
            ip: device.local_ip().unwrap_or(Ipv4Addr::UNSPECIFIED).to_string(),
            test_input_active: device.test_input_active(),
            rssi: device.rssi(),
        };
        let now = device.now_ms();

        let doc = render_state(&self.state, &snapshot, research);
        let payload = match serde_json::to_string(&doc) {
            Ok(p) => p,
            Err(e) => {
                warn!("State document did not serialize: {}", e);
                return false;
            }
        };

        if !mqtt.connected() || !self.policy.is_due(&payload, now) {
            return false;
        }

        let expanded = expand(&doc, &self.state, snapshot.rssi, research);
        match serde_json::to_string(&expanded) {
            Ok(full) => match mqtt.publish(&self.topics.state, &full, true, QoS::AtMostOnce) {
                Ok(()) => sink.emit(&AppEvent::StatePublished {
                    topic: self.topics.state.clone(),
                    payload: full,
                }),
                Err(error) => sink.emit(&AppEvent::PublishFailed {
                    what: Outbound::State,
                    error,
                }),
            },
            Err(e) => warn!("Expanded state document did not serialize: {}", e),
        }

        self.policy.mark_sent(payload, now);
        true
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Restricted payload of the last publish attempt.
    pub fn last_published(&self) -> Option<&str> {
        self.policy.last_payload()
    }

    // ── Internal ──────────────────────────────────────────────

    fn run_sync(&mut self, bus: &mut impl BusPort, now: Millis, sink: &mut impl EventSink) {
        if let Some(cmd) = sync::evaluate(&self.state, now, self.config.override_freshness_ms) {
            let _ = self.request_override(cmd, bus, now, sink);
        }
    }
}
