//! Integration tests: discovery, availability and state publication.

use rinnai_gateway::app::events::{AppEvent, Outbound};
use rinnai_gateway::app::ports::{BusTap, QoS};
use rinnai_gateway::app::service::GatewayService;
use rinnai_gateway::config::GatewayConfig;
use rinnai_gateway::error::CommsError;
use serde_json::Value;

use crate::mock_hw::{frame, heater_bytes, panel_bytes, MockBus, MockDevice, MockMqtt, MqttCall, RecordingSink};

const BASE: &str = "homeassistant/climate/rinnai";

struct Rig {
    svc: GatewayService,
    bus: MockBus,
    mqtt: MockMqtt,
    dev: MockDevice,
    sink: RecordingSink,
}

impl Rig {
    fn with_config(config: GatewayConfig) -> Self {
        let mut rig = Self {
            svc: GatewayService::new(config),
            bus: MockBus::new(),
            mqtt: MockMqtt::new(),
            dev: MockDevice::new(),
            sink: RecordingSink::new(),
        };
        rig.svc.start(&mut rig.mqtt, &mut rig.sink);
        rig
    }

    fn new() -> Self {
        Self::with_config(GatewayConfig::default())
    }

    fn poll_at(&mut self, now: u32) {
        self.dev.now_ms = now;
        self.svc.poll(&mut self.bus, &mut self.mqtt, &mut self.dev, &mut self.sink);
    }

    fn state_publishes(&self) -> Vec<Value> {
        self.mqtt
            .published_to(&format!("{BASE}/state"))
            .into_iter()
            .map(|p| serde_json::from_str(p).unwrap())
            .collect()
    }
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn last_will_is_armed_at_start() {
    let rig = Rig::new();
    assert_eq!(
        rig.mqtt.calls[0],
        MqttCall::SetWill {
            topic: format!("{BASE}/availability"),
            payload: "offline".into(),
            retain: true,
            qos: QoS::AtMostOnce,
        }
    );
    assert!(rig.sink.has(&AppEvent::Started));
}

#[test]
fn connect_subscribes_then_announces() {
    let mut rig = Rig::new();
    rig.mqtt.clear();
    rig.mqtt.connect();
    rig.poll_at(0);

    assert_eq!(rig.mqtt.calls[0], MqttCall::Subscribe(format!("{BASE}/#")));
    let MqttCall::Publish { topic, payload, retain, .. } = &rig.mqtt.calls[1] else {
        panic!("expected discovery publish, got {:?}", rig.mqtt.calls[1]);
    };
    assert_eq!(topic, &format!("{BASE}/config"));
    assert!(*retain);

    let doc: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(doc["~"], BASE);
    assert_eq!(doc["name"], "Rinnai");
    assert_eq!(doc["min_temp"], 37);
    assert_eq!(doc["max_temp"], 48);
    assert_eq!(doc["modes"], serde_json::json!(["off", "heat"]));
    assert_eq!(doc["availability_topic"], "~/availability");
    assert!(rig.sink.has(&AppEvent::Connected { discovery: payload.clone() }));

    assert_eq!(
        rig.mqtt.calls[2],
        MqttCall::Publish {
            topic: format!("{BASE}/availability"),
            payload: "online".into(),
            retain: true,
            qos: QoS::AtMostOnce,
        }
    );
}

#[test]
fn every_reconnect_repeats_discovery() {
    let mut rig = Rig::new();
    rig.mqtt.connect();
    rig.poll_at(0);
    rig.mqtt.connected = false;
    rig.mqtt.events.push_back(rinnai_gateway::app::ports::MqttEvent::Disconnected);
    rig.poll_at(100);
    rig.mqtt.connect();
    rig.poll_at(200);

    assert_eq!(rig.mqtt.published_to(&format!("{BASE}/config")).len(), 2);
    assert_eq!(rig.mqtt.published_to(&format!("{BASE}/availability")), vec!["online", "online"]);
    assert!(rig.sink.has(&AppEvent::Disconnected));
}

// ── State publication ─────────────────────────────────────────

#[test]
fn nothing_published_while_disconnected() {
    let mut rig = Rig::new();
    rig.poll_at(0);
    rig.poll_at(30_000);
    assert!(rig.state_publishes().is_empty());
    assert_eq!(rig.svc.last_published(), None);
}

#[test]
fn publishes_on_change_or_flush_interval() {
    let mut rig = Rig::new();
    rig.mqtt.connect();
    rig.poll_at(1_000);
    assert_eq!(rig.state_publishes().len(), 1);

    // Unchanged, inside the flush window.
    rig.poll_at(2_000);
    rig.poll_at(20_999);
    assert_eq!(rig.state_publishes().len(), 1);

    // Flush interval reached.
    rig.poll_at(21_000);
    assert_eq!(rig.state_publishes().len(), 2);

    // Changed content publishes at once.
    rig.dev.test_input = true;
    rig.poll_at(21_010);
    let docs = rig.state_publishes();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[2]["testPin"], "ON");
}

#[test]
fn rssi_alone_does_not_trigger_publish() {
    let mut rig = Rig::new();
    rig.mqtt.connect();
    rig.poll_at(0);
    rig.dev.rssi = Some(-80);
    rig.poll_at(500);

    let docs = rig.state_publishes();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["rssi"], -55);
}

#[test]
fn state_document_before_heater_frame() {
    let mut rig = Rig::new();
    rig.dev.ip = None;
    rig.mqtt.connect();
    rig.poll_at(0);

    let docs = rig.state_publishes();
    let doc = &docs[0];
    assert_eq!(doc["ip"], "0.0.0.0");
    assert_eq!(doc["testPin"], "OFF");
    assert_eq!(doc["enableTemperatureSync"], true);
    assert!(doc.get("currentTemperature").is_none());
    assert!(doc.get("mode").is_none());
    assert!(doc.get("heaterDelta").is_none());
}

#[test]
fn state_document_with_heater_and_panels() {
    let mut rig = Rig::new();
    rig.mqtt.connect();
    rig.bus.push(frame(BusTap::A, heater_bytes(42, true), 1_000));
    rig.bus.push(frame(BusTap::A, panel_bytes(), 1_060));
    rig.bus.push(frame(BusTap::B, panel_bytes(), 1_030));
    rig.poll_at(1_100);
    // A new reading changes the document, so this cycle publishes too.
    rig.bus.push(frame(BusTap::A, heater_bytes(43, true), 1_200));
    rig.poll_at(1_250);

    let docs = rig.state_publishes();
    let doc = docs.last().unwrap();
    assert_eq!(doc["ip"], "192.168.1.50");
    assert_eq!(docs.len(), 2);
    assert_eq!(doc["currentTemperature"], 43);
    assert_eq!(doc["targetTemperature"], 42);
    assert_eq!(doc["mode"], "heat");
    assert_eq!(doc["action"], "idle");
    assert_eq!(doc["activeId"], 1);
    assert_eq!(doc["heaterBytes"], heater_bytes(43, true).render().as_str());
    assert_eq!(doc["locControlId"], 2);
    assert_eq!(doc["locControlBytes"], panel_bytes().render().as_str());
    assert_eq!(doc["heaterDelta"], 200);
    assert_eq!(doc["remControlId"], 2);
    // Offsets into the 200 ms heater cycle.
    assert_eq!(doc["locControlTiming"], 30);
    assert_eq!(doc["remControlTiming"], 60);
}

#[test]
fn research_fields_can_be_disabled() {
    let config = GatewayConfig {
        report_research_fields: false,
        ..GatewayConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.mqtt.connect();
    rig.bus.push(frame(BusTap::A, heater_bytes(40, false), 10));
    rig.bus.push(frame(BusTap::B, panel_bytes(), 20));
    rig.poll_at(30);

    let docs = rig.state_publishes();
    let doc = &docs[0];
    assert_eq!(doc["currentTemperature"], 40);
    assert_eq!(doc["mode"], "off");
    assert_eq!(doc["action"], "off");
    assert!(doc.get("activeId").is_none());
    assert!(doc.get("heaterBytes").is_none());
    assert!(doc.get("locControlBytes").is_none());
    assert!(doc.get("heaterDelta").is_none());
    assert_eq!(doc["rssi"], -55);
}

#[test]
fn failed_publish_still_moves_baseline() {
    let mut rig = Rig::new();
    rig.mqtt.connect();
    rig.mqtt.fail_publish = true;
    rig.poll_at(0);

    assert!(rig.sink.has(&AppEvent::PublishFailed {
        what: Outbound::State,
        error: CommsError::MqttPublishFailed,
    }));
    assert!(rig.svc.last_published().is_some());

    // Same content: not retried before the flush interval.
    rig.mqtt.fail_publish = false;
    rig.poll_at(1_000);
    assert!(rig.state_publishes().is_empty());
    rig.poll_at(20_000);
    assert_eq!(rig.state_publishes().len(), 1);
}
