//! Integration tests: bus ingestion, temperature sync and overrides.

use rinnai_gateway::app::events::AppEvent;
use rinnai_gateway::app::overrides::OverrideCommand;
use rinnai_gateway::app::ports::{BusTap, TapDiagnostics};
use rinnai_gateway::app::service::GatewayService;
use rinnai_gateway::app::state::ControlSlot;
use rinnai_gateway::config::GatewayConfig;
use rinnai_gateway::error::{OverrideError, PacketError};

use crate::mock_hw::{frame, heater_bytes, panel_bytes, MockBus, MockDevice, MockMqtt, RecordingSink};

struct Rig {
    svc: GatewayService,
    bus: MockBus,
    mqtt: MockMqtt,
    dev: MockDevice,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            svc: GatewayService::new(GatewayConfig::default()),
            bus: MockBus::new(),
            mqtt: MockMqtt::new(),
            dev: MockDevice::new(),
            sink: RecordingSink::new(),
        }
    }

    fn poll_at(&mut self, now: u32) {
        self.dev.now_ms = now;
        self.svc.poll(&mut self.bus, &mut self.mqtt, &mut self.dev, &mut self.sink);
    }

    fn command(&mut self, segment: &str, payload: &str, now: u32) {
        let topic = format!("{}/{}", self.svc.topics().base, segment);
        self.mqtt.deliver(&topic, payload);
        self.poll_at(now);
    }

    /// Heater reporting `celsius` on tap A and a local panel frame on tap B.
    fn observe(&mut self, celsius: i32, power_on: bool, at: u32) {
        self.bus.push(frame(BusTap::A, heater_bytes(celsius, power_on), at));
        self.bus.push(frame(BusTap::B, panel_bytes(), at));
        self.poll_at(at);
    }
}

// ── Ingestion ─────────────────────────────────────────────────

#[test]
fn malformed_frame_is_rejected_without_state_change() {
    let mut rig = Rig::new();
    let mut bad = frame(BusTap::A, heater_bytes(42, true), 100);
    bad.valid_parity = false;
    rig.bus.push(bad);
    rig.poll_at(100);

    let state = rig.svc.state();
    assert_eq!(state.heater_count(), 0);
    assert!(state.heater().is_none());
    assert!(state.target_temperature().is_none());
    assert!(rig.sink.has(&AppEvent::PacketRejected {
        packet: bad,
        reason: PacketError::MalformedPacket,
    }));
}

#[test]
fn unknown_source_tag_is_rejected() {
    let mut rig = Rig::new();
    let junk = frame(BusTap::A, rinnai_gateway::protocol::PacketBytes::new([0x00, 0x00, 0x00]), 5);
    rig.bus.push(junk);
    rig.poll_at(5);

    assert_eq!(rig.svc.state().unknown_count(), 0);
    assert!(rig.sink.has(&AppEvent::PacketRejected {
        packet: junk,
        reason: PacketError::DecodeRejected,
    }));
}

#[test]
fn heater_frame_on_panel_tap_is_filed_as_unknown() {
    let mut rig = Rig::new();
    rig.bus.push(frame(BusTap::B, heater_bytes(42, true), 250));
    rig.poll_at(250);

    let state = rig.svc.state();
    assert!(state.heater().is_none());
    assert_eq!(state.unknown_count(), 1);
    assert_eq!(state.unknown().unwrap().bytes, heater_bytes(42, true));
}

#[test]
fn panel_slot_follows_tap() {
    let mut rig = Rig::new();
    rig.bus.push(frame(BusTap::A, panel_bytes(), 10));
    rig.bus.push(frame(BusTap::B, panel_bytes(), 20));
    rig.poll_at(20);

    let state = rig.svc.state();
    assert_eq!(state.remote_control().unwrap().at_ms, 10);
    assert_eq!(state.local_control().unwrap().at_ms, 20);
    assert_eq!((state.remote_count(), state.local_count()), (1, 1));
}

#[test]
fn first_heater_frame_initialises_target() {
    let mut rig = Rig::new();
    rig.bus.push(frame(BusTap::A, heater_bytes(42, true), 100));
    rig.poll_at(100);
    assert_eq!(rig.svc.state().target_temperature(), Some(42));
    assert!(rig.sink.has(&AppEvent::TargetInitialised(42)));

    // Later frames leave the target alone.
    rig.bus.push(frame(BusTap::A, heater_bytes(45, true), 300));
    rig.poll_at(300);
    assert_eq!(rig.svc.state().target_temperature(), Some(42));
    assert_eq!(rig.svc.state().heater_delta_ms(), 200);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::TargetInitialised(_))), 1);
}

#[test]
fn parsed_events_only_at_parsed_level() {
    let mut rig = Rig::new();
    rig.observe(42, true, 100);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::HeaterParsed(_))), 0);

    rig.command("log_level", "parsed", 150);
    rig.observe(42, true, 200);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::HeaterParsed(_))), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ControlParsed { slot: ControlSlot::Local, .. })),
        1
    );
}

#[test]
fn raw_level_reports_decoder_diagnostics_for_both_taps() {
    let mut rig = Rig::new();
    rig.bus.diagnostics = TapDiagnostics {
        pulse_errors: 3,
        bit_errors: 1,
        packet_errors: 2,
        queued: 0,
        free: 16,
    };
    rig.command("log_level", "raw", 10);
    rig.poll_at(20);

    assert!(rig.sink.has(&AppEvent::DecoderDiagnostics {
        tap: BusTap::A,
        diagnostics: rig.bus.diagnostics,
    }));
    assert!(rig.sink.has(&AppEvent::DecoderDiagnostics {
        tap: BusTap::B,
        diagnostics: rig.bus.diagnostics,
    }));
}

// ── Temperature sync ──────────────────────────────────────────

#[test]
fn sync_presses_temp_up_once_per_heater_frame() {
    let mut rig = Rig::new();
    rig.observe(39, true, 1_000);
    assert!(rig.bus.sent.is_empty());

    rig.command("temp", "40", 1_100);
    assert_eq!(rig.svc.state().target_temperature(), Some(40));

    let pressed = rig.bus.sent.last().copied().unwrap();
    let original = panel_bytes();
    assert_eq!(pressed, original.with_temp_up_pressed());
    // Only the temp-up bit differs from the genuine panel frame.
    let diff: Vec<u8> = pressed
        .as_bytes()
        .iter()
        .zip(original.as_bytes())
        .map(|(a, b)| a ^ b)
        .collect();
    assert_eq!(diff, vec![0x00, 0x04, 0x00]);
    assert!(rig.sink.has(&AppEvent::OverrideSent {
        command: OverrideCommand::TempUp,
        bytes: pressed,
    }));
}

#[test]
fn sync_presses_temp_down_above_target() {
    let mut rig = Rig::new();
    rig.observe(45, true, 1_000);
    rig.command("temp", "43", 1_050);
    assert_eq!(rig.bus.sent, vec![panel_bytes().with_temp_down_pressed()]);
}

#[test]
fn sync_stops_once_heater_matches() {
    let mut rig = Rig::new();
    rig.observe(39, true, 1_000);
    rig.command("temp", "40", 1_100);
    assert_eq!(rig.bus.sent.len(), 1);
    rig.bus.transmit();

    rig.observe(40, true, 1_500);
    assert_eq!(rig.bus.sent.len(), 1);
}

#[test]
fn stale_panel_frame_blocks_override() {
    let mut rig = Rig::new();
    rig.observe(39, true, 1_000);
    rig.command("temp", "41", 1_600);

    // The sync controller sees the stale panel frame and stays quiet.
    assert!(rig.bus.sent.is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::OverrideFailed { .. })), 0);
}

#[test]
fn direct_override_on_stale_panel_frame_fails() {
    let mut rig = Rig::new();
    rig.observe(39, true, 1_000);

    let result = rig
        .svc
        .request_override(OverrideCommand::TempUp, &mut rig.bus, 1_600, &mut rig.sink);
    assert_eq!(result, Err(OverrideError::StaleOriginal { age_ms: 600 }));
    assert!(rig.bus.sent.is_empty());
    assert!(rig.sink.has(&AppEvent::OverrideFailed {
        command: OverrideCommand::TempUp,
        error: OverrideError::StaleOriginal { age_ms: 600 },
    }));
}

#[test]
fn sync_disabled_sends_nothing() {
    let mut rig = Rig::new();
    rig.command("temperature_sync", "off", 900);
    assert!(!rig.svc.state().temperature_sync_enabled());
    rig.observe(39, true, 1_000);
    rig.command("temp", "45", 1_050);

    assert_eq!(rig.svc.state().target_temperature(), Some(45));
    assert!(rig.bus.sent.is_empty());
}

#[test]
fn pending_override_reports_busy() {
    let mut rig = Rig::new();
    rig.observe(39, true, 1_000);
    rig.command("temp", "42", 1_050);
    assert_eq!(rig.bus.sent.len(), 1);

    // Transmitter has not taken the first frame yet.
    rig.observe(39, true, 1_200);
    assert_eq!(rig.bus.sent.len(), 1);
    assert!(rig.sink.has(&AppEvent::OverrideFailed {
        command: OverrideCommand::TempUp,
        error: OverrideError::Busy,
    }));
}

// ── Mode / priority ───────────────────────────────────────────

#[test]
fn mode_toggles_power_only_when_needed() {
    let mut rig = Rig::new();
    rig.observe(42, false, 1_000);

    rig.command("mode", "off", 1_050);
    assert!(rig.bus.sent.is_empty());

    rig.command("mode", "heat", 1_100);
    assert_eq!(rig.bus.sent, vec![panel_bytes().with_power_toggle_pressed()]);
}

#[test]
fn mode_off_while_on_toggles_power() {
    let mut rig = Rig::new();
    rig.observe(42, true, 1_000);
    rig.command("mode", "off", 1_010);
    assert_eq!(rig.bus.sent, vec![panel_bytes().with_power_toggle_pressed()]);
}

#[test]
fn mode_before_heater_status_is_ignored() {
    let mut rig = Rig::new();
    rig.command("mode", "heat", 10);
    assert!(rig.bus.sent.is_empty());
    assert!(rig.sink.has(&AppEvent::CommandIgnored {
        command: "mode",
        reason: "no heater status yet",
    }));
}

#[test]
fn mode_with_unknown_payload_does_nothing() {
    let mut rig = Rig::new();
    rig.observe(42, false, 1_000);
    rig.command("mode", "cool", 1_010);
    assert!(rig.bus.sent.is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::OverrideFailed { .. })), 0);
}

#[test]
fn priority_presses_priority_bit() {
    let mut rig = Rig::new();
    rig.observe(42, true, 1_000);
    rig.command("priority", "", 1_020);
    assert_eq!(rig.bus.sent, vec![panel_bytes().with_priority_pressed()]);
}

#[test]
fn priority_without_panel_frame_fails() {
    let mut rig = Rig::new();
    rig.command("priority", "", 20);
    assert!(rig.bus.sent.is_empty());
    assert!(rig.sink.has(&AppEvent::OverrideFailed {
        command: OverrideCommand::Priority,
        error: OverrideError::NoOriginal,
    }));
}
