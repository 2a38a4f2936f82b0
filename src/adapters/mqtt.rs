//! MQTT client adapter.
//!
//! Implements [`MqttPort`].  The ESP-IDF client runs its own task and
//! reports through a callback; the callback only pushes [`MqttEvent`]s
//! into a bounded `embassy-sync` channel, which the poll loop drains via
//! [`MqttPort::poll_event`].  Gateway state is never touched from the
//! MQTT task.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-process loopback for host-side runs.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::{MqttEvent, MqttPort, QoS};
use crate::config::GatewayConfig;
use crate::error::CommsError;

/// Broker events buffered between two polls.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Largest inbound payload accepted; command payloads are a few bytes.
pub const MAX_INBOUND_PAYLOAD: usize = 256;

pub type MqttEventQueue = Channel<CriticalSectionRawMutex, MqttEvent, EVENT_QUEUE_DEPTH>;

/// Queue used by the firmware image.
pub static MQTT_EVENTS: MqttEventQueue = Channel::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct Will {
    topic: String,
    payload: String,
    retain: bool,
    qos: QoS,
}

pub struct MqttAdapter {
    url: String,
    client_id: String,
    username: Option<String>,
    password: Option<String>,
    will: Option<Will>,
    events: &'static MqttEventQueue,
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    /// Simulation: topic filters subscribed so far.
    #[cfg(not(target_os = "espidf"))]
    subscriptions: Vec<String>,
}

impl MqttAdapter {
    pub fn new(config: &GatewayConfig, client_id: &str, events: &'static MqttEventQueue) -> Self {
        Self {
            url: config.mqtt_url.clone(),
            client_id: client_id.into(),
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            will: None,
            events,
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            subscriptions: Vec::new(),
        }
    }

    /// Start the client.  It reconnects on its own afterwards; every
    /// successful (re)connect arrives as [`MqttEvent::Connected`].
    pub fn connect(&mut self) -> Result<(), CommsError> {
        if self.will.is_none() {
            warn!("MQTT: connecting without a last will");
        }
        info!("MQTT: connecting to {} as '{}'", self.url, self.client_id);
        self.platform_connect()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::{
            Details, EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration,
        };

        let lwt = self.will.as_ref().map(|w| LwtConfiguration {
            topic: &w.topic,
            payload: w.payload.as_bytes(),
            qos: to_esp_qos(w.qos),
            retain: w.retain,
        });
        let conf = MqttClientConfiguration {
            client_id: Some(&self.client_id),
            username: self.username.as_deref(),
            password: self.password.as_deref(),
            lwt,
            ..Default::default()
        };

        let events = self.events;
        let connected = Arc::clone(&self.connected);
        let client = EspMqttClient::new_cb(&self.url, &conf, move |event| {
            let forwarded = match event.payload() {
                EventPayload::Connected(_) => {
                    connected.store(true, Ordering::Relaxed);
                    Some(MqttEvent::Connected)
                }
                EventPayload::Disconnected => {
                    connected.store(false, Ordering::Relaxed);
                    Some(MqttEvent::Disconnected)
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => inbound(topic, data),
                _ => None,
            };
            if let Some(ev) = forwarded {
                if events.try_send(ev).is_err() {
                    warn!("MQTT: event queue full, dropping event");
                }
            }
        })
        .map_err(|e| {
            warn!("MQTT: client start failed: {}", e);
            CommsError::MqttConnectFailed
        })?;

        self.client = Some(client);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        self.connected.store(true, Ordering::Relaxed);
        self.events
            .try_send(MqttEvent::Connected)
            .map_err(|_| CommsError::MqttConnectFailed)?;
        info!("MQTT(sim): connected");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttNotConnected)?;
        client
            .publish(topic, to_esp_qos(qos), retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish to '{}' failed: {}", topic, e);
                CommsError::MqttPublishFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool, _qos: QoS) -> Result<(), CommsError> {
        log::debug!("MQTT(sim): {} (retain={}) {}", topic, retain, payload);
        // Loop deliveries back like a broker would.
        if self.subscriptions.iter().any(|f| topic_matches(f, topic)) {
            let _ = self.events.try_send(MqttEvent::Message {
                topic: topic.into(),
                payload: payload.into(),
            });
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic_filter: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttNotConnected)?;
        client
            .subscribe(topic_filter, esp_idf_svc::mqtt::client::QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe to '{}' failed: {}", topic_filter, e);
                CommsError::MqttSubscribeFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic_filter: &str) -> Result<(), CommsError> {
        self.subscriptions.push(topic_filter.into());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// MqttPort
// ───────────────────────────────────────────────────────────────

impl MqttPort for MqttAdapter {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS) -> Result<(), CommsError> {
        if !self.connected() {
            return Err(CommsError::MqttNotConnected);
        }
        self.platform_publish(topic, payload, retain, qos)
    }

    fn subscribe(&mut self, topic_filter: &str) -> Result<(), CommsError> {
        if !self.connected() {
            return Err(CommsError::MqttNotConnected);
        }
        self.platform_subscribe(topic_filter)
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn set_will(&mut self, topic: &str, payload: &str, retain: bool, qos: QoS) {
        self.will = Some(Will {
            topic: topic.into(),
            payload: payload.into(),
            retain,
            qos,
        });
    }

    fn poll_event(&mut self) -> Option<MqttEvent> {
        self.events.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn to_esp_qos(qos: QoS) -> esp_idf_svc::mqtt::client::QoS {
    use esp_idf_svc::mqtt::client::QoS as Esp;
    match qos {
        QoS::AtMostOnce => Esp::AtMostOnce,
        QoS::AtLeastOnce => Esp::AtLeastOnce,
        QoS::ExactlyOnce => Esp::ExactlyOnce,
    }
}

/// Turn a raw delivery into a message event.  Oversized or non-UTF-8
/// payloads are dropped.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn inbound(topic: &str, data: &[u8]) -> Option<MqttEvent> {
    if data.len() > MAX_INBOUND_PAYLOAD {
        warn!("MQTT: dropping {} byte payload on '{}'", data.len(), topic);
        return None;
    }
    match core::str::from_utf8(data) {
        Ok(payload) => Some(MqttEvent::Message {
            topic: topic.into(),
            payload: payload.into(),
        }),
        Err(_) => {
            warn!("MQTT: non-UTF-8 payload on '{}'", topic);
            None
        }
    }
}

/// MQTT topic filter match supporting `+` and a trailing `#`.
#[cfg_attr(target_os = "espidf", allow(dead_code))]
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
