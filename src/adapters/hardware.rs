//! Hardware adapter: bridges the board to the device and clock ports.
//!
//! Owns the test input pin, the WiFi station and the monotonic clock,
//! exposing them through [`DevicePort`] and [`ClockPort`].  Generic over
//! any `embedded_hal` input pin, so host tests can hand in a fake.

use std::net::Ipv4Addr;

use embedded_hal::digital::InputPin;

use crate::app::ports::{ClockPort, DevicePort};
use crate::timing::Millis;

use super::time::MonotonicClock;
use super::wifi::WifiAdapter;

pub struct HardwareAdapter<P: InputPin> {
    test_pin: P,
    wifi: WifiAdapter,
    clock: MonotonicClock,
}

impl<P: InputPin> HardwareAdapter<P> {
    pub fn new(test_pin: P, wifi: WifiAdapter, clock: MonotonicClock) -> Self {
        Self { test_pin, wifi, clock }
    }

    pub fn wifi_mut(&mut self) -> &mut WifiAdapter {
        &mut self.wifi
    }

    /// Keep the station link up.  Call once per poll-loop iteration.
    pub fn poll_network(&mut self) {
        let now = self.clock.now_ms();
        self.wifi.poll(now);
    }
}

// ── DevicePort implementation ─────────────────────────────────

impl<P: InputPin> DevicePort for HardwareAdapter<P> {
    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.wifi.local_ip()
    }

    fn rssi(&self) -> Option<i8> {
        self.wifi.rssi()
    }

    fn test_input_active(&mut self) -> bool {
        // Active low; a read error counts as inactive.
        self.test_pin.is_low().unwrap_or(false)
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl<P: InputPin> ClockPort for HardwareAdapter<P> {
    fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }
}
