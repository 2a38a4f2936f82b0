//! WiFi station-mode adapter.
//!
//! Joins the configured access point and keeps the link up.  Provides the
//! station address and signal strength that end up in the state document.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over `EspWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.  Retries run from the poll loop,
//! so they only start the association and check on it in later polls;
//! only the first connection at boot blocks.

use core::fmt;
use std::net::Ipv4Addr;

use log::{error, info, warn};

use crate::error::{CommsError, Error};
use crate::timing::{age, Millis};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        match e {
            ConnectivityError::ConnectionFailed => Error::Comms(CommsError::WifiConnectFailed),
            ConnectivityError::NoCredentials => Error::Config("WiFi SSID not set"),
            ConnectivityError::InvalidSsid => Error::Config("WiFi SSID invalid"),
            ConnectivityError::InvalidPassword => Error::Config("WiFi password invalid"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    /// Waiting until `retry_at_ms` before the next attempt.
    Reconnecting { attempt: u32, retry_at_ms: Millis },
    /// Association started; given up on at `deadline_ms`.
    Connecting { attempt: u32, deadline_ms: Millis },
}

const INITIAL_BACKOFF_MS: Millis = 2_000;
const MAX_BACKOFF_MS: Millis = 60_000;
const CONNECT_TIMEOUT_MS: Millis = 15_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    let printable = ssid.bytes().all(|b| (0x20..=0x7E).contains(&b));
    if ssid.is_empty() || ssid.len() > 32 || !printable {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: Millis,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: link drops on demand.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_ap_reachable: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sys_loop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    ) -> Result<Self, Error> {
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), nvs)
            .map_err(|_| Error::Init("EspWifi::new failed"))?;
        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)
            .map_err(|_| Error::Init("BlockingWifi::wrap failed"))?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: INITIAL_BACKOFF_MS,
            sim_link_up: false,
            sim_ap_reachable: true,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Blocking first connection.  On failure the adapter is left in
    /// reconnect mode, so [`poll`](Self::poll) keeps trying.
    pub fn connect(&mut self, now: Millis) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.on_connected();
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.schedule_retry(0, now);
                Err(e)
            }
        }
    }

    /// Drive reconnection.  Call once per poll-loop iteration.
    pub fn poll(&mut self, now: Millis) {
        match self.state {
            WifiState::Connected if !self.platform_is_connected() => {
                warn!("WiFi: connection lost, entering reconnect");
                self.backoff_ms = INITIAL_BACKOFF_MS;
                self.schedule_retry(0, now);
            }
            WifiState::Reconnecting { attempt, retry_at_ms } => {
                if (age(now, retry_at_ms) as i32) < 0 {
                    return;
                }
                info!("WiFi: reconnect attempt {} (backoff {} ms)", attempt, self.backoff_ms);
                match self.platform_start_connect() {
                    Ok(()) if self.platform_is_connected() => self.on_connected(),
                    Ok(()) => {
                        self.state = WifiState::Connecting {
                            attempt,
                            deadline_ms: now.wrapping_add(CONNECT_TIMEOUT_MS),
                        };
                    }
                    Err(_) => self.retry_later(attempt, now),
                }
            }
            WifiState::Connecting { attempt, deadline_ms } => {
                if self.platform_is_connected() {
                    self.on_connected();
                } else if (age(now, deadline_ms) as i32) >= 0 {
                    warn!("WiFi: attempt {} timed out", attempt);
                    self.retry_later(attempt, now);
                }
            }
            _ => {}
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    /// Station address while associated.
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        if !self.is_connected() {
            return None;
        }
        self.platform_ip()
    }

    /// Signal strength of the current AP in dBm.
    pub fn rssi(&self) -> Option<i8> {
        if !self.is_connected() {
            return None;
        }
        self.platform_rssi()
    }

    fn on_connected(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        info!("WiFi: connected, ip={:?} rssi={:?}", self.platform_ip(), self.platform_rssi());
    }

    fn retry_later(&mut self, attempt: u32, now: Millis) {
        self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
        self.schedule_retry(attempt + 1, now);
    }

    fn schedule_retry(&mut self, attempt: u32, now: Millis) {
        self.state = WifiState::Reconnecting {
            attempt,
            retry_at_ms: now.wrapping_add(self.backoff_ms),
        };
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn client_configuration(&self) -> Result<esp_idf_svc::wifi::Configuration, ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        Ok(Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        }))
    }

    /// Boot-time join: waits for association and an address.
    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let conf = self.client_configuration()?;
        self.wifi.set_configuration(&conf).map_err(esp_failed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(esp_failed)?;
        }
        self.wifi.connect().map_err(esp_failed)?;
        self.wifi.wait_netif_up().map_err(esp_failed)?;
        Ok(())
    }

    /// Poll-loop join: kicks off association on the driver and returns.
    /// Progress is read back through `platform_is_connected`.
    #[cfg(target_os = "espidf")]
    fn platform_start_connect(&mut self) -> Result<(), ConnectivityError> {
        let conf = self.client_configuration()?;
        let driver = self.wifi.wifi_mut();
        driver.set_configuration(&conf).map_err(esp_failed)?;
        if !driver.is_started().unwrap_or(false) {
            driver.start().map_err(esp_failed)?;
        }
        // Abandon any association left over from a timed-out attempt.
        let _ = driver.disconnect();
        driver.connect().map_err(esp_failed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if !self.sim_ap_reachable {
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_link_up = true;
        info!("WiFi(sim): connected to '{}'", self.ssid);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_connect(&mut self) -> Result<(), ConnectivityError> {
        self.sim_link_up = self.sim_ap_reachable;
        Ok(())
    }

    /// Associated and holding an address.
    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.wifi.wifi().sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        self.sim_link_up.then_some(Ipv4Addr::new(192, 168, 1, 77))
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (rc == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        self.sim_link_up.then_some(-60)
    }

    /// Simulation: drop the link as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    /// Simulation: whether join attempts find the AP.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_ap_reachable(&mut self, reachable: bool) {
        self.sim_ap_reachable = reachable;
    }
}

#[cfg(target_os = "espidf")]
fn esp_failed(e: esp_idf_svc::sys::EspError) -> ConnectivityError {
    warn!("WiFi: {}", e);
    ConnectivityError::ConnectionFailed
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
