//! Rinnai Gateway firmware entry point.
//!
//! Hexagonal architecture with a single cooperative poll loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BusTapAdapter     MqttAdapter     HardwareAdapter             │
//! │  (BusPort)         (MqttPort)      (DevicePort + ClockPort)    │
//! │  LogEventSink + LogRouter (EventSink + LogControlPort)         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            GatewayService (pure logic)                 │    │
//! │  │  classify · state · sync · override · publish          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn, LevelFilter};

use rinnai_gateway::adapters::bus_tap::{BusTapAdapter, BUS};
use rinnai_gateway::adapters::device_id;
use rinnai_gateway::adapters::hardware::HardwareAdapter;
use rinnai_gateway::adapters::log_router;
use rinnai_gateway::adapters::log_sink::LogEventSink;
use rinnai_gateway::adapters::mqtt::{MqttAdapter, MQTT_EVENTS};
use rinnai_gateway::adapters::time::MonotonicClock;
use rinnai_gateway::adapters::wifi::WifiAdapter;
use rinnai_gateway::app::ports::ClockPort;
use rinnai_gateway::app::service::GatewayService;
use rinnai_gateway::config::GatewayConfig;
use rinnai_gateway::drivers::watchdog::Watchdog;
use rinnai_gateway::error::Error;
use rinnai_gateway::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    log_router::init(LevelFilter::Info)?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Rinnai Gateway v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = GatewayConfig::from_build_env();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 3. Device identity ────────────────────────────────────
    let mac = device_id::read_mac();
    let client_id = device_id::mqtt_client_id(&config.mqtt_client_id, &mac);
    info!("Device: {} (MQTT client id '{}')", device_id::hostname(&mac), client_id);

    // ── 4. Network ────────────────────────────────────────────
    let clock = MonotonicClock::new();
    let mut wifi = WifiAdapter::new(peripherals.modem, sys_loop, Some(nvs))?;
    wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)
        .map_err(Error::from)?;
    if let Err(e) = wifi.connect(clock.now_ms()) {
        // Keeps retrying from the poll loop.
        warn!("WiFi not up yet: {}", e);
    }
    // Armed after the blocking boot join; later joins never block the loop.
    let mut watchdog = Watchdog::new(config.watchdog_timeout_ms);

    // ── 5. Adapters ───────────────────────────────────────────
    // SAFETY: the test input GPIO is not claimed anywhere else.
    let mut test_pin = PinDriver::input(unsafe { AnyIOPin::new(pins::TEST_INPUT_GPIO) })?;
    test_pin.set_pull(Pull::Up)?;
    let mut hw = HardwareAdapter::new(test_pin, wifi, clock);

    // Frames reach BUS from the signal decoder tasks on the tap GPIOs.
    let mut bus = BusTapAdapter::new(&BUS);
    let mut mqtt = MqttAdapter::new(&config, &client_id, &MQTT_EVENTS);
    let mut sink = LogEventSink::new();

    // ── 6. Service ────────────────────────────────────────────
    let poll_interval_ms = config.poll_interval_ms;
    let mut service = GatewayService::new(config);
    service.start(&mut mqtt, &mut sink);
    mqtt.connect().map_err(Error::from)?;

    info!("Gateway ready. Entering poll loop.");

    // ── 7. Poll loop ──────────────────────────────────────────
    loop {
        hw.poll_network();
        service.poll(&mut bus, &mut mqtt, &mut hw, &mut sink);
        watchdog.feed(hw.now_ms());
        FreeRtos::delay_ms(poll_interval_ms);
    }
}
