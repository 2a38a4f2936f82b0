//! Application core: pure domain logic, zero I/O.
//!
//! Business rules of the gateway: frame classification, the observed
//! state model, temperature sync, override synthesis, and the MQTT
//! publish / command policy.  All interaction with the bus, the broker
//! and the board happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod classifier;
pub mod commands;
pub mod discovery;
pub mod events;
pub mod overrides;
pub mod ports;
pub mod publish;
pub mod service;
pub mod state;
pub mod sync;
