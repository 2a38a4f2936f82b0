//! GPIO assignments for the gateway board.
//!
//! Single source of truth; the entry point and the decoder wiring both
//! reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Bus taps (two-wire heater bus, level-shifted)
// ---------------------------------------------------------------------------

/// Tap A input: heater side, hears the heater and every panel.
pub const BUS_TAP_A_RX_GPIO: i32 = 18;
/// Tap B input: local panel side.
pub const BUS_TAP_B_RX_GPIO: i32 = 19;
/// Tap B output: drives override frames onto the local panel segment.
pub const BUS_TAP_B_TX_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// Test input, active low with internal pull-up.  Reported as `testPin`.
pub const TEST_INPUT_GPIO: i32 = 13;
