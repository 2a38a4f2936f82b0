//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific part of the
//! gateway core against mock adapters.  All tests run on the host
//! (x86_64) with no real hardware required.

mod mock_hw;
mod publication_tests;
mod service_tests;
