//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one topology or
//! subsystem against mock adapters. All tests run on the host with no
//! radio or board attached.

mod ipc_flow_tests;
mod link_tests;
mod mock_platform;
