//! Mock servers for adapter integration testing
//!
//! The mock receiver simulates the YNC control endpoint, allowing full
//! integration testing without real hardware.

pub mod receiver;

pub use receiver::{MockMenuEntry, MockPlayInfo, MockReceiver};
