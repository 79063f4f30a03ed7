//! RN301 Control
//!
//! Control bridge for Yamaha R-N301 class network receivers, speaking the
//! YNC XML-over-HTTP protocol.
//!
//! This library provides:
//! - The request envelope, XML response tree and HTTP transport (`protocol`)
//! - A receiver adapter reconstructing power, volume, source and now-playing
//!   state, issuing commands and browsing Net Radio / Server menus
//! - A service loop that serializes polling and host commands
//! - An event bus announcing state changes

pub mod adapters;
pub mod bus;
pub mod config;
pub mod error;
pub mod protocol;
pub mod service;

pub use adapters::receiver::{ReceiverAdapter, ReceiverSnapshot, Source};
pub use error::ReceiverError;
