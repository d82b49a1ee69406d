//! Servo Tester Library
//!
//! Shared modules for the 7-channel servo control panel

pub mod config_loader;
pub mod error;
pub mod gui;
pub mod panel;
pub mod ports;
pub mod protocol;
pub mod reader;
pub mod transport;
pub mod validation;
