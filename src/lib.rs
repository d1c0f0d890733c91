//! Mood display firmware for the XTeInk X4 e-paper reader
//!
//! Inbound MQTT events update a [`state::DisplayState`]; the control loop in
//! [`app`] redraws the panel when the state changes, rate limited so the
//! e-paper is not refreshed more often than it can handle.

pub mod app;
pub mod battery;
pub mod config;
pub mod ingest;
pub mod layout;
pub mod mood;
pub mod mqtt;
pub mod panel;
pub mod policy;
pub mod render;
pub mod scheduler;
pub mod ssd1677;
pub mod state;
pub mod wifi;
