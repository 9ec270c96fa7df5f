//! gazepilot - gaze and voice control layer.
//!
//! Turns a noisy gaze-position stream and a speech-transcript stream into
//! discrete UI actions: a smoothed cursor, dwell clicks, edge scrolling,
//! a guided 9-point calibration and voice commands. The binary entry point
//! lives in `main.rs`; this crate exposes the modules for integration
//! testing.

pub mod backend;
pub mod clock;
pub mod config;
pub mod control;
pub mod controller;
pub mod engine;
pub mod error;
pub mod input_source;
pub mod mailbox;
pub mod notice;
pub mod state;

pub use controller::{Controller, Engines};
pub use error::{Error, Result};
