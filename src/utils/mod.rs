//! Utility functions and helpers
//!
//! This module contains logging setup for the server binary.

pub mod logging;

pub use logging::init_logging;
