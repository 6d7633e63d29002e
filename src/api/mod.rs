//! API module for HTTP and WebSocket endpoints
//!
//! This module provides the real-time WebSocket hub and its small HTTP surface.

pub mod http;
pub mod websocket;
