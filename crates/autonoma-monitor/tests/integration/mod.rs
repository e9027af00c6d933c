//! Integration tests for autonoma-monitor.
//!
//! These tests run the telemetry stream against an in-process WebSocket
//! server standing in for the backend.

pub mod common;
