//! Accelerometer log node
//!
//! A connectable BLE peripheral that samples a 3-axis accelerometer on every
//! data-ready interrupt and streams its log records to a subscribed peer.

pub mod app;
pub mod domain;
pub mod infrastructure;
