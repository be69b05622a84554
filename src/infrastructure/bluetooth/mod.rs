//! Bluetooth Module
//!
//! The node's view of the wireless stack.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        BleStack                           │
//! │   (contract implemented by a real or simulated stack)     │
//! └─────────────────────┬────────────────────────────────────┘
//!                       │ NodeEvent over mpsc
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌─────────────┐ ┌────────────┐ ┌──────────┐
//! │ Advertising │ │ Simulator  │ │ Protocol │
//! │             │ │            │ │          │
//! │ - AD / SD   │ │ - Links    │ │ - UUIDs  │
//! │   records   │ │ - Pairing  │ │ - AD     │
//! │ - Encoding  │ │ - CCC      │ │   types  │
//! └─────────────┘ └────────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Constants for advertising data, HCI codes and UUID parsing
//! - [`advertising`] - The fixed advertising payload and its wire encoding
//! - [`simulator`] - In-process stack used by the binary and the tests

pub mod advertising;
pub mod protocol;
pub mod simulator;

use crate::domain::models::EventSender;
use advertising::AdvertisingPayload;
use crate::infrastructure::errno;
use thiserror::Error;

pub use advertising::PayloadError;
pub use simulator::SimulatedBleStack;

/// Errors reported by the wireless stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BleError {
    #[error("operation already in progress")]
    Already,
    #[error("stack not ready")]
    NotReady,
    #[error("invalid parameters")]
    InvalidParam,
    #[error("no resources")]
    NoResources,
    #[error("controller error {0}")]
    Controller(i32),
}

impl BleError {
    /// Negative errno-style status code, as printed in logs
    pub fn code(&self) -> i32 {
        match self {
            Self::Already => errno::EALREADY,
            Self::NotReady => errno::EAGAIN,
            Self::InvalidParam => errno::EINVAL,
            Self::NoResources => errno::ENOMEM,
            Self::Controller(code) => *code,
        }
    }
}

/// Advertising options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParams {
    pub connectable: bool,
    /// Interval bounds in 0.625 ms units
    pub interval_min: u16,
    pub interval_max: u16,
}

impl AdvertisingParams {
    /// Connectable undirected advertising at the stack's fast interval
    pub const CONNECTABLE: Self = Self {
        connectable: true,
        interval_min: 0x0030,
        interval_max: 0x0060,
    };
}

/// Pairing capabilities the node handles.
///
/// Any capability left `false` uses the stack's default behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthCallbacks {
    pub passkey_display: bool,
    pub passkey_entry: bool,
    pub passkey_confirm: bool,
    pub cancel: bool,
}

/// Wireless stack contract
///
/// Connection and pairing callbacks are delivered as [`NodeEvent`](crate::domain::models::NodeEvent)s
/// on the sender passed to [`BleStack::enable`]. The stack must not deliver a connect and
/// a disconnect for the same link concurrently.
pub trait BleStack: Send + Sync {
    /// Bring the stack up and start delivering events
    fn enable(&self, events: EventSender) -> Result<(), BleError>;

    /// Begin advertising the given payload
    fn start_advertising(
        &self,
        params: AdvertisingParams,
        payload: &AdvertisingPayload,
    ) -> Result<(), BleError>;

    /// Register the pairing callback set
    fn register_auth_callbacks(&self, callbacks: AuthCallbacks) -> Result<(), BleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BleError::Already.code(), -120);
        assert_eq!(BleError::NotReady.code(), -11);
        assert_eq!(BleError::Controller(-5).code(), -5);
    }
}
