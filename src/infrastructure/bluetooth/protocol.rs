//! BLE protocol constants
//!
//! Advertising data types, flag bits, HCI status codes and the UUID of the
//! service the log backend exposes to the peer.

use thiserror::Error;

/// Nordic UART Service UUID, advertised so host tools can find the log stream
pub const LOG_SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// NUS TX characteristic UUID - log lines are notified here
pub const LOG_TX_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Maximum size of a legacy advertising or scan response payload
pub const MAX_LEGACY_ADV_LEN: usize = 31;

/// Advertising data (AD) types used by this node
pub mod ad_type {
    pub const FLAGS: u8 = 0x01;
    pub const UUID128_ALL: u8 = 0x07;
    pub const NAME_COMPLETE: u8 = 0x09;
}

/// Flags record bits
pub mod ad_flags {
    pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
    pub const NO_BREDR: u8 = 0x04;
}

/// HCI status and disconnect reason codes
pub mod hci {
    pub const SUCCESS: u8 = 0x00;
    pub const CONNECTION_TIMEOUT: u8 = 0x08;
    pub const REMOTE_USER_TERMINATED: u8 = 0x13;
    pub const LOCAL_HOST_TERMINATED: u8 = 0x16;
    pub const CONN_FAIL_TO_ESTABLISH: u8 = 0x3E;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid UUID format: {0:?}")]
pub struct UuidError(pub String);

/// Parse a UUID string into the 16 little-endian bytes used on air
pub fn parse_uuid(uuid_str: &str) -> Result<[u8; 16], UuidError> {
    let hex = uuid_str.replace('-', "");

    if hex.len() != 32 || !hex.is_ascii() {
        return Err(UuidError(uuid_str.to_string()));
    }

    let mut bytes = [0u8; 16];
    for (i, byte) in bytes.iter_mut().rev().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|_| UuidError(uuid_str.to_string()))?;
    }

    Ok(bytes)
}
