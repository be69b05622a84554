use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;

/// Bluetooth LE device address as reported by the stack.
///
/// `bytes` is stored most significant byte first, the same order it is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub bytes: [u8; 6],
    pub kind: AddressKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Public,
    Random,
}

impl PeerAddress {
    pub const fn new(bytes: [u8; 6], kind: AddressKind) -> Self {
        Self { bytes, kind }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        let kind = match self.kind {
            AddressKind::Public => "public",
            AddressKind::Random => "random",
        };
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X} ({})",
            b[0], b[1], b[2], b[3], b[4], b[5], kind
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid peer address: {0:?}")]
pub struct AddressParseError(pub String);

impl FromStr for PeerAddress {
    type Err = AddressParseError;

    /// Accepts `AA:BB:CC:DD:EE:FF`, optionally followed by ` (public)` or ` (random)`.
    /// Addresses without a suffix are treated as random.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || AddressParseError(s.to_string());
        let trimmed = s.trim();

        let (hex, kind) = match trimmed.split_once(' ') {
            Some((hex, "(public)")) => (hex, AddressKind::Public),
            Some((hex, "(random)")) => (hex, AddressKind::Random),
            Some(_) => return Err(err()),
            None => (trimmed, AddressKind::Random),
        };

        let mut bytes = [0u8; 6];
        let mut parts = hex.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 {
                return Err(err());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self { bytes, kind })
    }
}

/// Reference to the single live peer link.
///
/// Only the connection lifecycle keeps one of these beyond the event that delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub id: u8,
    pub peer: PeerAddress,
}

/// One accelerometer reading in m/s^2.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Advertising,
    Connected,
    Disconnecting,
}

/// Events delivered to the node dispatcher.
///
/// Data-ready triggers are absent: samples are read in the driver's own
/// context instead of being queued.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    Connected { conn: ConnectionHandle, status: u8 },
    Disconnected { conn: ConnectionHandle, reason: u8 },
    PairingCancelled { conn: ConnectionHandle },
    TransportAvailabilityChanged(bool),
}

pub type EventSender = mpsc::UnboundedSender<NodeEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<NodeEvent>;
