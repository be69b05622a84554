//! Connection lifecycle
//!
//! Tracks the single peer slot through `Idle → Advertising → Connected →
//! Disconnecting → Advertising`. This is the only code that stores or clears the
//! [`ConnectionHandle`]; it is driven exclusively by the node dispatcher.

use crate::domain::advertising::Advertiser;
use crate::domain::models::{ConnectionHandle, LinkState};
use crate::infrastructure::bluetooth::protocol::hci;
use crate::infrastructure::bluetooth::BleError;
use tracing::{error, info, warn};

pub struct ConnectionLifecycle {
    state: LinkState,
    current: Option<ConnectionHandle>,
    advertiser: Advertiser,
}

impl ConnectionLifecycle {
    pub fn new(advertiser: Advertiser) -> Self {
        Self {
            state: LinkState::Idle,
            current: None,
            advertiser,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The live link, if any
    pub fn current(&self) -> Option<&ConnectionHandle> {
        self.current.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    /// Make the node discoverable for the first time
    pub fn start(&mut self) {
        self.advertise();
    }

    pub fn on_connected(&mut self, conn: ConnectionHandle, status: u8) {
        if status != hci::SUCCESS {
            // The stack keeps advertising after a failed attempt
            error!("Connection failed (err 0x{:02x})", status);
            return;
        }

        info!("Connected: {}", conn.peer);
        if let Some(stale) = self.current.replace(conn) {
            warn!("Dropping stale link {} to {}", stale.id, stale.peer);
        }
        self.state = LinkState::Connected;
    }

    pub fn on_disconnected(&mut self, conn: ConnectionHandle, reason: u8) {
        self.state = LinkState::Disconnecting;

        match self.current.take() {
            Some(held) if held.id != conn.id => {
                warn!("Disconnect for link {} while holding link {}", conn.id, held.id)
            }
            _ => {}
        }
        info!("Disconnected (reason 0x{:02x})", reason);

        // Resume discoverability; a failure here is only logged
        self.advertise();
    }

    fn advertise(&mut self) {
        self.state = match self.advertiser.start() {
            // The stack is still advertising from before
            Ok(()) | Err(BleError::Already) => LinkState::Advertising,
            Err(_) => LinkState::Idle,
        };
    }
}
