//! Simulated BLE stack
//!
//! An in-process stand-in for the controller and host. It keeps just enough state
//! to behave like a real peripheral stack: advertising stops when a peer connects,
//! only one link can be open, and the log backend's transport goes down with the link.
//! The `peer_*` methods play the remote central.

use crate::domain::models::{ConnectionHandle, EventSender, NodeEvent, PeerAddress};
use crate::infrastructure::bluetooth::advertising::AdvertisingPayload;
use crate::infrastructure::bluetooth::protocol::{self, hci};
use crate::infrastructure::bluetooth::{AdvertisingParams, AuthCallbacks, BleError, BleStack};
use crate::infrastructure::log_backend::BleLogBackend;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Default)]
struct StackState {
    enabled: bool,
    advertising: bool,
    advertising_starts: u32,
    advertised: Option<(Vec<u8>, Vec<u8>)>,
    enable_failure: Option<BleError>,
    advertising_failures: Vec<BleError>,
    events: Option<EventSender>,
    auth: Option<AuthCallbacks>,
    link: Option<ConnectionHandle>,
    next_conn_id: u8,
}

pub struct SimulatedBleStack {
    state: Mutex<StackState>,
    log_backend: Option<Arc<BleLogBackend>>,
}

impl SimulatedBleStack {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StackState::default()),
            log_backend: None,
        }
    }

    /// Stack whose peer can subscribe to the log backend's notifications
    pub fn with_log_backend(log_backend: Arc<BleLogBackend>) -> Self {
        Self {
            state: Mutex::new(StackState::default()),
            log_backend: Some(log_backend),
        }
    }

    fn state(&self) -> MutexGuard<'_, StackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(state: &StackState, event: NodeEvent) {
        match &state.events {
            Some(events) => {
                if events.send(event).is_err() {
                    debug!("Event receiver dropped");
                }
            }
            None => warn!("Stack event before enable: {:?}", event),
        }
    }

    // Fault injection

    pub fn fail_enable(&self, error: BleError) {
        self.state().enable_failure = Some(error);
    }

    /// Queue a failure for the next advertising start
    pub fn fail_next_advertising(&self, error: BleError) {
        self.state().advertising_failures.push(error);
    }

    // Observation

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    pub fn is_advertising(&self) -> bool {
        self.state().advertising
    }

    /// Number of advertising start requests, failed ones included
    pub fn advertising_starts(&self) -> u32 {
        self.state().advertising_starts
    }

    /// Encoded AD and SD from the last successful advertising start
    pub fn advertised(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        self.state().advertised.clone()
    }

    pub fn auth_callbacks(&self) -> Option<AuthCallbacks> {
        self.state().auth
    }

    pub fn link(&self) -> Option<ConnectionHandle> {
        self.state().link.clone()
    }

    // Remote peer actions

    /// A central connects. Returns the new link, or `None` if the node is not connectable.
    pub fn peer_connect(&self, peer: PeerAddress) -> Option<ConnectionHandle> {
        let mut state = self.state();
        if !state.advertising || state.link.is_some() {
            debug!("Connection attempt from {} ignored, not connectable", peer);
            return None;
        }

        state.next_conn_id = state.next_conn_id.wrapping_add(1);
        let conn = ConnectionHandle {
            id: state.next_conn_id,
            peer,
        };
        state.advertising = false;
        state.link = Some(conn.clone());
        Self::emit(
            &state,
            NodeEvent::Connected {
                conn: conn.clone(),
                status: hci::SUCCESS,
            },
        );
        Some(conn)
    }

    /// A central's connection attempt fails with `status`. Advertising continues.
    pub fn peer_connect_failed(&self, peer: PeerAddress, status: u8) {
        let mut state = self.state();
        state.next_conn_id = state.next_conn_id.wrapping_add(1);
        let conn = ConnectionHandle {
            id: state.next_conn_id,
            peer,
        };
        Self::emit(&state, NodeEvent::Connected { conn, status });
    }

    /// The peer writes the CCC of the log characteristic
    pub fn peer_subscribe_logs(&self, enabled: bool) -> bool {
        if self.state().link.is_none() {
            return false;
        }
        match &self.log_backend {
            Some(backend) => {
                debug!(
                    "Notifications on {} {}",
                    protocol::LOG_TX_CHAR_UUID,
                    if enabled { "enabled" } else { "disabled" }
                );
                backend.set_transport_available(enabled);
                true
            }
            None => false,
        }
    }

    /// The peer aborts pairing on the open link
    pub fn peer_cancel_pairing(&self) -> bool {
        let state = self.state();
        let cancel_registered = state.auth.map(|auth| auth.cancel).unwrap_or(false);
        match (&state.link, cancel_registered) {
            (Some(conn), true) => {
                Self::emit(&state, NodeEvent::PairingCancelled { conn: conn.clone() });
                true
            }
            _ => false,
        }
    }

    /// The link drops with `reason`. Returns `false` if there was no link.
    pub fn disconnect(&self, reason: u8) -> bool {
        let conn = {
            let mut state = self.state();
            let Some(conn) = state.link.take() else {
                return false;
            };
            Self::emit(&state, NodeEvent::Disconnected { conn: conn.clone(), reason });
            conn
        };

        // Subscriptions do not survive the link
        if let Some(backend) = &self.log_backend {
            backend.set_transport_available(false);
        }
        debug!("Link {} to {} closed", conn.id, conn.peer);
        true
    }
}

impl Default for SimulatedBleStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BleStack for SimulatedBleStack {
    fn enable(&self, events: EventSender) -> Result<(), BleError> {
        let mut state = self.state();
        if let Some(error) = state.enable_failure {
            return Err(error);
        }
        if state.enabled {
            return Err(BleError::Already);
        }
        state.enabled = true;
        state.events = Some(events);
        debug!("Simulated stack enabled");
        Ok(())
    }

    fn start_advertising(
        &self,
        params: AdvertisingParams,
        payload: &AdvertisingPayload,
    ) -> Result<(), BleError> {
        let mut state = self.state();
        state.advertising_starts += 1;

        if !state.advertising_failures.is_empty() {
            return Err(state.advertising_failures.remove(0));
        }
        if !state.enabled {
            return Err(BleError::NotReady);
        }
        if state.advertising {
            return Err(BleError::Already);
        }
        if params.connectable && state.link.is_some() {
            return Err(BleError::NoResources);
        }

        let ad = payload
            .encode_advertisement()
            .map_err(|_| BleError::InvalidParam)?;
        let sd = payload
            .encode_scan_response()
            .map_err(|_| BleError::InvalidParam)?;

        state.advertising = true;
        state.advertised = Some((ad, sd));
        Ok(())
    }

    fn register_auth_callbacks(&self, callbacks: AuthCallbacks) -> Result<(), BleError> {
        let mut state = self.state();
        if state.auth.is_some() {
            return Err(BleError::Already);
        }
        state.auth = Some(callbacks);
        Ok(())
    }
}
