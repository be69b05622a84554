use crate::domain::models::ConnectionHandle;
use crate::infrastructure::bluetooth::AuthCallbacks;
use tracing::info;

/// Capability set registered with the stack: only pairing cancellation is handled
pub fn callbacks() -> AuthCallbacks {
    AuthCallbacks {
        cancel: true,
        ..AuthCallbacks::default()
    }
}

pub fn on_pairing_cancelled(conn: &ConnectionHandle) {
    info!("Pairing cancelled: {}", conn.peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AddressKind, PeerAddress};
    use crate::infrastructure::log_backend::capture::LogCapture;

    #[test]
    fn test_only_cancel_is_registered() {
        let cb = callbacks();
        assert!(cb.cancel);
        assert!(!cb.passkey_display && !cb.passkey_entry && !cb.passkey_confirm);
    }

    #[test]
    fn test_cancel_logs_peer_address() {
        let mut logs = LogCapture::start();
        let conn = ConnectionHandle {
            id: 3,
            peer: PeerAddress::new([0xC0, 0x11, 0x22, 0x33, 0x44, 0x55], AddressKind::Random),
        };

        on_pairing_cancelled(&conn);

        let lines = logs.drain();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("<inf> auth: Pairing cancelled: C0:11:22:33:44:55 (random)"));
    }
}
