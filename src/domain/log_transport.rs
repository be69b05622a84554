use tracing::info;

/// Reaction to the log backend's transport going up or down. Logging only.
pub fn backend_status_changed(enabled: bool) {
    if enabled {
        info!("BLE Logger Backend enabled.");
    } else {
        info!("BLE Logger Backend disabled.");
    }
}
