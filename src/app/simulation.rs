//! Demo drivers for the simulated hardware
//!
//! The binary has no radio or accelerometer attached, so these tasks play the
//! outside world: an interrupt line that raises data-ready at the sensor's output
//! data rate, a central that connects, subscribes to logs and leaves, and a reader
//! for the notification stream the central would receive.

use crate::domain::models::{AccelSample, PeerAddress};
use crate::domain::settings::SimulationSettings;
use crate::infrastructure::bluetooth::protocol::hci;
use crate::infrastructure::bluetooth::SimulatedBleStack;
use crate::infrastructure::sensor::simulator::SimulatedAccelerometer;
use crate::infrastructure::sensor::SensorError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const STANDARD_GRAVITY: f64 = 9.80665;

/// Slowly tumbling gravity vector, `t` in seconds
pub fn synthetic_sample(t: f64) -> AccelSample {
    let pitch = (t * 0.2).sin() * 0.6;
    let roll = (t * 0.13).cos() * 0.4;
    AccelSample {
        x: STANDARD_GRAVITY * pitch.sin(),
        y: STANDARD_GRAVITY * pitch.cos() * roll.sin(),
        z: STANDARD_GRAVITY * pitch.cos() * roll.cos(),
    }
}

/// Handle to the thread raising data-ready
pub struct InterruptLine {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InterruptLine {
    /// Start raising data-ready on its own thread, paced by the sensor's current rate
    pub fn spawn(accel: Arc<SimulatedAccelerometer>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let running = stop.clone();
        let thread = std::thread::Builder::new()
            .name("accel-irq".to_string())
            .spawn(move || {
                let mut t = 0.0;
                while !running.load(Ordering::Acquire) {
                    let period = Duration::from_secs_f64(1.0 / f64::from(accel.odr_hz().max(1)));
                    std::thread::sleep(period);
                    t += period.as_secs_f64();
                    accel.push_sample(synthetic_sample(t));
                }
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Interrupt thread panicked");
            }
        }
    }
}

/// Play a central for the configured number of sessions
pub async fn run_peer_sessions(
    ble: Arc<SimulatedBleStack>,
    accel: Arc<SimulatedAccelerometer>,
    settings: SimulationSettings,
) {
    let peer: PeerAddress = match settings.peer_address.parse() {
        Ok(peer) => peer,
        Err(e) => {
            warn!("Simulated peer disabled: {}", e);
            return;
        }
    };
    let connect_delay = Duration::from_millis(settings.connect_delay_ms);
    let session_length = Duration::from_millis(settings.session_ms);

    let mut session = 0u32;
    while settings.sessions.map_or(true, |max| session < max) {
        session += 1;
        tokio::time::sleep(connect_delay).await;

        // The first attempt never completes, like a central walking out of range
        if session == 1 {
            ble.peer_connect_failed(peer, hci::CONN_FAIL_TO_ESTABLISH);
            tokio::time::sleep(connect_delay).await;
        }

        let Some(conn) = ble.peer_connect(peer) else {
            debug!("Session {}: node not connectable", session);
            continue;
        };
        debug!("Session {}: link {} open", session, conn.id);

        ble.peer_subscribe_logs(true);
        if settings.cancel_pairing {
            ble.peer_cancel_pairing();
        }
        if settings.inject_read_failure {
            accel.fail_next_read(SensorError::Io);
        }

        tokio::time::sleep(session_length).await;
        ble.disconnect(hci::REMOTE_USER_TERMINATED);
    }

    info!("Simulated peer done after {} sessions", session);
}

/// Copy notification lines to `out` until the backend goes away.
///
/// Must not log through `tracing`: every record would come straight back here.
pub async fn forward_link_output<W>(
    mut lines: mpsc::UnboundedReceiver<String>,
    mut out: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        out.write_all(b"[nus] ").await?;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}
