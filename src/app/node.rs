//! Node startup and event dispatch
//!
//! [`Node::start`] runs the one-shot bring-up sequence. Its outcome keeps three kinds
//! of failure apart:
//!
//! - `Err(NodeError)`: the sensor is not ready or the radio failed to come up. The
//!   node never becomes reachable.
//! - `Ok(Startup::Halted(_))`: sampling could not be configured. Startup stops
//!   before the idle loop; advertising may already be running.
//! - `Ok(Startup::Running(_))`: everything is armed. Advertising failures end up
//!   here too, because they are logged and otherwise ignored.
//!
//! [`RunningNode::run_until`] is the idle loop. It sleeps between idle ticks and hands
//! each queued [`NodeEvent`] to its handler. Data-ready events are not queued; the
//! sensor driver runs the sample pipeline directly.

use crate::domain::advertising::Advertiser;
use crate::domain::auth;
use crate::domain::connection::ConnectionLifecycle;
use crate::domain::log_transport;
use crate::domain::models::{EventReceiver, NodeEvent};
use crate::domain::sampling::SamplePipeline;
use crate::domain::settings::NodeSettings;
use crate::infrastructure::bluetooth::advertising::AdvertisingPayload;
use crate::infrastructure::bluetooth::{BleError, BleStack};
use crate::infrastructure::log_backend::BleLogBackend;
use crate::infrastructure::sensor::{
    SensorAttribute, SensorDevice, SensorError, SensorTrigger, SensorValue,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("accelerometer device not ready")]
    SensorNotReady,
    #[error("bluetooth init failed: {0}")]
    Bluetooth(#[source] BleError),
    #[error("failed to set sampling rate: {0}")]
    SamplingRate(#[source] SensorError),
    #[error("failed to set trigger: {0}")]
    Trigger(#[source] SensorError),
}

/// Everything the node needs, created by the caller
pub struct NodeParts {
    pub settings: NodeSettings,
    pub accel: Arc<dyn SensorDevice>,
    pub ble: Arc<dyn BleStack>,
    pub log_backend: Arc<BleLogBackend>,
    pub payload: AdvertisingPayload,
}

pub enum Startup {
    Running(RunningNode),
    /// Startup stopped before the idle loop
    Halted(NodeError),
}

pub struct Node {
    parts: NodeParts,
}

impl Node {
    pub fn new(parts: NodeParts) -> Self {
        Self { parts }
    }

    pub fn start(self) -> Result<Startup, NodeError> {
        let NodeParts {
            settings,
            accel,
            ble,
            log_backend,
            payload,
        } = self.parts;

        // Step 1: Sensor must be up before anything else
        if !accel.is_ready() {
            error!("Accelerometer device not ready");
            return Err(NodeError::SensorNotReady);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Step 2: Log transport hook. It may run inside the logging path, so it only queues.
        let hook_tx = events_tx.clone();
        log_backend.set_hook(Box::new(move |enabled| {
            let _ = hook_tx.send(NodeEvent::TransportAvailabilityChanged(enabled));
        }));

        // Step 3: Radio
        if let Err(e) = ble.enable(events_tx) {
            error!("Bluetooth init failed (err {})", e.code());
            return Err(NodeError::Bluetooth(e));
        }
        info!("Bluetooth initialized");

        // Step 4: Pairing callbacks
        if let Err(e) = ble.register_auth_callbacks(auth::callbacks()) {
            warn!("Failed to register auth callbacks (err {})", e.code());
        }

        // Step 5: Advertising, non-fatal
        let advertiser = Advertiser::new(ble, Arc::new(payload));
        let mut lifecycle = ConnectionLifecycle::new(advertiser);
        lifecycle.start();

        // Step 6: Output data rate, only where the driver allows changing it
        let trigger = SensorTrigger::ACCEL_DATA_READY;
        if let Some(hz) = settings.sampling_rate_hz {
            if accel.supports_runtime_odr() {
                let result = i32::try_from(hz)
                    .map_err(|_| SensorError::InvalidValue)
                    .and_then(|rate| {
                        accel.attr_set(
                            trigger.channel,
                            SensorAttribute::SamplingFrequency,
                            SensorValue::from_int(rate),
                        )
                    });
                if let Err(e) = result {
                    error!("Failed to set sampling rate: {}", e.code());
                    return Ok(Startup::Halted(NodeError::SamplingRate(e)));
                }
                info!("Sampling at {} Hz", hz);
            } else {
                debug!(
                    "{} has a fixed output data rate, ignoring {} Hz",
                    accel.name(),
                    hz
                );
            }
        }

        // Step 7: Arm data-ready
        let pipeline = SamplePipeline::new(trigger.channel);
        if let Err(e) = accel.trigger_set(trigger, pipeline.into_handler()) {
            error!("Failed to set trigger: {}", e.code());
            return Ok(Startup::Halted(NodeError::Trigger(e)));
        }

        // Step 8: Hand over to the idle loop
        Ok(Startup::Running(RunningNode {
            lifecycle,
            events: events_rx,
            idle_interval: Duration::from_millis(settings.idle_interval_ms.max(1)),
        }))
    }
}

pub struct RunningNode {
    lifecycle: ConnectionLifecycle,
    events: EventReceiver,
    idle_interval: Duration,
}

impl RunningNode {
    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.lifecycle
    }

    /// Route one event to its handler
    pub fn dispatch(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::Connected { conn, status } => self.lifecycle.on_connected(conn, status),
            NodeEvent::Disconnected { conn, reason } => {
                self.lifecycle.on_disconnected(conn, reason)
            }
            NodeEvent::PairingCancelled { conn } => auth::on_pairing_cancelled(&conn),
            NodeEvent::TransportAvailabilityChanged(enabled) => {
                log_transport::backend_status_changed(enabled)
            }
        }
    }

    /// Idle until `shutdown` resolves, dispatching events as they arrive.
    ///
    /// Events already queued are handled before shutdown is honoured.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut idle = tokio::time::interval(self.idle_interval);
        idle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        warn!("All event sources closed");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                _ = idle.tick() => trace!("Idle"),
            }
        }
    }
}
