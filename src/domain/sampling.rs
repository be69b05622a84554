//! Data-ready sampling
//!
//! Runs in the driver's trigger context: one synchronous channel read, one log
//! record, nothing retained. Must not block.

use crate::domain::models::AccelSample;
use crate::infrastructure::sensor::{SensorChannel, SensorDevice, SensorTrigger, TriggerHandler};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy)]
pub struct SamplePipeline {
    channel: SensorChannel,
}

impl SamplePipeline {
    pub fn new(channel: SensorChannel) -> Self {
        Self { channel }
    }

    /// Read the latest measurement and emit it. A failed read is logged and skipped;
    /// the trigger stays armed either way.
    pub fn on_data_ready(
        &self,
        dev: &dyn SensorDevice,
        _trigger: &SensorTrigger,
    ) -> Option<AccelSample> {
        let values = match dev.channel_get(self.channel) {
            Ok(values) => values,
            Err(e) => {
                error!("Failed to read {} channel: {}", dev.name(), e.code());
                return None;
            }
        };

        let sample = AccelSample {
            x: values[0].to_f64(),
            y: values[1].to_f64(),
            z: values[2].to_f64(),
        };
        info!(
            x = sample.x,
            y = sample.y,
            z = sample.z,
            "X: {:.6}, Y: {:.6}, Z: {:.6}",
            sample.x,
            sample.y,
            sample.z
        );
        Some(sample)
    }

    /// Handler to arm on the driver
    pub fn into_handler(self) -> TriggerHandler {
        Arc::new(move |dev: &dyn SensorDevice, trigger: &SensorTrigger| {
            self.on_data_ready(dev, trigger);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::log_backend::capture::LogCapture;
    use crate::infrastructure::sensor::simulator::{AccelConfig, SimulatedAccelerometer};
    use crate::infrastructure::sensor::SensorError;

    fn armed_accel() -> SimulatedAccelerometer {
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        accel
            .trigger_set(
                SensorTrigger::ACCEL_DATA_READY,
                SamplePipeline::new(SensorChannel::AccelXyz).into_handler(),
            )
            .unwrap();
        accel
    }

    #[test]
    fn test_one_record_per_event() {
        let mut logs = LogCapture::start();
        let accel = armed_accel();

        assert!(accel.push_sample(AccelSample { x: 0.1, y: 9.8, z: -0.2 }));

        let lines = logs.drain();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<inf> sampling: X: 0.100000, Y: 9.800000, Z: -0.200000"));
        assert!(lines[0].ends_with(" x=0.1 y=9.8 z=-0.2"));
    }

    #[test]
    fn test_record_carries_axis_fields() {
        use std::sync::{Arc, Mutex};
        use tracing::field::{Field, Visit};
        use tracing::{Event, Subscriber};
        use tracing_subscriber::layer::{Context, Layer};
        use tracing_subscriber::prelude::*;

        struct FieldCollector(Arc<Mutex<Vec<(String, f64)>>>);

        impl Visit for FieldCollector {
            fn record_f64(&mut self, field: &Field, value: f64) {
                self.0.lock().unwrap().push((field.name().to_string(), value));
            }
            fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
        }

        struct FieldLayer(Arc<Mutex<Vec<(String, f64)>>>);

        impl<S: Subscriber> Layer<S> for FieldLayer {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                event.record(&mut FieldCollector(self.0.clone()));
            }
        }

        let fields = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(FieldLayer(fields.clone()));
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        accel.set_sample(AccelSample { x: 0.1, y: 9.8, z: -0.2 });

        tracing::subscriber::with_default(subscriber, || {
            SamplePipeline::new(SensorChannel::AccelXyz)
                .on_data_ready(&accel, &SensorTrigger::ACCEL_DATA_READY)
        });

        let fields = fields.lock().unwrap();
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert!((fields[1].1 - 9.8).abs() < 1e-9);
        assert!((fields[2].1 + 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_direct_read_returns_sample() {
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        accel.set_sample(AccelSample { x: -7.967232, y: -0.689472, z: 5.285952 });

        let sample = SamplePipeline::new(SensorChannel::AccelXyz)
            .on_data_ready(&accel, &SensorTrigger::ACCEL_DATA_READY)
            .unwrap();
        assert!((sample.x + 7.967232).abs() < 1e-9);
        assert!((sample.z - 5.285952).abs() < 1e-9);
    }

    #[test]
    fn test_read_failure_skips_and_stays_armed() {
        let mut logs = LogCapture::start();
        let accel = armed_accel();

        accel.fail_next_read(SensorError::Io);
        assert!(accel.push_sample(AccelSample { x: 1.0, y: 1.0, z: 1.0 }));

        let lines = logs.drain();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<err>"));
        assert!(lines[0].ends_with("Failed to read lis3dh channel: -5"));
        assert!(logs.matching("X: ").is_empty());

        // Next event still reaches the pipeline
        assert!(accel.is_armed());
        assert!(accel.push_sample(AccelSample { x: 0.5, y: 0.0, z: 9.81 }));
        let lines = logs.matching("X: ");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("X: 0.500000, Y: 0.000000, Z: 9.810000"));
        assert_eq!(accel.reads(), 2);
    }
}
