//! Simulated accelerometer
//!
//! Holds the latest reading and the armed data-ready handler. Whoever plays the
//! interrupt line calls [`SimulatedAccelerometer::fire_data_ready`], which runs the
//! handler synchronously on the caller's thread just like a driver's trigger thread.

use crate::domain::models::AccelSample;
use crate::infrastructure::sensor::{
    SensorAttribute, SensorChannel, SensorDevice, SensorError, SensorTrigger, SensorValue,
    TriggerHandler,
};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AccelConfig {
    pub name: String,
    pub ready: bool,
    pub runtime_odr: bool,
    pub odr_hz: u32,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            name: "lis3dh".to_string(),
            ready: true,
            runtime_odr: true,
            odr_hz: 10,
        }
    }
}

struct AccelState {
    odr_hz: u32,
    latest: [SensorValue; 3],
    read_failures: VecDeque<SensorError>,
    attr_failure: Option<SensorError>,
    trigger_failure: Option<SensorError>,
    armed: Option<(SensorTrigger, TriggerHandler)>,
    reads: u32,
}

pub struct SimulatedAccelerometer {
    config: AccelConfig,
    state: Mutex<AccelState>,
}

impl SimulatedAccelerometer {
    pub fn new(config: AccelConfig) -> Self {
        let state = AccelState {
            odr_hz: config.odr_hz,
            latest: [SensorValue::default(); 3],
            read_failures: VecDeque::new(),
            attr_failure: None,
            trigger_failure: None,
            armed: None,
            reads: 0,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, AccelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Latch a new reading, as the sensor would on conversion complete
    pub fn set_sample(&self, sample: AccelSample) {
        self.state().latest = [
            SensorValue::from_f64(sample.x),
            SensorValue::from_f64(sample.y),
            SensorValue::from_f64(sample.z),
        ];
    }

    /// Make the next channel read fail with `error`
    pub fn fail_next_read(&self, error: SensorError) {
        self.state().read_failures.push_back(error);
    }

    pub fn fail_attr_set(&self, error: SensorError) {
        self.state().attr_failure = Some(error);
    }

    pub fn fail_trigger_set(&self, error: SensorError) {
        self.state().trigger_failure = Some(error);
    }

    pub fn is_armed(&self) -> bool {
        self.state().armed.is_some()
    }

    pub fn odr_hz(&self) -> u32 {
        self.state().odr_hz
    }

    /// Number of channel reads served, failed ones included
    pub fn reads(&self) -> u32 {
        self.state().reads
    }

    /// Raise the data-ready line. Returns `false` if nothing is armed.
    pub fn fire_data_ready(&self) -> bool {
        // Clone the handler out so it can read the channel without holding the lock
        let armed = self.state().armed.clone();
        match armed {
            Some((trigger, handler)) => {
                handler(self, &trigger);
                true
            }
            None => false,
        }
    }

    /// Latch `sample` and raise data-ready
    pub fn push_sample(&self, sample: AccelSample) -> bool {
        self.set_sample(sample);
        self.fire_data_ready()
    }
}

impl SensorDevice for SimulatedAccelerometer {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_ready(&self) -> bool {
        self.config.ready
    }

    fn supports_runtime_odr(&self) -> bool {
        self.config.runtime_odr
    }

    fn attr_set(
        &self,
        channel: SensorChannel,
        attribute: SensorAttribute,
        value: SensorValue,
    ) -> Result<(), SensorError> {
        let mut state = self.state();
        if let Some(error) = state.attr_failure {
            return Err(error);
        }
        if !self.config.runtime_odr {
            return Err(SensorError::NotSupported);
        }

        match (channel, attribute) {
            (SensorChannel::AccelXyz, SensorAttribute::SamplingFrequency) => {
                if value.val1 <= 0 {
                    return Err(SensorError::InvalidValue);
                }
                state.odr_hz = value.val1 as u32;
                debug!("{}: output data rate set to {} Hz", self.config.name, state.odr_hz);
                Ok(())
            }
        }
    }

    fn trigger_set(
        &self,
        trigger: SensorTrigger,
        handler: TriggerHandler,
    ) -> Result<(), SensorError> {
        let mut state = self.state();
        if let Some(error) = state.trigger_failure {
            return Err(error);
        }
        state.armed = Some((trigger, handler));
        Ok(())
    }

    fn channel_get(&self, channel: SensorChannel) -> Result<[SensorValue; 3], SensorError> {
        let mut state = self.state();
        state.reads += 1;
        if let Some(error) = state.read_failures.pop_front() {
            return Err(error);
        }
        match channel {
            SensorChannel::AccelXyz => Ok(state.latest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sensor::TriggerKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fire_without_trigger_is_ignored() {
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        assert!(!accel.fire_data_ready());
        assert_eq!(accel.reads(), 0);
    }

    #[test]
    fn test_armed_handler_runs_per_event() {
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        accel
            .trigger_set(
                SensorTrigger::ACCEL_DATA_READY,
                Arc::new(move |dev: &dyn SensorDevice, trig: &SensorTrigger| {
                    assert_eq!(trig.kind, TriggerKind::DataReady);
                    let _ = dev.channel_get(trig.channel);
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(accel.fire_data_ready());
        assert!(accel.fire_data_ready());
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(accel.reads(), 2);
    }

    #[test]
    fn test_attr_set_without_runtime_odr() {
        let accel = SimulatedAccelerometer::new(AccelConfig {
            runtime_odr: false,
            ..AccelConfig::default()
        });
        assert_eq!(
            accel.attr_set(
                SensorChannel::AccelXyz,
                SensorAttribute::SamplingFrequency,
                SensorValue::from_int(1)
            ),
            Err(SensorError::NotSupported)
        );
        assert_eq!(accel.odr_hz(), 10);
    }

    #[test]
    fn test_read_failure_is_one_shot() {
        let accel = SimulatedAccelerometer::new(AccelConfig::default());
        accel.set_sample(AccelSample { x: 1.0, y: 2.0, z: 3.0 });
        accel.fail_next_read(SensorError::Io);

        assert_eq!(accel.channel_get(SensorChannel::AccelXyz), Err(SensorError::Io));
        let values = accel.channel_get(SensorChannel::AccelXyz).unwrap();
        assert_eq!(values[2], SensorValue::from_int(3));
    }
}
