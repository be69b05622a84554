//! Sensor driver contract
//!
//! The subset of a trigger-capable sensor driver the node relies on: readiness,
//! attribute writes, trigger arming and channel reads.

pub mod simulator;

use crate::infrastructure::errno;
use std::sync::Arc;
use thiserror::Error;

pub use simulator::SimulatedAccelerometer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorChannel {
    AccelXyz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorAttribute {
    SamplingFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    DataReady,
}

/// Which hardware condition invokes a trigger handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorTrigger {
    pub kind: TriggerKind,
    pub channel: SensorChannel,
}

impl SensorTrigger {
    pub const ACCEL_DATA_READY: Self = Self {
        kind: TriggerKind::DataReady,
        channel: SensorChannel::AccelXyz,
    };
}

/// Fixed-point reading: integer part plus millionths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorValue {
    pub val1: i32,
    pub val2: i32,
}

impl SensorValue {
    pub const fn from_int(val1: i32) -> Self {
        Self { val1, val2: 0 }
    }

    pub fn from_f64(value: f64) -> Self {
        let micros = (value * 1_000_000.0).round() as i64;
        Self {
            val1: (micros / 1_000_000) as i32,
            val2: (micros % 1_000_000) as i32,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.val1 as f64 + self.val2 as f64 / 1_000_000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("I/O error")]
    Io,
    #[error("not supported")]
    NotSupported,
    #[error("invalid value")]
    InvalidValue,
    #[error("driver error {0}")]
    Driver(i32),
}

impl SensorError {
    /// Negative errno-style status code, as printed in logs
    pub fn code(&self) -> i32 {
        match self {
            Self::Io => errno::EIO,
            Self::NotSupported => errno::ENOTSUP,
            Self::InvalidValue => errno::EINVAL,
            Self::Driver(code) => *code,
        }
    }
}

/// Called by the driver in its own context whenever the armed trigger fires
pub type TriggerHandler = Arc<dyn Fn(&dyn SensorDevice, &SensorTrigger) + Send + Sync>;

pub trait SensorDevice: Send + Sync {
    fn name(&self) -> &str;

    fn is_ready(&self) -> bool;

    /// Whether the output data rate can be changed after boot
    fn supports_runtime_odr(&self) -> bool;

    fn attr_set(
        &self,
        channel: SensorChannel,
        attribute: SensorAttribute,
        value: SensorValue,
    ) -> Result<(), SensorError>;

    /// Arm `trigger`, replacing any handler already armed for it
    fn trigger_set(&self, trigger: SensorTrigger, handler: TriggerHandler)
        -> Result<(), SensorError>;

    /// Latest X, Y, Z values for `channel`
    fn channel_get(&self, channel: SensorChannel) -> Result<[SensorValue; 3], SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_value_conversion() {
        assert_eq!(SensorValue::from_f64(9.8), SensorValue { val1: 9, val2: 800_000 });
        assert_eq!(
            SensorValue::from_f64(-0.2),
            SensorValue { val1: 0, val2: -200_000 }
        );
        assert!((SensorValue { val1: -7, val2: -967_232 }.to_f64() + 7.967232).abs() < 1e-9);
        assert_eq!(SensorValue::from_int(1).to_f64(), 1.0);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SensorError::Io.code(), -5);
        assert_eq!(SensorError::NotSupported.code(), -134);
        assert_eq!(SensorError::Driver(-16).code(), -16);
    }
}
