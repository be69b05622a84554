use crate::infrastructure::bluetooth::advertising::AdvertisingPayload;
use crate::infrastructure::bluetooth::{AdvertisingParams, BleError, BleStack};
use std::sync::Arc;
use tracing::{error, info};

/// Starts connectable, general-discoverable advertising with the node's fixed payload.
///
/// Failures are logged and handed back; the advertiser never retries on its own.
#[derive(Clone)]
pub struct Advertiser {
    stack: Arc<dyn BleStack>,
    payload: Arc<AdvertisingPayload>,
}

impl Advertiser {
    pub fn new(stack: Arc<dyn BleStack>, payload: Arc<AdvertisingPayload>) -> Self {
        Self { stack, payload }
    }

    pub fn payload(&self) -> &AdvertisingPayload {
        &self.payload
    }

    pub fn start(&self) -> Result<(), BleError> {
        match self
            .stack
            .start_advertising(AdvertisingParams::CONNECTABLE, &self.payload)
        {
            Ok(()) => {
                info!("Advertising successfully started");
                Ok(())
            }
            Err(e) => {
                error!("Advertising failed to start (err {})", e.code());
                Err(e)
            }
        }
    }
}
