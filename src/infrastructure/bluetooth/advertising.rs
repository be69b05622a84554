//! Advertising payload
//!
//! Builds the fixed advertisement and scan response records and encodes them
//! into the `[len][type][data..]` form that goes on air.

use crate::infrastructure::bluetooth::protocol::{
    self, ad_flags, ad_type, UuidError, MAX_LEGACY_ADV_LEN,
};
use thiserror::Error;

/// A single advertising data record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRecord {
    pub ad_type: u8,
    pub data: Vec<u8>,
}

impl AdRecord {
    pub fn new(ad_type: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            ad_type,
            data: data.into(),
        }
    }

    /// Bytes taken on air, including the length and type octets
    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("advertising record of {0} bytes does not fit a length octet")]
    RecordTooLong(usize),
    #[error("payload needs {needed} bytes, limit is {limit}")]
    TooLong { needed: usize, limit: usize },
    #[error(transparent)]
    Uuid(#[from] UuidError),
}

/// Advertisement and scan response data, fixed for the lifetime of the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingPayload {
    ad: Vec<AdRecord>,
    sd: Vec<AdRecord>,
}

impl AdvertisingPayload {
    /// Flags + 128-bit service UUID in the advertisement, device name in the scan response
    pub fn new(device_name: &str) -> Result<Self, PayloadError> {
        let uuid = protocol::parse_uuid(protocol::LOG_SERVICE_UUID)?;

        Ok(Self {
            ad: vec![
                AdRecord::new(
                    ad_type::FLAGS,
                    [ad_flags::LE_GENERAL_DISCOVERABLE | ad_flags::NO_BREDR],
                ),
                AdRecord::new(ad_type::UUID128_ALL, uuid),
            ],
            sd: vec![AdRecord::new(ad_type::NAME_COMPLETE, device_name.as_bytes())],
        })
    }

    pub fn advertisement(&self) -> &[AdRecord] {
        &self.ad
    }

    pub fn scan_response(&self) -> &[AdRecord] {
        &self.sd
    }

    /// Encoded advertisement data
    pub fn encode_advertisement(&self) -> Result<Vec<u8>, PayloadError> {
        encode(&self.ad)
    }

    /// Encoded scan response data
    pub fn encode_scan_response(&self) -> Result<Vec<u8>, PayloadError> {
        encode(&self.sd)
    }
}

fn encode(records: &[AdRecord]) -> Result<Vec<u8>, PayloadError> {
    let needed: usize = records.iter().map(AdRecord::encoded_len).sum();
    if needed > MAX_LEGACY_ADV_LEN {
        return Err(PayloadError::TooLong {
            needed,
            limit: MAX_LEGACY_ADV_LEN,
        });
    }

    let mut out = Vec::with_capacity(needed);
    for record in records {
        let len = u8::try_from(record.data.len() + 1)
            .map_err(|_| PayloadError::RecordTooLong(record.data.len()))?;
        out.push(len);
        out.push(record.ad_type);
        out.extend_from_slice(&record.data);
    }
    Ok(out)
}
