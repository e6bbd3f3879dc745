//! Addressing for individual protocol endpoints.
//!
//! A [`ProtocolAddress`] names one device of one account. Every session
//! lookup in the surrounding protocol stack is keyed by it, so equality and
//! hashing cover both fields exactly and nothing else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AddressConfig;
use crate::error::{ProtocolError, Result};

/// Identifier for one device belonging to an account.
///
/// Device ids are unsigned; conversion from signed integers rejects negative
/// values with [`ProtocolError::InvalidArgument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(u32);

impl DeviceId {
    /// Creates a device id from its raw value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<DeviceId> for u32 {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl TryFrom<i64> for DeviceId {
    type Error = ProtocolError;

    fn try_from(id: i64) -> Result<Self> {
        if id < 0 {
            return Err(ProtocolError::invalid_argument(format!(
                "device id must not be negative, got {}",
                id
            )));
        }
        u32::try_from(id).map(Self).map_err(|_| {
            ProtocolError::invalid_argument(format!(
                "device id {} exceeds maximum of {}",
                id,
                u32::MAX
            ))
        })
    }
}

impl TryFrom<i32> for DeviceId {
    type Error = ProtocolError;

    fn try_from(id: i32) -> Result<Self> {
        Self::try_from(i64::from(id))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The address of a single session endpoint: an account name plus one of its
/// devices.
///
/// Addresses are immutable once built and can only be built through the
/// validating constructors, so every value in existence has a non-empty
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawAddress")]
pub struct ProtocolAddress {
    name: String,
    device_id: DeviceId,
}

impl ProtocolAddress {
    /// Creates an address, rejecting an empty name.
    pub fn new(name: impl Into<String>, device_id: DeviceId) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProtocolError::invalid_argument("name must not be empty"));
        }
        Ok(Self { name, device_id })
    }

    /// Creates an address from a signed device id, rejecting negative ids.
    pub fn from_signed(name: impl Into<String>, device_id: i64) -> Result<Self> {
        let device_id = DeviceId::try_from(device_id)?;
        Self::new(name, device_id)
    }

    /// Creates an address and additionally enforces the configured limits.
    pub fn with_config(
        name: impl Into<String>,
        device_id: DeviceId,
        config: &AddressConfig,
    ) -> Result<Self> {
        let address = Self::new(name, device_id)?;

        if let Some(max) = config.max_device_id {
            if address.device_id.value() > max {
                return Err(ProtocolError::invalid_argument(format!(
                    "device id {} exceeds configured maximum of {}",
                    address.device_id, max
                )));
            }
        }

        if let Some(max) = config.max_name_length {
            if address.name.len() > max {
                return Err(ProtocolError::invalid_argument(format!(
                    "name is {} bytes, configured maximum is {}",
                    address.name.len(),
                    max
                )));
            }
        }

        Ok(address)
    }

    /// The account identifier.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device within the account.
    #[inline]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Rebuilds an address from parts already known to be valid.
    pub(crate) fn from_valid_parts(name: String, device_id: DeviceId) -> Self {
        debug_assert!(!name.is_empty());
        Self { name, device_id }
    }

    /// Consumes the address, returning its name and device id.
    pub fn into_parts(self) -> (String, DeviceId) {
        (self.name, self.device_id)
    }

    /// A hash that is identical across processes, platforms and builds.
    ///
    /// Computed as the first 8 bytes (big-endian) of
    /// `SHA-256(name || device_id as u32 BE)`. The device id is fixed-width
    /// and last, so the encoding is unambiguous.
    pub fn stable_hash(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.device_id.value().to_be_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(prefix)
    }
}

impl fmt::Display for ProtocolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.device_id)
    }
}

impl FromStr for ProtocolAddress {
    type Err = ProtocolError;

    /// Parses `name.device_id`, splitting on the last `.` so names may
    /// themselves contain dots.
    fn from_str(s: &str) -> Result<Self> {
        let (name, device) = s.rsplit_once('.').ok_or_else(|| {
            ProtocolError::invalid_argument(format!("missing device separator in {:?}", s))
        })?;
        // Only the canonical decimal form, so parsing inverts `Display`.
        let canonical = !device.is_empty()
            && device.bytes().all(|b| b.is_ascii_digit())
            && (device == "0" || !device.starts_with('0'));
        let device_id = canonical
            .then(|| device.parse::<u32>().ok())
            .flatten()
            .ok_or_else(|| {
                ProtocolError::invalid_argument(format!("invalid device id {:?}", device))
            })?;
        Self::new(name, DeviceId::new(device_id))
    }
}

/// Unvalidated wire shape, checked on the way in.
#[derive(Deserialize)]
struct RawAddress {
    name: String,
    device_id: DeviceId,
}

impl TryFrom<RawAddress> for ProtocolAddress {
    type Error = ProtocolError;

    fn try_from(raw: RawAddress) -> Result<Self> {
        Self::new(raw.name, raw.device_id)
    }
}
