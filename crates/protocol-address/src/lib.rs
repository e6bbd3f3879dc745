//! # Protocol Address Library
//!
//! This crate provides the addressing primitive for multi-device secure
//! messaging: a [`ProtocolAddress`] names exactly one cryptographic session
//! endpoint, i.e. one device of one account.
//!
//! ## Overview
//!
//! - **Addresses**: validated, immutable `(name, device_id)` values with
//!   structural equality, hashing and ordering, usable as map keys anywhere
//! - **Device Registry**: a concurrent address-keyed map with per-account
//!   queries and an optional device limit
//! - **Configuration**: TOML-backed limits for device ids, name lengths and
//!   devices per account
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     Session store / transport layer     │  external
//! ├─────────────────────────────────────────┤
//! │            DeviceRegistry<V>            │  keyed by address
//! ├─────────────────────────────────────────┤
//! │     ProtocolAddress (name, DeviceId)    │  validated value
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol_address::{DeviceId, DeviceRegistry, ProtocolAddress};
//!
//! let phone = ProtocolAddress::new("alice.01", DeviceId::new(1)).unwrap();
//! let laptop = ProtocolAddress::new("alice.01", DeviceId::new(2)).unwrap();
//! assert_ne!(phone, laptop);
//! assert_eq!(phone.to_string(), "alice.01.1");
//!
//! // Negative device ids never make it into an address.
//! assert!(ProtocolAddress::from_signed("alice.01", -1).is_err());
//!
//! let sessions = DeviceRegistry::new();
//! sessions.insert(phone.clone(), "phone session").unwrap();
//! sessions.insert(laptop, "laptop session").unwrap();
//! assert_eq!(sessions.get(&phone), Some("phone session"));
//! assert_eq!(sessions.device_ids("alice.01").len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`address`]: `ProtocolAddress` and `DeviceId`
//! - [`registry`]: Concurrent address-keyed registry
//! - [`config`]: Address and registry limits
//! - [`error`]: Error types

pub mod address;
pub mod config;
pub mod error;
pub mod registry;

pub use address::{DeviceId, ProtocolAddress};
pub use config::{AddressConfig, Config, ConfigError, RegistryConfig};
pub use error::{ProtocolError, Result};
pub use registry::DeviceRegistry;
