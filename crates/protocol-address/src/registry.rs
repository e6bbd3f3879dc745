//! Concurrent per-device registry keyed by [`ProtocolAddress`].
//!
//! The registry stores one caller-supplied value per address and answers
//! account-level questions ("which devices does `alice` have?") without a
//! full scan. Entries are grouped by account name internally so that the
//! per-account device limit is checked and applied under a single shard lock.

use std::collections::BTreeMap;

use dashmap::DashMap;

use crate::address::{DeviceId, ProtocolAddress};
use crate::config::RegistryConfig;
use crate::error::{ProtocolError, Result};

/// Thread-safe map from protocol addresses to values.
#[derive(Debug)]
pub struct DeviceRegistry<V> {
    accounts: DashMap<String, BTreeMap<DeviceId, V>>,
    config: RegistryConfig,
}

impl<V> DeviceRegistry<V> {
    /// Creates an empty registry with no device limit.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry using the given limits.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            accounts: DashMap::new(),
            config,
        }
    }

    /// Returns the limits this registry enforces.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Stores `value` for `address`, returning the value it replaced.
    ///
    /// Replacing an existing device never counts against the limit; adding a
    /// new device to an account already at `max_devices_per_account` fails
    /// with [`ProtocolError::DeviceLimitExceeded`].
    pub fn insert(&self, address: ProtocolAddress, value: V) -> Result<Option<V>> {
        let (name, device_id) = address.into_parts();
        let mut devices = self.accounts.entry(name.clone()).or_default();

        if let Some(limit) = self.config.max_devices_per_account {
            if !devices.contains_key(&device_id) && devices.len() >= limit {
                drop(devices);
                self.accounts.remove_if(&name, |_, devices| devices.is_empty());

                tracing::warn!(
                    name = %name,
                    device_id = %device_id,
                    limit = limit,
                    "Rejected device: account is at its device limit"
                );
                return Err(ProtocolError::DeviceLimitExceeded { name, limit });
            }
        }

        let previous = devices.insert(device_id, value);
        tracing::debug!(
            name = %name,
            device_id = %device_id,
            replaced = previous.is_some(),
            "Registered device"
        );
        Ok(previous)
    }

    /// Returns a clone of the value stored for `address`.
    pub fn get(&self, address: &ProtocolAddress) -> Option<V>
    where
        V: Clone,
    {
        self.accounts
            .get(address.name())
            .and_then(|devices| devices.get(&address.device_id()).cloned())
    }

    /// Returns true if a value is stored for `address`.
    pub fn contains(&self, address: &ProtocolAddress) -> bool {
        self.accounts
            .get(address.name())
            .is_some_and(|devices| devices.contains_key(&address.device_id()))
    }

    /// Removes and returns the value stored for `address`.
    pub fn remove(&self, address: &ProtocolAddress) -> Option<V> {
        let removed = {
            let mut devices = self.accounts.get_mut(address.name())?;
            devices.remove(&address.device_id())
        };

        // Drop the account once its last device is gone.
        self.accounts
            .remove_if(address.name(), |_, devices| devices.is_empty());

        if removed.is_some() {
            tracing::debug!(address = %address, "Removed device");
        }
        removed
    }

    /// Lists the device ids registered for `name`, in ascending order.
    pub fn device_ids(&self, name: &str) -> Vec<DeviceId> {
        self.accounts
            .get(name)
            .map(|devices| devices.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Removes every device registered for `name`, returning how many were
    /// removed.
    pub fn remove_account(&self, name: &str) -> usize {
        let removed = self
            .accounts
            .remove(name)
            .map(|(_, devices)| devices.len())
            .unwrap_or(0);

        if removed > 0 {
            tracing::debug!(name = %name, devices = removed, "Removed account");
        }
        removed
    }

    /// Returns every registered address, sorted by name then device id.
    pub fn addresses(&self) -> Vec<ProtocolAddress> {
        let mut addresses: Vec<ProtocolAddress> = self
            .accounts
            .iter()
            .flat_map(|entry| {
                let name = entry.key().clone();
                entry
                    .value()
                    .keys()
                    // Account keys only ever come from validated addresses.
                    .map(|device_id| {
                        ProtocolAddress::from_valid_parts(name.clone(), *device_id)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        addresses.sort();
        addresses
    }

    /// Returns the total number of registered devices.
    pub fn len(&self) -> usize {
        self.accounts.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns true if no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for DeviceRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addr(name: &str, device_id: u32) -> ProtocolAddress {
        ProtocolAddress::new(name, DeviceId::new(device_id)).unwrap()
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry: DeviceRegistry<u32> = DeviceRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.addresses().is_empty());
    }

    #[test]
    fn test_two_devices_of_one_account_are_independent() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("alice.01", 1), "session-1").unwrap();
        registry.insert(addr("alice.01", 2), "session-2").unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&addr("alice.01", 1)), Some("session-1"));
        assert_eq!(registry.get(&addr("alice.01", 2)), Some("session-2"));
    }

    #[test]
    fn test_insert_same_address_replaces() {
        let registry = DeviceRegistry::new();
        assert_eq!(registry.insert(addr("alice.01", 1), 10).unwrap(), None);
        assert_eq!(registry.insert(addr("alice.01", 1), 20).unwrap(), Some(10));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&addr("alice.01", 1)), Some(20));
    }

    #[test]
    fn test_get_missing() {
        let registry: DeviceRegistry<u32> = DeviceRegistry::new();
        registry.insert(addr("alice", 1), 1).unwrap();
        assert_eq!(registry.get(&addr("alice", 2)), None);
        assert_eq!(registry.get(&addr("bob", 1)), None);
        assert!(!registry.contains(&addr("bob", 1)));
        assert!(registry.contains(&addr("alice", 1)));
    }

    #[test]
    fn test_remove() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("alice", 1), "a").unwrap();
        registry.insert(addr("alice", 2), "b").unwrap();

        assert_eq!(registry.remove(&addr("alice", 1)), Some("a"));
        assert_eq!(registry.remove(&addr("alice", 1)), None);
        assert_eq!(registry.device_ids("alice"), vec![DeviceId::new(2)]);
    }

    #[test]
    fn test_remove_last_device_drops_account() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("alice", 1), ()).unwrap();
        registry.remove(&addr("alice", 1));

        assert!(registry.is_empty());
        assert!(registry.device_ids("alice").is_empty());
        assert_eq!(registry.remove_account("alice"), 0);
    }

    #[test]
    fn test_remove_unknown_account() {
        let registry: DeviceRegistry<()> = DeviceRegistry::new();
        assert_eq!(registry.remove(&addr("nobody", 1)), None);
    }

    #[test]
    fn test_device_ids_sorted() {
        let registry = DeviceRegistry::new();
        for device in [7, 1, 3] {
            registry.insert(addr("alice", device), ()).unwrap();
        }
        registry.insert(addr("bob", 2), ()).unwrap();

        let ids: Vec<u32> = registry
            .device_ids("alice")
            .into_iter()
            .map(DeviceId::value)
            .collect();
        assert_eq!(ids, vec![1, 3, 7]);
        assert!(registry.device_ids("carol").is_empty());
    }

    #[test]
    fn test_device_ids_name_is_case_sensitive() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("alice", 1), ()).unwrap();
        assert!(registry.device_ids("Alice").is_empty());
    }

    #[test]
    fn test_remove_account() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("alice", 1), ()).unwrap();
        registry.insert(addr("alice", 2), ()).unwrap();
        registry.insert(addr("bob", 1), ()).unwrap();

        assert_eq!(registry.remove_account("alice"), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&addr("bob", 1)));
    }

    #[test]
    fn test_addresses_sorted() {
        let registry = DeviceRegistry::new();
        registry.insert(addr("bob", 1), ()).unwrap();
        registry.insert(addr("alice", 2), ()).unwrap();
        registry.insert(addr("alice", 1), ()).unwrap();

        let listed: Vec<String> = registry
            .addresses()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(listed, vec!["alice.1", "alice.2", "bob.1"]);
    }

    #[test]
    fn test_addresses_lists_every_device() {
        let registry = DeviceRegistry::new();
        for device in 0..5 {
            registry.insert(addr("alice.01", device), ()).unwrap();
        }
        registry.remove(&addr("alice.01", 3));

        let listed = registry.addresses();
        assert_eq!(listed.len(), registry.len());
        assert!(listed.iter().all(|a| a.name() == "alice.01"));
        assert!(!listed.contains(&addr("alice.01", 3)));
    }

    #[test]
    fn test_device_limit_rejects_new_device() {
        let registry = DeviceRegistry::with_config(RegistryConfig {
            max_devices_per_account: Some(2),
        });
        registry.insert(addr("alice", 1), ()).unwrap();
        registry.insert(addr("alice", 2), ()).unwrap();

        let err = registry.insert(addr("alice", 3), ()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DeviceLimitExceeded {
                name: "alice".to_string(),
                limit: 2,
            }
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_device_limit_allows_replacement() {
        let registry = DeviceRegistry::with_config(RegistryConfig {
            max_devices_per_account: Some(1),
        });
        registry.insert(addr("alice", 1), 1).unwrap();
        assert_eq!(registry.insert(addr("alice", 1), 2).unwrap(), Some(1));
    }

    #[test]
    fn test_device_limit_is_per_account() {
        let registry = DeviceRegistry::with_config(RegistryConfig {
            max_devices_per_account: Some(1),
        });
        registry.insert(addr("alice", 1), ()).unwrap();
        registry.insert(addr("bob", 1), ()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_device_limit_frees_slot_after_remove() {
        let registry = DeviceRegistry::with_config(RegistryConfig {
            max_devices_per_account: Some(1),
        });
        registry.insert(addr("alice", 1), ()).unwrap();
        registry.remove(&addr("alice", 1));
        assert!(registry.insert(addr("alice", 2), ()).is_ok());
    }

    #[test]
    fn test_concurrent_inserts_respect_limit() {
        let registry = Arc::new(DeviceRegistry::with_config(RegistryConfig {
            max_devices_per_account: Some(4),
        }));

        let handles: Vec<_> = (0..16u32)
            .map(|device| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.insert(addr("alice", device), device).is_ok())
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 4);
        assert_eq!(registry.device_ids("alice").len(), 4);
    }

    #[test]
    fn test_concurrent_lookups_with_independent_keys() {
        let registry = Arc::new(DeviceRegistry::new());
        registry.insert(addr("alice.01", 1), 42u64).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get(&addr("alice.01", 1)))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(42));
        }
    }
}
