//! Generate address test vectors for interop testing.
//!
//! Run with: cargo run --package protocol-address --example address_vectors
//!
//! Set `RUST_LOG=debug` to see registry activity.

use protocol_address::{DeviceId, DeviceRegistry, ProtocolAddress};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let vectors = [
        ("alice.01", 1),
        ("alice.01", 2),
        ("+14155550100", 0),
        ("bob", u32::MAX),
    ];

    let registry = DeviceRegistry::new();
    for (name, device) in vectors {
        let address = match ProtocolAddress::new(name, DeviceId::new(device)) {
            Ok(address) => address,
            Err(e) => {
                tracing::error!("Skipping vector {}/{}: {}", name, device, e);
                continue;
            }
        };
        print_test_vector(&address);
        if let Err(e) = registry.insert(address, ()) {
            tracing::error!("Failed to register vector: {}", e);
        }
    }

    tracing::info!("Registered {} addresses", registry.len());
}

fn print_test_vector(address: &ProtocolAddress) {
    let bytes = rmp_serde::to_vec(address).expect("serialization failed");
    print!(
        "{{ display: {:?}, stableHash: 0x{:016x}n, msgpack: new Uint8Array([",
        address.to_string(),
        address.stable_hash()
    );
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            print!(", ");
        }
        print!("{}", b);
    }
    println!("]) }},");
}
