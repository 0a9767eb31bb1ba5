//! # cellsync Testkit
//!
//! Testing utilities for cellsync.
//!
//! This crate provides:
//! - Seeded in-memory networks for scenario tests
//! - Sample model builders
//! - Property-based test generators
//!
//! ## Example
//!
//! ```rust
//! use cellsync_testkit::prelude::*;
//!
//! let net = TestNetwork::seeded();
//! net.create_gateway(TEST_NETWORK, &sample_gateway("gw1")).unwrap();
//! assert_eq!(net.load_gateway(TEST_NETWORK, "gw1").unwrap().tier, TEST_TIER);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Convenient re-exports for test files.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use cellsync_core::models::*;
    pub use cellsync_core::{Configurator, CoreError, SyncConfig};
    pub use cellsync_store::{EntityRef, EntityStore, InMemoryStore, WriteOperation};
}

pub use fixtures::*;
pub use generators::*;
