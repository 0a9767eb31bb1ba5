//! # cellsync Core
//!
//! Synchronizes a typed LTE configuration model with a generic entity-graph
//! store.
//!
//! This crate provides:
//! - Typed models for networks, gateways, eNodeBs, APNs and APN resources
//! - Config projection between typed configs and tagged payloads
//! - Snapshot loading of current entity state
//! - Delta computation over keyed child collections
//! - Write composition into one ordered, atomic batch
//! - [`Configurator`], which runs the read and write paths
//!
//! ## Example
//!
//! ```rust
//! use cellsync_core::models::{LteNetwork, NetworkCellularConfigs, NetworkDnsConfig};
//! use cellsync_core::{Configurator, SyncConfig};
//! use cellsync_store::InMemoryStore;
//! use std::sync::Arc;
//!
//! let configurator = Configurator::new(Arc::new(InMemoryStore::new()), SyncConfig::default());
//! let network = LteNetwork {
//!     id: "lte1".into(),
//!     name: "LTE".into(),
//!     description: String::new(),
//!     cellular: NetworkCellularConfigs::default(),
//!     dns: NetworkDnsConfig::default(),
//!     features: None,
//! };
//! configurator.create_network(&network).unwrap();
//! configurator.create_tier("lte1", "default", "Default").unwrap();
//! assert_eq!(configurator.load_network("lte1").unwrap(), network);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod configurator;
mod error;
pub mod kinds;
pub mod models;
pub mod projection;
pub mod sync;

pub use config::SyncConfig;
pub use configurator::Configurator;
pub use error::{CoreError, CoreResult, ErrorClass};
pub use kinds::{entity_type, ConfigKind};
pub use projection::{from_backend_config, to_backend_config, AnyConfig, SubConfig, TypedConfig};
pub use sync::{AssociationChange, Snapshot, SnapshotLoader, WriteComposer, WritePlan};
