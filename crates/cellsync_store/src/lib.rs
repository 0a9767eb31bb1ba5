//! # cellsync Store
//!
//! Entity graph store boundary for cellsync.
//!
//! This crate defines the narrow interface the synchronization core consumes:
//! a network-scoped graph of typed, keyed entities with opaque config payloads
//! and directed associations. The store does **not** interpret config payloads.
//!
//! ## Design Principles
//!
//! - Entities are addressed by [`EntityRef`] (type and key) within a network
//! - Outgoing associations are written by callers; parent associations are
//!   derived by the store on load
//! - [`EntityStore::execute_writes`] is all-or-nothing across the batch
//! - Every association target must exist when the write that names it applies
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - Reference engine for tests and the CLI
//!
//! ## Example
//!
//! ```rust
//! use cellsync_store::{EntityCreate, EntityRef, EntityStore, InMemoryStore, Network, WriteOperation};
//!
//! let store = InMemoryStore::new();
//! store.create_network(Network::new("net1")).unwrap();
//!
//! let apn = EntityRef::new("apn", "internet");
//! store
//!     .execute_writes("net1", &[WriteOperation::Create(EntityCreate::new(apn.clone()))])
//!     .unwrap();
//! assert!(store.load_entity("net1", &apn, Default::default()).is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod entity;
mod error;
mod memory;
mod operation;
mod types;

pub use backend::EntityStore;
pub use entity::{EntityFilter, LoadCriteria, LoadResult, Network, NetworkEntity, NetworkUpdate};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use operation::{EntityCreate, EntityUpdate, WriteOperation};
pub use types::{ConfigPayload, EntityRef};
