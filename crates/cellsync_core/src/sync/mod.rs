//! Read and write paths between typed models and the entity store.
//!
//! - [`SnapshotLoader`] reads current state into a [`Snapshot`]
//! - [`DeltaContext`] compares desired children with the snapshot
//! - [`WriteComposer`] orders the resulting writes into a [`WritePlan`]
//! - the `plan_*` functions tie the three together for gateway changes

mod composer;
mod delta;
mod loader;
mod plan;

pub use composer::{AssociationChange, WriteComposer, WritePlan};
pub use delta::{
    association_delta, partition_keys, AssociationDelta, ChildChanges, DeltaContext, KeyedDelta,
};
pub use loader::{LoadOptions, Snapshot, SnapshotLoader};
pub use plan::{
    gateway_write_refs, plan_enodeb_serials_update, plan_gateway_config_update,
    plan_gateway_create, plan_gateway_delete, plan_gateway_update,
};
