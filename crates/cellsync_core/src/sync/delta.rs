//! Delta computation between current and desired child collections.
//!
//! Children are matched on a stable business key (APN name for APN
//! resources, serial for eNodeBs), never on entity key. Key sets are
//! compared with a sorted linear merge.

use crate::config::SyncConfig;
use crate::error::{CoreError, CoreResult};
use crate::kinds::entity_type;
use crate::models::{ApnResources, EnodebSerials};
use crate::sync::loader::Snapshot;
use cellsync_store::{EntityCreate, EntityRef, EntityUpdate, NetworkEntity};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Partition of the union of current and desired keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedDelta<K> {
    /// Desired keys with no current counterpart.
    pub to_create: Vec<K>,
    /// Keys present on both sides.
    pub to_update: Vec<K>,
    /// Current keys no longer desired.
    pub to_delete: Vec<K>,
}

impl<K> KeyedDelta<K> {
    /// Returns true if nothing is created or deleted.
    pub fn is_stable(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Splits `current` and `desired` keys into creates, updates and deletes.
///
/// Inputs need not be sorted or unique. Outputs are sorted.
pub fn partition_keys<K: Ord>(
    current: impl IntoIterator<Item = K>,
    desired: impl IntoIterator<Item = K>,
) -> KeyedDelta<K> {
    let mut old: Vec<K> = current.into_iter().collect();
    old.sort();
    old.dedup();
    let mut new: Vec<K> = desired.into_iter().collect();
    new.sort();
    new.dedup();

    let mut delta = KeyedDelta {
        to_create: Vec::new(),
        to_update: Vec::new(),
        to_delete: Vec::new(),
    };
    let mut old = old.into_iter().peekable();
    let mut new = new.into_iter().peekable();
    loop {
        let order = match (old.peek(), new.peek()) {
            (Some(o), Some(n)) => o.cmp(n),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => delta.to_delete.extend(old.next()),
            Ordering::Greater => delta.to_create.extend(new.next()),
            Ordering::Equal => {
                delta.to_update.extend(old.next());
                new.next();
            }
        }
    }
    delta
}

/// Change to one relation's association targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDelta {
    /// Targets to attach.
    pub added: BTreeSet<EntityRef>,
    /// Targets to detach.
    pub removed: BTreeSet<EntityRef>,
    /// Targets attached before and after.
    pub kept: BTreeSet<EntityRef>,
}

impl AssociationDelta {
    /// Targets attached after the change.
    pub fn resulting(&self) -> BTreeSet<EntityRef> {
        self.kept.union(&self.added).cloned().collect()
    }

    /// Returns true if nothing is attached or detached.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes the association change from `current` to `desired`.
pub fn association_delta(
    current: &BTreeSet<EntityRef>,
    desired: &BTreeSet<EntityRef>,
) -> AssociationDelta {
    let delta = partition_keys(current.iter().cloned(), desired.iter().cloned());
    AssociationDelta {
        added: delta.to_create.into_iter().collect(),
        removed: delta.to_delete.into_iter().collect(),
        kept: delta.to_update.into_iter().collect(),
    }
}

/// Writes for one collection of child entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildChanges {
    /// Children to create.
    pub creates: Vec<EntityCreate>,
    /// Children to update.
    pub updates: Vec<EntityUpdate>,
    /// Children to delete.
    pub deletes: Vec<EntityRef>,
    /// Refs of every child that exists after the change.
    pub desired_refs: BTreeSet<EntityRef>,
}

/// Planning context for one operation: the network, its loaded snapshot and
/// the sync settings.
#[derive(Debug, Clone, Copy)]
pub struct DeltaContext<'a> {
    network_id: &'a str,
    snapshot: &'a Snapshot,
    config: &'a SyncConfig,
}

impl<'a> DeltaContext<'a> {
    /// Creates a context.
    pub fn new(network_id: &'a str, snapshot: &'a Snapshot, config: &'a SyncConfig) -> Self {
        Self {
            network_id,
            snapshot,
            config,
        }
    }

    /// Network being planned against.
    pub fn network_id(&self) -> &'a str {
        self.network_id
    }

    /// The loaded snapshot.
    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Sync settings.
    pub fn config(&self) -> &'a SyncConfig {
        self.config
    }

    /// Looks up an entity the plan depends on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ParentNotFound`] if it was not loaded.
    pub fn require_parent(&self, entity: &EntityRef) -> CoreResult<&'a NetworkEntity> {
        self.snapshot.require_parent(entity)
    }

    /// APN resources currently attached to a cellular gateway.
    ///
    /// A gateway absent from the snapshot has none.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an attached resource missing from
    /// the snapshot when child loads are strict, or a projection error if a
    /// resource does not decode.
    pub fn current_apn_resources(&self, cellular: &EntityRef) -> CoreResult<ApnResources> {
        let Some(gateway) = self.snapshot.get(cellular) else {
            return Ok(ApnResources::default());
        };

        let mut entities = Vec::new();
        for resource in gateway.associations_of(entity_type::APN_RESOURCE) {
            match self.snapshot.get(resource) {
                Some(entity) => entities.push(entity),
                None if self.config.strict_child_loads => {
                    return Err(CoreError::not_found(resource.clone()));
                }
                None => warn!(
                    network = self.network_id,
                    gateway = %cellular,
                    %resource,
                    "skipping apn resource missing from snapshot"
                ),
            }
        }
        ApnResources::from_entities(entities)
    }

    /// Computes creates, updates and deletes that turn the gateway's
    /// current APN resources into `desired`.
    ///
    /// Resources are matched by APN name. A matched resource keeps its
    /// stored ID and is only rewritten where it differs from the stored
    /// entity. A resource whose ID moves to a different APN name is
    /// updated in place rather than deleted and recreated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DanglingAssociation`] if a desired resource
    /// names an APN missing from the snapshot, [`CoreError::Validation`] if
    /// a new resource reuses an ID owned by something else, or an error from
    /// [`current_apn_resources`](Self::current_apn_resources).
    pub fn apn_resource_changes(
        &self,
        cellular: &EntityRef,
        desired: &ApnResources,
    ) -> CoreResult<ChildChanges> {
        let current = self.current_apn_resources(cellular)?;

        for resource in desired.0.values() {
            let apn = resource.apn_ref();
            if !self.snapshot.contains(&apn) {
                return Err(CoreError::DanglingAssociation {
                    from: resource.entity_ref(),
                    to: apn,
                });
            }
        }

        let delta = partition_keys(current.0.keys(), desired.0.keys());
        let current_ids = current.to_refs();
        let mut changes = ChildChanges::default();

        let mut deleted = BTreeSet::new();
        for apn_name in &delta.to_delete {
            if let Some(resource) = current.0.get(*apn_name) {
                deleted.insert(resource.entity_ref());
            }
        }

        for apn_name in &delta.to_create {
            let Some(resource) = desired.0.get(*apn_name) else {
                continue;
            };
            let entity = resource.entity_ref();
            if deleted.remove(&entity) {
                debug!(resource = %entity, apn = %apn_name, "apn resource moved to another apn");
                changes.updates.push(resource.to_entity_update()?);
            } else if current_ids.contains(&entity) || self.snapshot.contains(&entity) {
                return Err(CoreError::validation(format!(
                    "apn resource id {} for apn {apn_name} is already in use",
                    resource.id
                )));
            } else {
                changes.creates.push(resource.to_entity_create()?);
            }
            changes.desired_refs.insert(entity);
        }

        for apn_name in &delta.to_update {
            let (Some(existing), Some(wanted)) = (current.0.get(*apn_name), desired.0.get(*apn_name))
            else {
                continue;
            };
            let mut resource = wanted.clone();
            resource.id.clone_from(&existing.id);
            let entity = resource.entity_ref();
            let update = match self.snapshot.get(&entity) {
                Some(stored) => resource.to_entity_update_from(stored)?,
                None => resource.to_entity_update()?,
            };
            if !update.is_noop() {
                changes.updates.push(update);
            }
            changes.desired_refs.insert(entity);
        }

        changes.deletes = deleted.into_iter().collect();
        debug!(
            network = self.network_id,
            gateway = %cellular,
            creates = changes.creates.len(),
            updates = changes.updates.len(),
            deletes = changes.deletes.len(),
            "computed apn resource changes"
        );
        Ok(changes)
    }

    /// Computes the eNodeB association change from the gateway's current
    /// serials to `desired`, after checking every desired eNodeB may be
    /// attached.
    ///
    /// # Errors
    ///
    /// Returns an error from
    /// [`check_enodeb_attachments`](Self::check_enodeb_attachments).
    pub fn enodeb_changes(
        &self,
        cellular: &EntityRef,
        desired: &EnodebSerials,
    ) -> CoreResult<AssociationDelta> {
        let current: BTreeSet<EntityRef> = self
            .snapshot
            .get(cellular)
            .map(|gateway| {
                gateway
                    .associations_of(entity_type::CELLULAR_ENODEB)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let desired = desired.to_refs();
        self.check_enodeb_attachments(cellular, &desired)?;
        Ok(association_delta(&current, &desired))
    }

    /// Checks that every eNodeB in `enodebs` exists and, when single
    /// attachment is enforced, is not attached to another gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DanglingAssociation`] for an eNodeB missing from
    /// the snapshot, or [`CoreError::Validation`] for one attached
    /// elsewhere.
    pub fn check_enodeb_attachments<'r>(
        &self,
        cellular: &EntityRef,
        enodebs: impl IntoIterator<Item = &'r EntityRef>,
    ) -> CoreResult<()> {
        for enodeb in enodebs {
            let entity = self
                .snapshot
                .get(enodeb)
                .ok_or_else(|| CoreError::DanglingAssociation {
                    from: cellular.clone(),
                    to: enodeb.clone(),
                })?;
            if !self.config.enforce_single_enodeb_attachment {
                continue;
            }
            if let Some(other) = entity
                .parents_of(entity_type::CELLULAR_GATEWAY)
                .find(|gateway| *gateway != cellular)
            {
                return Err(CoreError::validation(format!(
                    "enodeb {} is already attached to gateway {}",
                    enodeb.key, other.key
                )));
            }
        }
        Ok(())
    }
}
