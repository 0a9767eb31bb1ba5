//! Write composition.
//!
//! The composer turns the creates, updates, deletes and association changes
//! of one logical change into a single ordered batch:
//!
//! 1. Deletes. Deleting an entity also drops every edge to it.
//! 2. Creates, ordered so an entity is created before any create that
//!    points at it.
//! 3. Entity updates, with association changes folded in.
//! 4. Association changes that were not folded: adds, then removes, then
//!    sets.
//!
//! Composition is pure. Inconsistent input is rejected with
//! [`CoreError::InvalidDelta`] rather than reordered or dropped.

use crate::config::SyncConfig;
use crate::error::{CoreError, CoreResult};
use cellsync_store::{EntityCreate, EntityRef, EntityUpdate, WriteOperation};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Association edits on one parent entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationChange {
    /// Entity whose outgoing associations change.
    pub parent: EntityRef,
    /// Targets to attach.
    pub add: BTreeSet<EntityRef>,
    /// Targets to detach.
    pub remove: BTreeSet<EntityRef>,
    /// Replacement target set, applied before `add` and `remove`.
    pub set: Option<BTreeSet<EntityRef>>,
}

impl AssociationChange {
    /// Creates an empty change on `parent`.
    pub fn new(parent: EntityRef) -> Self {
        Self {
            parent,
            add: BTreeSet::new(),
            remove: BTreeSet::new(),
            set: None,
        }
    }

    /// Attaches targets.
    #[must_use]
    pub fn adding(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.add.extend(targets);
        self
    }

    /// Detaches targets.
    #[must_use]
    pub fn removing(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.remove.extend(targets);
        self
    }

    /// Replaces the target set.
    #[must_use]
    pub fn setting(mut self, targets: impl IntoIterator<Item = EntityRef>) -> Self {
        self.set = Some(targets.into_iter().collect());
        self
    }

    /// Returns true if the change does nothing.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.set.is_none()
    }

    fn attached(&self) -> impl Iterator<Item = &EntityRef> {
        self.add.iter().chain(self.set.iter().flatten())
    }

    fn absorb(&mut self, other: AssociationChange) -> CoreResult<()> {
        if self.set.is_some() && other.set.is_some() {
            return Err(CoreError::invalid_delta(format!(
                "two association sets on {}",
                self.parent
            )));
        }
        self.add.extend(other.add);
        self.remove.extend(other.remove);
        if other.set.is_some() {
            self.set = other.set;
        }
        Ok(())
    }
}

/// An ordered batch of writes for one atomic submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WritePlan {
    operations: Vec<WriteOperation>,
}

impl WritePlan {
    /// A plan that writes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The operations, in submission order.
    pub fn operations(&self) -> &[WriteOperation] {
        &self.operations
    }

    /// Consumes the plan, returning its operations.
    pub fn into_operations(self) -> Vec<WriteOperation> {
        self.operations
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the plan writes nothing.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of creates.
    pub fn create_count(&self) -> usize {
        self.count(|op| matches!(op, WriteOperation::Create(_)))
    }

    /// Number of updates, including association-only updates.
    pub fn update_count(&self) -> usize {
        self.count(|op| matches!(op, WriteOperation::Update(_)))
    }

    /// Number of deletes.
    pub fn delete_count(&self) -> usize {
        self.count(|op| matches!(op, WriteOperation::Delete(_)))
    }

    fn count(&self, predicate: impl Fn(&WriteOperation) -> bool) -> usize {
        self.operations.iter().filter(|op| predicate(op)).count()
    }
}

/// Assembles write plans.
#[derive(Debug, Clone, Copy)]
pub struct WriteComposer {
    merge_association_updates: bool,
}

impl WriteComposer {
    /// Creates a composer using `config`'s association-merge setting.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            merge_association_updates: config.merge_association_updates,
        }
    }

    /// Composes one ordered batch.
    ///
    /// Association changes on an entity created in the same batch become
    /// part of its create. Other association changes are folded into that
    /// entity's update, or emitted as their own updates when merging is
    /// off. Updates that change nothing are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDelta`] if an entity is targeted twice,
    /// is both created and deleted (or updated and deleted, or created and
    /// updated), gets two association sets, is associated to an entity
    /// deleted in the same batch, or if creates point at each other in a
    /// cycle.
    pub fn compose(
        &self,
        creates: Vec<EntityCreate>,
        updates: Vec<EntityUpdate>,
        deletes: Vec<EntityRef>,
        association_changes: Vec<AssociationChange>,
    ) -> CoreResult<WritePlan> {
        self.compose_checked(creates, updates, deletes, association_changes)
            .inspect_err(|err| warn!(error = %err, "rejected write plan"))
    }

    fn compose_checked(
        &self,
        mut creates: Vec<EntityCreate>,
        mut updates: Vec<EntityUpdate>,
        deletes: Vec<EntityRef>,
        association_changes: Vec<AssociationChange>,
    ) -> CoreResult<WritePlan> {
        let created = unique("create", creates.iter().map(|c| &c.entity))?;
        let updated = unique("update", updates.iter().map(|u| &u.entity))?;
        let deleted = unique("delete", deletes.iter())?;
        disjoint("created and deleted", &created, &deleted)?;
        disjoint("updated and deleted", &updated, &deleted)?;
        disjoint("created and updated", &created, &updated)?;

        let grouped = group_by_parent(association_changes)?;
        for change in grouped.values() {
            if deleted.contains(&change.parent) {
                return Err(CoreError::invalid_delta(format!(
                    "association change on deleted {}",
                    change.parent
                )));
            }
            not_deleted(&change.parent, change.attached(), &deleted)?;
        }
        for create in &creates {
            not_deleted(&create.entity, create.associations.iter(), &deleted)?;
        }
        for update in &updates {
            not_deleted(&update.entity, update.association_targets(), &deleted)?;
        }

        let mut separate = Vec::new();
        for (parent, change) in grouped {
            if let Some(create) = creates.iter_mut().find(|c| c.entity == parent) {
                fold_into_create(create, change);
            } else if self.merge_association_updates {
                match updates.iter_mut().find(|u| u.entity == parent) {
                    Some(update) => fold_into_update(update, change)?,
                    None => {
                        let mut update = EntityUpdate::new(parent);
                        fold_into_update(&mut update, change)?;
                        updates.push(update);
                    }
                }
            } else {
                separate.push(change);
            }
        }

        let creates = order_creates(creates)?;
        let before = updates.len();
        updates.retain(|update| !update.is_noop());
        if updates.len() < before {
            debug!(skipped = before - updates.len(), "dropped no-op updates");
        }

        let mut operations: Vec<WriteOperation> = deletes.into_iter().map(WriteOperation::Delete).collect();
        operations.extend(creates.into_iter().map(WriteOperation::Create));
        operations.extend(updates.into_iter().map(WriteOperation::Update));
        operations.extend(split_association_ops(separate));

        debug!(operations = operations.len(), "composed write plan");
        Ok(WritePlan { operations })
    }
}

fn unique<'a>(
    what: &str,
    refs: impl Iterator<Item = &'a EntityRef>,
) -> CoreResult<BTreeSet<EntityRef>> {
    let mut seen = BTreeSet::new();
    for entity in refs {
        if !seen.insert(entity.clone()) {
            return Err(CoreError::invalid_delta(format!("duplicate {what} of {entity}")));
        }
    }
    Ok(seen)
}

fn disjoint(what: &str, a: &BTreeSet<EntityRef>, b: &BTreeSet<EntityRef>) -> CoreResult<()> {
    match a.intersection(b).next() {
        Some(entity) => Err(CoreError::invalid_delta(format!("{entity} is both {what}"))),
        None => Ok(()),
    }
}

fn not_deleted<'a>(
    from: &EntityRef,
    targets: impl Iterator<Item = &'a EntityRef>,
    deleted: &BTreeSet<EntityRef>,
) -> CoreResult<()> {
    for target in targets {
        if deleted.contains(target) {
            return Err(CoreError::invalid_delta(format!(
                "{from} is associated to {target}, which is deleted in the same batch"
            )));
        }
    }
    Ok(())
}

fn group_by_parent(
    changes: Vec<AssociationChange>,
) -> CoreResult<BTreeMap<EntityRef, AssociationChange>> {
    let mut grouped: BTreeMap<EntityRef, AssociationChange> = BTreeMap::new();
    for change in changes.into_iter().filter(|c| !c.is_empty()) {
        match grouped.get_mut(&change.parent) {
            Some(existing) => existing.absorb(change)?,
            None => {
                grouped.insert(change.parent.clone(), change);
            }
        }
    }
    Ok(grouped)
}

fn fold_into_create(create: &mut EntityCreate, change: AssociationChange) {
    if let Some(set) = change.set {
        create.associations = set;
    }
    create.associations.extend(change.add);
    for removed in &change.remove {
        create.associations.remove(removed);
    }
}

// Collapses add/remove into the set when one is present, so the update
// carries a single association-set.
fn fold_into_update(update: &mut EntityUpdate, change: AssociationChange) -> CoreResult<()> {
    if update.associations_to_set.is_some() && change.set.is_some() {
        return Err(CoreError::invalid_delta(format!(
            "two association sets on {}",
            update.entity
        )));
    }
    update.associations_to_add.extend(change.add);
    update.associations_to_delete.extend(change.remove);
    if change.set.is_some() {
        update.associations_to_set = change.set;
    }

    if let Some(set) = update.associations_to_set.as_mut() {
        set.append(&mut update.associations_to_add);
        for removed in std::mem::take(&mut update.associations_to_delete) {
            set.remove(&removed);
        }
    }
    Ok(())
}

fn split_association_ops(changes: Vec<AssociationChange>) -> Vec<WriteOperation> {
    let mut adds = Vec::new();
    let mut removes = Vec::new();
    let mut sets = Vec::new();
    for change in changes {
        if !change.add.is_empty() {
            adds.push(EntityUpdate::new(change.parent.clone()).with_associations_added(change.add));
        }
        if !change.remove.is_empty() {
            removes.push(
                EntityUpdate::new(change.parent.clone()).with_associations_deleted(change.remove),
            );
        }
        if let Some(set) = change.set {
            sets.push(EntityUpdate::new(change.parent).with_associations_set(set));
        }
    }
    adds.into_iter()
        .chain(removes)
        .chain(sets)
        .map(WriteOperation::Update)
        .collect()
}

// Kahn's algorithm over edges between creates in this batch. Ties resolve
// by input position so the order is deterministic.
fn order_creates(creates: Vec<EntityCreate>) -> CoreResult<Vec<EntityCreate>> {
    let index: BTreeMap<&EntityRef, usize> = creates
        .iter()
        .enumerate()
        .map(|(i, create)| (&create.entity, i))
        .collect();

    let mut waiting_on = vec![0usize; creates.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); creates.len()];
    for (i, create) in creates.iter().enumerate() {
        for target in &create.associations {
            if let Some(&j) = index.get(target) {
                waiting_on[i] += 1;
                dependents[j].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..creates.len()).filter(|&i| waiting_on[i] == 0).collect();
    let mut order = Vec::with_capacity(creates.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &dependent in &dependents[i] {
            waiting_on[dependent] -= 1;
            if waiting_on[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != creates.len() {
        let stuck: Vec<String> = waiting_on
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(i, _)| creates[i].entity.to_string())
            .collect();
        return Err(CoreError::invalid_delta(format!(
            "creates form an association cycle: {}",
            stuck.join(", ")
        )));
    }

    let mut slots: Vec<Option<EntityCreate>> = creates.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsync_store::ConfigPayload;

    fn r(entity_type: &str, key: &str) -> EntityRef {
        EntityRef::new(entity_type, key)
    }

    fn composer() -> WriteComposer {
        WriteComposer::new(&SyncConfig::default())
    }

    fn positions(plan: &WritePlan) -> BTreeMap<String, usize> {
        plan.operations()
            .iter()
            .enumerate()
            .map(|(i, op)| (op.to_string(), i))
            .collect()
    }

    #[test]
    fn creates_precede_their_referrers() {
        let creates = vec![
            EntityCreate::new(r("magmad_gateway", "gw1"))
                .with_associations([r("cellular_gateway", "gw1")]),
            EntityCreate::new(r("cellular_gateway", "gw1"))
                .with_associations([r("apn_resource", "r1")]),
            EntityCreate::new(r("apn_resource", "r1")),
        ];
        let plan = composer()
            .compose(creates, Vec::new(), Vec::new(), Vec::new())
            .unwrap();
        let keys: Vec<&str> = plan
            .operations()
            .iter()
            .map(|op| op.target().entity_type.as_str())
            .collect();
        assert_eq!(keys, vec!["apn_resource", "cellular_gateway", "magmad_gateway"]);
    }

    #[test]
    fn create_cycle_is_invalid() {
        let creates = vec![
            EntityCreate::new(r("a", "1")).with_associations([r("b", "1")]),
            EntityCreate::new(r("b", "1")).with_associations([r("a", "1")]),
        ];
        let err = composer()
            .compose(creates, Vec::new(), Vec::new(), Vec::new())
            .unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn deletes_come_first_and_updates_last() {
        let plan = composer()
            .compose(
                vec![EntityCreate::new(r("apn_resource", "r2"))],
                vec![EntityUpdate::new(r("apn_resource", "r1"))
                    .with_config(ConfigPayload::new("apn_resource", vec![1]))],
                vec![r("apn_resource", "r0")],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(plan.delete_count(), 1);
        assert!(matches!(plan.operations()[0], WriteOperation::Delete(_)));
        assert!(matches!(plan.operations()[1], WriteOperation::Create(_)));
        assert!(matches!(plan.operations()[2], WriteOperation::Update(_)));
    }

    #[test]
    fn add_and_set_on_one_parent_merge_into_one_set() {
        let gw = r("cellular_gateway", "gw1");
        let changes = vec![
            AssociationChange::new(gw.clone()).adding([r("apn_resource", "r2")]),
            AssociationChange::new(gw.clone()).setting([r("cellular_enodeb", "S1")]),
        ];
        let plan = composer()
            .compose(Vec::new(), Vec::new(), Vec::new(), changes)
            .unwrap();

        assert_eq!(plan.len(), 1);
        let WriteOperation::Update(update) = &plan.operations()[0] else {
            panic!("expected update");
        };
        assert!(update.associations_to_add.is_empty());
        assert_eq!(
            update.associations_to_set,
            Some(BTreeSet::from([r("apn_resource", "r2"), r("cellular_enodeb", "S1")]))
        );
    }

    #[test]
    fn unmerged_changes_put_set_after_add() {
        let config = SyncConfig::default().merge_association_updates(false);
        let gw = r("cellular_gateway", "gw1");
        let tier = r("upgrade_tier", "t1");
        let changes = vec![
            AssociationChange::new(gw.clone()).setting([r("cellular_enodeb", "S1")]),
            AssociationChange::new(tier).adding([r("magmad_gateway", "gw1")]),
            AssociationChange::new(gw).removing([r("cellular_enodeb", "S0")]),
        ];
        let plan = WriteComposer::new(&config)
            .compose(Vec::new(), Vec::new(), Vec::new(), changes)
            .unwrap();

        assert_eq!(plan.len(), 3);
        let ops: Vec<&EntityUpdate> = plan
            .operations()
            .iter()
            .filter_map(|op| match op {
                WriteOperation::Update(u) => Some(u),
                _ => None,
            })
            .collect();
        assert!(!ops[0].associations_to_add.is_empty());
        assert!(!ops[1].associations_to_delete.is_empty());
        assert!(ops[2].associations_to_set.is_some());
    }

    #[test]
    fn association_change_on_created_parent_folds_into_create() {
        let tier = r("upgrade_tier", "t1");
        let plan = composer()
            .compose(
                vec![EntityCreate::new(tier.clone())],
                Vec::new(),
                Vec::new(),
                vec![AssociationChange::new(tier).adding([r("magmad_gateway", "gw1")])],
            )
            .unwrap();
        assert_eq!(plan.len(), 1);
        let WriteOperation::Create(create) = &plan.operations()[0] else {
            panic!("expected create");
        };
        assert!(create.associations.contains(&r("magmad_gateway", "gw1")));
    }

    #[test]
    fn overlapping_operations_are_invalid() {
        let e = r("apn_resource", "r1");
        let cases = [
            (vec![EntityCreate::new(e.clone())], Vec::new(), vec![e.clone()]),
            (
                Vec::new(),
                vec![EntityUpdate::new(e.clone()).with_associations_added([r("apn", "a")])],
                vec![e.clone()],
            ),
            (
                vec![EntityCreate::new(e.clone()), EntityCreate::new(e.clone())],
                Vec::new(),
                Vec::new(),
            ),
        ];
        for (creates, updates, deletes) in cases {
            let err = composer()
                .compose(creates, updates, deletes, Vec::new())
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidDelta { .. }));
        }
    }

    #[test]
    fn two_sets_on_one_parent_are_invalid() {
        let gw = r("cellular_gateway", "gw1");
        let changes = vec![
            AssociationChange::new(gw.clone()).setting([]),
            AssociationChange::new(gw).setting([r("cellular_enodeb", "S1")]),
        ];
        assert!(composer()
            .compose(Vec::new(), Vec::new(), Vec::new(), changes)
            .is_err());
    }

    #[test]
    fn association_to_deleted_entity_is_invalid() {
        let gw = r("cellular_gateway", "gw1");
        let doomed = r("apn_resource", "r1");
        let err = composer()
            .compose(
                Vec::new(),
                Vec::new(),
                vec![doomed.clone()],
                vec![AssociationChange::new(gw).setting([doomed])],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDelta { .. }));
    }

    #[test]
    fn noop_updates_are_dropped() {
        let plan = composer()
            .compose(
                Vec::new(),
                vec![EntityUpdate::new(r("cellular_gateway", "gw1"))],
                Vec::new(),
                vec![AssociationChange::new(r("upgrade_tier", "t1"))],
            )
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn empty_set_survives_merge() {
        let gw = r("cellular_gateway", "gw1");
        let plan = composer()
            .compose(
                Vec::new(),
                Vec::new(),
                Vec::new(),
                vec![AssociationChange::new(gw.clone()).setting([])],
            )
            .unwrap();
        let order = positions(&plan);
        assert_eq!(order.len(), 1);
        let WriteOperation::Update(update) = &plan.operations()[0] else {
            panic!("expected update");
        };
        assert_eq!(update.entity, gw);
        assert_eq!(update.associations_to_set, Some(BTreeSet::new()));
    }
}
