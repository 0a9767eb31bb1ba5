//! Gateway operations.

use super::Configurator;
use crate::error::{CoreError, CoreResult};
use crate::kinds::{entity_type, ConfigKind};
use crate::models::{EnodebSerials, GatewayCellularConfigs, LteGateway, MutableLteGateway};
use crate::projection::{project_sub_config, SubConfig};
use crate::sync::{
    gateway_write_refs, plan_enodeb_serials_update, plan_gateway_config_update,
    plan_gateway_create, plan_gateway_delete, plan_gateway_update, LoadOptions, Snapshot,
    WritePlan,
};
use cellsync_store::{EntityRef, EntityStore};
use std::collections::BTreeSet;

fn magmad_ref(gateway_id: &str) -> EntityRef {
    EntityRef::new(entity_type::MAGMAD_GATEWAY, gateway_id)
}

fn cellular_ref(gateway_id: &str) -> EntityRef {
    EntityRef::new(entity_type::CELLULAR_GATEWAY, gateway_id)
}

impl<S: EntityStore> Configurator<S> {
    /// Loads `refs`, then the APN resources the cellular gateway points at.
    fn load_gateway_snapshot(
        &self,
        network_id: &str,
        gateway_id: &str,
        refs: &BTreeSet<EntityRef>,
    ) -> CoreResult<Snapshot> {
        let loader = self.loader(network_id);
        let mut snapshot = loader.load(refs, LoadOptions::full())?;
        let children = loader.load_children(
            &snapshot,
            &cellular_ref(gateway_id),
            entity_type::APN_RESOURCE,
            LoadOptions::full(),
        )?;
        snapshot.merge(children);
        Ok(snapshot)
    }

    /// Plans creation of a gateway without submitting it. APN resources
    /// without an ID get one.
    ///
    /// # Errors
    ///
    /// See [`plan_gateway_create`].
    pub fn plan_create_gateway(
        &self,
        network_id: &str,
        gateway: &MutableLteGateway,
    ) -> CoreResult<WritePlan> {
        let mut gateway = gateway.clone();
        gateway.apn_resources.assign_missing_ids();
        let snapshot = self
            .loader(network_id)
            .load(&gateway_write_refs(&gateway), LoadOptions::full())?;
        plan_gateway_create(&self.context(network_id, &snapshot), &gateway)
    }

    /// Creates a gateway.
    ///
    /// # Errors
    ///
    /// See [`plan_gateway_create`].
    pub fn create_gateway(&self, network_id: &str, gateway: &MutableLteGateway) -> CoreResult<()> {
        let plan = self.plan_create_gateway(network_id, gateway)?;
        self.submit(network_id, plan)
    }

    /// Loads a gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if either gateway entity is missing.
    pub fn load_gateway(&self, network_id: &str, gateway_id: &str) -> CoreResult<LteGateway> {
        let magmad = magmad_ref(gateway_id);
        let cellular = cellular_ref(gateway_id);
        let refs = BTreeSet::from([magmad.clone(), cellular.clone()]);
        let snapshot = self.load_gateway_snapshot(network_id, gateway_id, &refs)?;

        let resources: Vec<_> = snapshot
            .of_type(entity_type::APN_RESOURCE)
            .cloned()
            .collect();
        LteGateway::from_backend_models(snapshot.entity(&magmad)?, snapshot.entity(&cellular)?, &resources)
    }

    /// Plans an update of a gateway without submitting it.
    ///
    /// # Errors
    ///
    /// See [`plan_gateway_update`].
    pub fn plan_update_gateway(
        &self,
        network_id: &str,
        gateway: &MutableLteGateway,
    ) -> CoreResult<WritePlan> {
        let mut gateway = gateway.clone();
        gateway.apn_resources.assign_missing_ids();
        let snapshot =
            self.load_gateway_snapshot(network_id, &gateway.id, &gateway_write_refs(&gateway))?;
        plan_gateway_update(&self.context(network_id, &snapshot), &gateway)
    }

    /// Updates a gateway.
    ///
    /// # Errors
    ///
    /// See [`plan_gateway_update`].
    pub fn update_gateway(&self, network_id: &str, gateway: &MutableLteGateway) -> CoreResult<()> {
        let plan = self.plan_update_gateway(network_id, gateway)?;
        self.submit(network_id, plan)
    }

    /// Deletes a gateway and its APN resources.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the gateway does not exist.
    pub fn delete_gateway(&self, network_id: &str, gateway_id: &str) -> CoreResult<()> {
        let refs = BTreeSet::from([magmad_ref(gateway_id), cellular_ref(gateway_id)]);
        let snapshot = self.load_gateway_snapshot(network_id, gateway_id, &refs)?;
        let plan = plan_gateway_delete(&self.context(network_id, &snapshot), gateway_id)?;
        self.submit(network_id, plan)
    }

    /// Loads one part of a gateway's cellular config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the gateway does not exist, or
    /// [`CoreError::ConfigNotFound`] if the config or the part is unset.
    pub fn load_gateway_config<C>(&self, network_id: &str, gateway_id: &str) -> CoreResult<C>
    where
        C: SubConfig<GatewayCellularConfigs>,
    {
        let cellular = cellular_ref(gateway_id);
        let snapshot = self.load_one(network_id, &cellular)?;
        let not_found = || CoreError::config_not_found(cellular.to_string(), ConfigKind::CellularGateway);
        let payload = snapshot
            .entity(&cellular)?
            .config
            .as_ref()
            .ok_or_else(not_found)?;
        project_sub_config::<GatewayCellularConfigs, C>(payload)?.ok_or_else(not_found)
    }

    /// Replaces one part of a gateway's cellular config.
    ///
    /// # Errors
    ///
    /// See [`plan_gateway_config_update`].
    pub fn update_gateway_config<C>(&self, network_id: &str, gateway_id: &str, value: C) -> CoreResult<()>
    where
        C: SubConfig<GatewayCellularConfigs>,
    {
        let snapshot = self
            .loader(network_id)
            .load(&BTreeSet::from([cellular_ref(gateway_id)]), LoadOptions::full())?;
        let plan = plan_gateway_config_update(&self.context(network_id, &snapshot), gateway_id, value)?;
        self.submit(network_id, plan)
    }

    /// Loads a gateway's eNodeB serials, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the gateway does not exist.
    pub fn load_enodeb_serials(&self, network_id: &str, gateway_id: &str) -> CoreResult<EnodebSerials> {
        let cellular = cellular_ref(gateway_id);
        let snapshot = self.loader(network_id).load(
            &BTreeSet::from([cellular.clone()]),
            LoadOptions::associations_only(),
        )?;
        Ok(EnodebSerials::from_cellular_entity(snapshot.entity(&cellular)?))
    }

    /// Replaces a gateway's eNodeB serials.
    ///
    /// # Errors
    ///
    /// See [`plan_enodeb_serials_update`].
    pub fn update_enodeb_serials(
        &self,
        network_id: &str,
        gateway_id: &str,
        serials: &EnodebSerials,
    ) -> CoreResult<()> {
        let mut refs = serials.to_refs();
        refs.insert(cellular_ref(gateway_id));
        let snapshot = self
            .loader(network_id)
            .load(&refs, LoadOptions::associations_only())?;
        let plan = plan_enodeb_serials_update(&self.context(network_id, &snapshot), gateway_id, serials)?;
        self.submit(network_id, plan)
    }

    /// Attaches one eNodeB to a gateway. Attaching an attached eNodeB does
    /// nothing.
    ///
    /// # Errors
    ///
    /// See [`plan_enodeb_serials_update`].
    pub fn add_enodeb_serial(&self, network_id: &str, gateway_id: &str, serial: &str) -> CoreResult<()> {
        let mut serials = self.load_enodeb_serials(network_id, gateway_id)?;
        if !serials.0.iter().any(|s| s == serial) {
            serials.0.push(serial.to_string());
        }
        self.update_enodeb_serials(network_id, gateway_id, &serials)
    }

    /// Detaches one eNodeB from a gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the eNodeB is not attached to the
    /// gateway.
    pub fn remove_enodeb_serial(&self, network_id: &str, gateway_id: &str, serial: &str) -> CoreResult<()> {
        let mut serials = self.load_enodeb_serials(network_id, gateway_id)?;
        let before = serials.0.len();
        serials.0.retain(|s| s != serial);
        if serials.0.len() == before {
            return Err(CoreError::not_found(EntityRef::new(
                entity_type::CELLULAR_ENODEB,
                serial,
            )));
        }
        self.update_enodeb_serials(network_id, gateway_id, &serials)
    }
}
