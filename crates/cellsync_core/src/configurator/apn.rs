//! APN operations.

use super::Configurator;
use crate::error::{CoreError, CoreResult};
use crate::kinds::entity_type;
use crate::models::Apn;
use crate::sync::{LoadOptions, WriteComposer};
use cellsync_store::{EntityRef, EntityStore};

impl<S: EntityStore> Configurator<S> {
    /// Creates an APN.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if the name is taken.
    pub fn create_apn(&self, network_id: &str, apn: &Apn) -> CoreResult<()> {
        let plan = WriteComposer::new(self.config()).compose(
            vec![apn.to_entity_create()?],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }

    /// Loads an APN.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if it does not exist.
    pub fn load_apn(&self, network_id: &str, apn_name: &str) -> CoreResult<Apn> {
        let entity = EntityRef::new(entity_type::APN, apn_name);
        let snapshot = self.load_one(network_id, &entity)?;
        Apn::from_backend_models(snapshot.entity(&entity)?)
    }

    /// Lists every APN in the network, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails or a config does not decode.
    pub fn list_apns(&self, network_id: &str) -> CoreResult<Vec<Apn>> {
        self.loader(network_id)
            .load_type(entity_type::APN, LoadOptions::full().include_associations(false))?
            .entities()
            .map(Apn::from_backend_models)
            .collect()
    }

    /// Replaces an APN's config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if it does not exist.
    pub fn update_apn(&self, network_id: &str, apn: &Apn) -> CoreResult<()> {
        let entity = apn.entity_ref();
        let snapshot = self.load_one(network_id, &entity)?;
        let update = apn.to_entity_update()?.without_unchanged(snapshot.entity(&entity)?);
        let plan = WriteComposer::new(self.config()).compose(
            Vec::new(),
            vec![update],
            Vec::new(),
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }

    /// Deletes an APN no gateway still configures.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if it does not exist, or
    /// [`CoreError::Validation`] if APN resources still point at it.
    pub fn delete_apn(&self, network_id: &str, apn_name: &str) -> CoreResult<()> {
        let entity = EntityRef::new(entity_type::APN, apn_name);
        let snapshot = self.load_one(network_id, &entity)?;
        let users: Vec<String> = snapshot
            .entity(&entity)?
            .parents_of(entity_type::APN_RESOURCE)
            .map(|resource| resource.key.clone())
            .collect();
        if !users.is_empty() {
            return Err(CoreError::validation(format!(
                "apn {apn_name} is still used by apn resources {}",
                users.join(", ")
            )));
        }

        let plan = WriteComposer::new(self.config()).compose(
            Vec::new(),
            Vec::new(),
            vec![entity],
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }
}
