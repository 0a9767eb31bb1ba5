//! eNodeB operations.

use super::Configurator;
use crate::error::CoreResult;
use crate::kinds::entity_type;
use crate::models::Enodeb;
use crate::sync::{LoadOptions, WriteComposer};
use cellsync_store::{EntityRef, EntityStore};

impl<S: EntityStore> Configurator<S> {
    /// Creates an eNodeB. Attachment to a gateway is made from the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`](crate::CoreError::AlreadyExists)
    /// if the serial is taken.
    pub fn create_enodeb(&self, network_id: &str, enodeb: &Enodeb) -> CoreResult<()> {
        let plan = WriteComposer::new(self.config()).compose(
            vec![enodeb.to_entity_create()?],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }

    /// Loads an eNodeB, including the gateway it is attached to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`](crate::CoreError::NotFound) if it
    /// does not exist.
    pub fn load_enodeb(&self, network_id: &str, serial: &str) -> CoreResult<Enodeb> {
        let entity = EntityRef::new(entity_type::CELLULAR_ENODEB, serial);
        let snapshot = self.load_one(network_id, &entity)?;
        Enodeb::from_backend_models(snapshot.entity(&entity)?)
    }

    /// Lists every eNodeB in the network, ordered by serial.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails or a config does not decode.
    pub fn list_enodebs(&self, network_id: &str) -> CoreResult<Vec<Enodeb>> {
        self.loader(network_id)
            .load_type(entity_type::CELLULAR_ENODEB, LoadOptions::full())?
            .entities()
            .map(Enodeb::from_backend_models)
            .collect()
    }

    /// Replaces an eNodeB's name, description and config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`](crate::CoreError::NotFound) if it
    /// does not exist.
    pub fn update_enodeb(&self, network_id: &str, enodeb: &Enodeb) -> CoreResult<()> {
        let entity = enodeb.entity_ref();
        let snapshot = self.load_one(network_id, &entity)?;
        let update = enodeb.to_entity_update()?.without_unchanged(snapshot.entity(&entity)?);
        let plan = WriteComposer::new(self.config()).compose(
            Vec::new(),
            vec![update],
            Vec::new(),
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }

    /// Deletes an eNodeB, detaching it from its gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`](crate::CoreError::NotFound) if it
    /// does not exist.
    pub fn delete_enodeb(&self, network_id: &str, serial: &str) -> CoreResult<()> {
        let entity = EntityRef::new(entity_type::CELLULAR_ENODEB, serial);
        self.load_one(network_id, &entity)?;
        let plan = WriteComposer::new(self.config()).compose(
            Vec::new(),
            Vec::new(),
            vec![entity],
            Vec::new(),
        )?;
        self.submit(network_id, plan)
    }
}
