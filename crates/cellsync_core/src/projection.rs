//! Config projection between typed configs and opaque payloads.
//!
//! Every typed config is encoded as CBOR and tagged with its
//! [`ConfigKind`]. Extraction checks the tag before decoding, so a payload
//! of the wrong kind fails with [`CoreError::KindMismatch`] instead of
//! decoding into the wrong shape.
//!
//! Composite configs (network and gateway cellular configs) hold nested
//! sub-configs. A sub-config is never patched in place: [`rewrite_sub_config`]
//! decodes the whole parent, replaces the nested field, and re-encodes the
//! parent.

use crate::error::{CoreError, CoreResult};
use crate::kinds::ConfigKind;
use crate::models::{
    ApnConfiguration, ApnResource, EnodebConfiguration, GatewayCellularConfigs,
    MagmadGatewayConfigs, NetworkCellularConfigs, NetworkDnsConfig, NetworkFeatures,
};
use cellsync_store::ConfigPayload;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// A typed config that can be stored as an opaque payload.
pub trait TypedConfig: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug {
    /// Tag written on, and expected from, payloads of this type.
    const KIND: ConfigKind;
}

/// A field of a composite config that is read and written on its own.
///
/// `Parent` is the composite config stored on the backend.
pub trait SubConfig<Parent: TypedConfig>: Sized {
    /// Reads this sub-config out of the parent, if present.
    fn extract(parent: &Parent) -> Option<Self>;

    /// Replaces this sub-config inside the parent.
    fn replace_in(self, parent: &mut Parent);
}

/// Encodes a typed config into a tagged payload.
///
/// # Errors
///
/// Returns [`CoreError::Codec`] if serialization fails.
pub fn to_backend_config<T: TypedConfig>(value: &T) -> CoreResult<ConfigPayload> {
    let mut data = Vec::new();
    ciborium::into_writer(value, &mut data)
        .map_err(|e| CoreError::codec(format!("encoding {} config: {e}", T::KIND)))?;
    Ok(ConfigPayload::new(T::KIND.as_str(), data))
}

/// Decodes a tagged payload into a typed config.
///
/// # Errors
///
/// Returns [`CoreError::KindMismatch`] if the payload's tag is not
/// `T::KIND`, or [`CoreError::Codec`] if the bytes do not decode.
pub fn from_backend_config<T: TypedConfig>(payload: &ConfigPayload) -> CoreResult<T> {
    expect_kind(payload, T::KIND)?;
    ciborium::from_reader(payload.data.as_slice())
        .map_err(|e| CoreError::codec(format!("decoding {} config: {e}", T::KIND)))
}

/// Checks a payload's tag against the expected kind.
///
/// # Errors
///
/// Returns [`CoreError::KindMismatch`] on mismatch.
pub fn expect_kind(payload: &ConfigPayload, expected: ConfigKind) -> CoreResult<()> {
    if payload.kind == expected.as_str() {
        Ok(())
    } else {
        Err(CoreError::kind_mismatch(expected, payload.kind.clone()))
    }
}

/// Reads a sub-config out of a composite parent payload.
///
/// # Errors
///
/// Returns an error if the parent payload does not decode as `P`.
pub fn project_sub_config<P, S>(parent: &ConfigPayload) -> CoreResult<Option<S>>
where
    P: TypedConfig,
    S: SubConfig<P>,
{
    let parent: P = from_backend_config(parent)?;
    Ok(S::extract(&parent))
}

/// Replaces a sub-config by rewriting the whole parent payload.
///
/// # Errors
///
/// Returns an error if the parent payload does not decode as `P`.
pub fn rewrite_sub_config<P, S>(parent: &ConfigPayload, value: S) -> CoreResult<ConfigPayload>
where
    P: TypedConfig,
    S: SubConfig<P>,
{
    let mut decoded: P = from_backend_config(parent)?;
    value.replace_in(&mut decoded);
    to_backend_config(&decoded)
}

/// Any typed config, discriminated by kind.
///
/// Serializes as `{"kind": <tag>, "config": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum AnyConfig {
    /// Network-wide cellular config.
    CellularNetwork(NetworkCellularConfigs),
    /// Network-wide DNS config.
    #[serde(rename = "dnsd_network")]
    DnsNetwork(NetworkDnsConfig),
    /// Network feature flags.
    NetworkFeatures(NetworkFeatures),
    /// Magmad gateway config.
    MagmadGateway(MagmadGatewayConfigs),
    /// Cellular gateway config.
    CellularGateway(GatewayCellularConfigs),
    /// eNodeB config.
    CellularEnodeb(EnodebConfiguration),
    /// APN config.
    Apn(ApnConfiguration),
    /// APN resource.
    ApnResource(ApnResource),
}

impl AnyConfig {
    /// Returns the kind of the contained config.
    #[must_use]
    pub fn kind(&self) -> ConfigKind {
        match self {
            AnyConfig::CellularNetwork(_) => ConfigKind::CellularNetwork,
            AnyConfig::DnsNetwork(_) => ConfigKind::DnsNetwork,
            AnyConfig::NetworkFeatures(_) => ConfigKind::NetworkFeatures,
            AnyConfig::MagmadGateway(_) => ConfigKind::MagmadGateway,
            AnyConfig::CellularGateway(_) => ConfigKind::CellularGateway,
            AnyConfig::CellularEnodeb(_) => ConfigKind::CellularEnodeb,
            AnyConfig::Apn(_) => ConfigKind::Apn,
            AnyConfig::ApnResource(_) => ConfigKind::ApnResource,
        }
    }

    /// Decodes a payload that must be of `expected` kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KindMismatch`] if the tag differs.
    pub fn decode(payload: &ConfigPayload, expected: ConfigKind) -> CoreResult<Self> {
        expect_kind(payload, expected)?;
        Ok(match expected {
            ConfigKind::CellularNetwork => AnyConfig::CellularNetwork(from_backend_config(payload)?),
            ConfigKind::DnsNetwork => AnyConfig::DnsNetwork(from_backend_config(payload)?),
            ConfigKind::NetworkFeatures => AnyConfig::NetworkFeatures(from_backend_config(payload)?),
            ConfigKind::MagmadGateway => AnyConfig::MagmadGateway(from_backend_config(payload)?),
            ConfigKind::CellularGateway => AnyConfig::CellularGateway(from_backend_config(payload)?),
            ConfigKind::CellularEnodeb => AnyConfig::CellularEnodeb(from_backend_config(payload)?),
            ConfigKind::Apn => AnyConfig::Apn(from_backend_config(payload)?),
            ConfigKind::ApnResource => AnyConfig::ApnResource(from_backend_config(payload)?),
        })
    }

    /// Decodes a payload using its own tag.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if the tag names no known kind.
    pub fn decode_tagged(payload: &ConfigPayload) -> CoreResult<Self> {
        let kind = ConfigKind::from_tag(&payload.kind)
            .ok_or_else(|| CoreError::codec(format!("unknown config kind {:?}", payload.kind)))?;
        Self::decode(payload, kind)
    }

    /// Encodes the contained config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Codec`] if serialization fails.
    pub fn encode(&self) -> CoreResult<ConfigPayload> {
        match self {
            AnyConfig::CellularNetwork(c) => to_backend_config(c),
            AnyConfig::DnsNetwork(c) => to_backend_config(c),
            AnyConfig::NetworkFeatures(c) => to_backend_config(c),
            AnyConfig::MagmadGateway(c) => to_backend_config(c),
            AnyConfig::CellularGateway(c) => to_backend_config(c),
            AnyConfig::CellularEnodeb(c) => to_backend_config(c),
            AnyConfig::Apn(c) => to_backend_config(c),
            AnyConfig::ApnResource(c) => to_backend_config(c),
        }
    }
}
