//! Decoded execution configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use skiff_backend::ObjectRef;
use skiff_common::{ResourceQuantity, SkiffError, SkiffResult};

/// Name of the auxiliary network used for control-plane bookkeeping.
pub const CLIENT_NETWORK: &str = "client";

/// A named network endpoint from the decoded configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    /// Endpoint name.
    pub name: String,
    /// Reference to the backing network.
    pub network: ObjectRef,
}

/// Decoded control-plane execution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecConfig {
    /// Compute resources this control plane may schedule into.
    ///
    /// Exactly one entry is required at bootstrap.
    #[serde(default)]
    pub compute_resources: Vec<ObjectRef>,
    /// Named network endpoints available to containers.
    #[serde(default)]
    pub networks: HashMap<String, NetworkEndpoint>,
    /// Configured CPU limit for the control plane's pool, e.g. "2GHz".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<ResourceQuantity>,
    /// Configured memory limit for the control plane's pool, e.g. "4Gi".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<ResourceQuantity>,
}

/// Source of the encoded execution configuration.
///
/// Decoding transport (guestinfo keys, environment, files) lives with the
/// embedder; the synchronizer only consumes the decoded form.
pub trait ConfigSource: Send + Sync {
    /// Decode the configuration carried by this source.
    ///
    /// # Errors
    ///
    /// Returns [`SkiffError::Config`] if the payload cannot be decoded.
    fn decode(&self) -> SkiffResult<ExecConfig>;
}

/// A JSON-encoded configuration source.
#[derive(Debug, Clone)]
pub struct JsonConfigSource {
    raw: String,
}

impl JsonConfigSource {
    /// Wrap a raw JSON payload.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl ConfigSource for JsonConfigSource {
    fn decode(&self) -> SkiffResult<ExecConfig> {
        serde_json::from_str(&self.raw).map_err(|error| SkiffError::Config {
            message: format!("invalid execution config: {error}"),
        })
    }
}
