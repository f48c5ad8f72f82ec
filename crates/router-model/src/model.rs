//! Frontend/backend model
//!
//! A [`FrontendTable`] maps service ids to [`Frontend`]s. It is the value
//! that gets serialized to the router config file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single backend target.
///
/// `Endpoint::default()` (empty ip and port) is a placeholder slot left by
/// an unparseable endpoint entry; it is stored like any other endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Target address
    pub ip: String,
    /// Target port, kept as text
    pub port: String,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(ip: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// A group of endpoints registered on a frontend by one `add_route` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    /// Host alias this backend is bound to (empty for all aliases)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
    /// Path prefix (empty for all paths)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Free-form router annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Targets, in registration order
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// A load balancer frontend, named by service id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frontend {
    /// Service id
    pub name: String,
    /// Optional upstream URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Host names routed to this frontend, without duplicates
    #[serde(default)]
    pub host_aliases: Vec<String>,
    /// Backends, in registration order
    #[serde(default)]
    pub backends: Vec<Backend>,
}

impl Frontend {
    /// Creates an empty frontend.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns true if the frontend carries the host alias.
    pub fn has_alias(&self, alias: &str) -> bool {
        self.host_aliases.iter().any(|a| a == alias)
    }

    /// All endpoints across all backends, in registration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.backends.iter().flat_map(|b| b.endpoints.iter())
    }
}

/// Frontends keyed by service id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontendTable {
    frontends: BTreeMap<String, Frontend>,
}

impl FrontendTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a frontend.
    pub fn get(&self, name: &str) -> Option<&Frontend> {
        self.frontends.get(name)
    }

    /// Inserts an empty frontend unless one already exists, returning it.
    pub fn ensure(&mut self, name: &str, url: &str) -> &mut Frontend {
        self.frontends
            .entry(name.to_string())
            .or_insert_with(|| Frontend::new(name, url))
    }

    /// Adds an alias, creating the frontend if needed.
    pub fn add_alias(&mut self, alias: &str, name: &str) {
        let frontend = self.ensure(name, "");
        if !frontend.has_alias(alias) {
            frontend.host_aliases.push(alias.to_string());
        }
    }

    /// Removes a frontend. Returns the removed value, if any.
    pub fn remove(&mut self, name: &str) -> Option<Frontend> {
        self.frontends.remove(name)
    }

    /// Clears the backends of a frontend, if it exists.
    pub fn clear_backends(&mut self, name: &str) {
        if let Some(frontend) = self.frontends.get_mut(name) {
            frontend.backends.clear();
        }
    }

    /// Appends a backend, creating the frontend if needed.
    pub fn add_backend(&mut self, name: &str, backend: Backend) {
        self.ensure(name, "").backends.push(backend);
    }

    /// Number of frontends.
    pub fn len(&self) -> usize {
        self.frontends.len()
    }

    /// True if there are no frontends.
    pub fn is_empty(&self) -> bool {
        self.frontends.is_empty()
    }
}
