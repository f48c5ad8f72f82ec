//! Endpoint sets and endpoint string parsing.

use k8s_openapi::api::core::v1::Endpoints;
use kube::ResourceExt;
use router_model::Endpoint;

/// Port used when an endpoint string carries none
pub const DEFAULT_PORT: &str = "80";

/// Addresses behind one service, as `"ip"` or `"ip:port"` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSet {
    /// Service id (the Endpoints object name)
    pub id: String,
    /// One entry per ready address and port, in subset order
    pub endpoints: Vec<String>,
}

impl From<&Endpoints> for EndpointSet {
    fn from(endpoints: &Endpoints) -> Self {
        let mut entries = Vec::new();
        for subset in endpoints.subsets.iter().flatten() {
            let ports: Vec<i32> = subset.ports.iter().flatten().map(|p| p.port).collect();
            for address in subset.addresses.iter().flatten() {
                if ports.is_empty() {
                    entries.push(address.ip.clone());
                } else {
                    entries.extend(ports.iter().map(|port| format!("{}:{}", address.ip, port)));
                }
            }
        }
        Self {
            id: endpoints.name_any(),
            endpoints: entries,
        }
    }
}

/// Parses endpoint strings into `(ip, port)` pairs, one slot per input.
///
/// The first two colon-separated fields are ip and port; a missing port is
/// [`DEFAULT_PORT`]. An empty string leaves its slot as the empty
/// placeholder `Endpoint::default()`.
pub fn parse_endpoints(raw: &[String]) -> Vec<Endpoint> {
    let mut parsed = vec![Endpoint::default(); raw.len()];
    for (slot, entry) in parsed.iter_mut().zip(raw) {
        if entry.is_empty() {
            continue;
        }
        let mut fields = entry.split(':');
        let ip = fields.next().unwrap_or_default();
        let port = fields.next().unwrap_or(DEFAULT_PORT);
        *slot = Endpoint::new(ip, port);
    }
    parsed
}
