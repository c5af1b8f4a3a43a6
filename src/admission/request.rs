//! Request metadata consumed by the gate.

use std::collections::HashMap;
use std::net::SocketAddr;

/// The view of an inbound request the gate needs to make its decision.
///
/// The protocol layer builds one of these per request from whatever framework
/// types it uses; the gate never sees the request itself.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    path: String,
    peer_addr: Option<SocketAddr>,
    /// Header names are stored lowercased for case-insensitive lookup.
    headers: HashMap<String, String>,
}

impl RequestMetadata {
    /// Create metadata for a request to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            peer_addr: None,
            headers: HashMap::new(),
        }
    }

    /// Set the direct peer address of the connection.
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Attach a request header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The direct peer address, if known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
