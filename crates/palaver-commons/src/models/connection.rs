//! Connection-level metadata captured at handshake time.

use serde::{Deserialize, Serialize};

/// Information about the physical connection a request arrived on.
///
/// Carried for audit logging; separate from any session-keyed identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Remote address as reported by the transport, when known.
    pub remote_addr: Option<String>,
}

impl ConnectionInfo {
    pub fn new(remote_addr: Option<String>) -> Self {
        Self { remote_addr }
    }

    /// True when the peer is a loopback address.
    pub fn is_localhost(&self) -> bool {
        match self.remote_addr.as_deref() {
            Some(addr) => {
                let host = addr.rsplit_once(':').map(|(h, _)| h).unwrap_or(addr);
                host == "127.0.0.1" || host == "::1" || host.starts_with("127.")
            }
            None => false,
        }
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self { remote_addr: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_detection() {
        assert!(ConnectionInfo::new(Some("127.0.0.1:51234".into())).is_localhost());
        assert!(ConnectionInfo::new(Some("::1".into())).is_localhost());
        assert!(!ConnectionInfo::new(Some("10.0.0.7:80".into())).is_localhost());
        assert!(!ConnectionInfo::new(None).is_localhost());
    }
}
