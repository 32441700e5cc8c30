//! Anonymous client identity sent with profile requests.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identifies this machine to the policy authority without revealing the
/// hardware address itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIdentity {
    /// Upper-case hex SHA-256 of the primary MAC address, or empty when no
    /// network interface could be found.
    pub hmac: String,
}

impl ClientIdentity {
    pub fn create() -> Self {
        match mac_address::get_mac_address() {
            Ok(Some(mac)) => Self::from_mac(&mac.bytes()),
            Ok(None) => {
                tracing::debug!("no network interface found; sending empty client identity");
                Self::anonymous()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to read MAC address; sending empty client identity");
                Self::anonymous()
            }
        }
    }

    pub fn from_mac(mac: &[u8]) -> Self {
        Self {
            hmac: hex::encode_upper(Sha256::digest(mac)),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            hmac: String::new(),
        }
    }
}
