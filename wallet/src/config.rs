//! Network presets and envelope/session parameters.
//!
//! The network is picked at compile time through `STELLAR_PAY_NETWORK`;
//! nothing here is read from or written to disk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Which ledger network the client talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Testnet,
    Public,
}

impl NetworkKind {
    /// Network chosen at build time through `STELLAR_PAY_NETWORK`.
    pub fn build_default() -> Self {
        Self::parse(option_env!("STELLAR_PAY_NETWORK").unwrap_or("testnet"))
    }

    /// Unknown names fall back to testnet.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" | "mainnet" | "pubnet" => NetworkKind::Public,
            _ => NetworkKind::Testnet,
        }
    }

    pub fn config(self) -> NetworkConfig {
        match self {
            NetworkKind::Testnet => NetworkConfig {
                kind: self,
                name: "Testnet".to_string(),
                network_passphrase: TESTNET_PASSPHRASE.to_string(),
                horizon_url: "https://horizon-testnet.stellar.org".to_string(),
                explorer_url: "https://stellar.expert/explorer/testnet".to_string(),
            },
            NetworkKind::Public => NetworkConfig {
                kind: self,
                name: "Public Network".to_string(),
                network_passphrase: PUBLIC_PASSPHRASE.to_string(),
                horizon_url: "https://horizon.stellar.org".to_string(),
                explorer_url: "https://stellar.expert/explorer/public".to_string(),
            },
        }
    }
}

/// Endpoint/passphrase pair for one network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub kind: NetworkKind,
    pub name: String,
    pub network_passphrase: String,
    pub horizon_url: String,
    pub explorer_url: String,
}

impl NetworkConfig {
    /// SHA-256 of the passphrase; mixed into every transaction hash.
    pub fn network_id(&self) -> [u8; 32] {
        let digest = Sha256::digest(self.network_passphrase.as_bytes());
        let mut output = [0u8; 32];
        output.copy_from_slice(&digest);
        output
    }

    pub fn explorer_tx_url(&self, hash: &str) -> String {
        crate::format::explorer_tx_url(&self.explorer_url, hash)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkKind::build_default().config()
    }
}

/// Envelope parameters applied to every payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxConfig {
    /// Validity window in seconds after which the network refuses the envelope.
    pub timeout_secs: u64,
    /// Fee per operation, in stroops.
    pub base_fee: u32,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            base_fee: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay before re-reading the balance after a confirmed payment.
    pub post_payment_refresh_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            post_payment_refresh_ms: 2000,
        }
    }
}

/// Settings a session is built from. Chosen at build time, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    pub network: NetworkConfig,
    pub tx: TxConfig,
    pub session: SessionConfig,
}

impl WalletConfig {
    pub fn for_network(kind: NetworkKind) -> Self {
        Self {
            network: kind.config(),
            ..Self::default()
        }
    }
}
