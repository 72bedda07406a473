//! Wallet extension contract.
//!
//! The extension answers with several shapes depending on its version: a
//! bare string, `{ address }`, `{ publicKey }`, `{ signedTxXdr }`,
//! `{ isConnected }` or `{ error }` where the error is a string or an object.
//! All of them are folded into [`BridgeResponse`] here, at the boundary, so
//! the rest of the crate only sees one tagged type.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::blockchain::Address;
use crate::errors::{WalletError, WalletResult};
use crate::transaction::UnsignedEnvelope;

/// Browser-extension wallet that holds the user's keys.
///
/// This crate never sees key material; it only asks the extension for the
/// account address and for signatures over envelopes it built.
#[async_trait(?Send)]
pub trait WalletBridge {
    /// Whether the extension is installed and reachable.
    async fn is_available(&self) -> bool;

    /// Prompt the user to share their account.
    async fn request_access(&self) -> WalletResult<Address>;

    /// Account the extension currently exposes, without prompting.
    async fn current_address(&self) -> WalletResult<Option<Address>>;

    /// Ask the user to sign; returns the signed envelope as base64 XDR.
    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network_passphrase: &str,
    ) -> WalletResult<String>;
}

/// Normalized extension reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeResponse {
    Address(String),
    SignedTransaction(String),
    Connected(bool),
    /// The user declined in the extension UI.
    Rejected(String),
    Failed(String),
    Empty,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    Plain(String),
    Object(RawObject),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObject {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
    #[serde(default)]
    signed_tx_xdr: Option<String>,
    #[serde(default)]
    is_connected: Option<bool>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawError {
    Message(String),
    Detailed { message: String },
}

/// Which payload a bare string carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Address,
    SignedTransaction,
}

impl BridgeResponse {
    /// Normalize a reply to an access or address query.
    pub fn from_access(value: Value) -> Self {
        Self::normalize(value, Expect::Address)
    }

    /// Normalize a reply to a signing request.
    pub fn from_sign(value: Value) -> Self {
        Self::normalize(value, Expect::SignedTransaction)
    }

    /// Classify an error message thrown by the extension.
    pub fn from_error_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("declined") || lowered.contains("rejected") {
            BridgeResponse::Rejected(message)
        } else {
            BridgeResponse::Failed(message)
        }
    }

    fn normalize(value: Value, expect: Expect) -> Self {
        if value.is_null() {
            return BridgeResponse::Empty;
        }
        if let Value::Bool(flag) = value {
            return BridgeResponse::Connected(flag);
        }

        let raw = match serde_json::from_value::<RawResponse>(value) {
            Ok(raw) => raw,
            Err(e) => return BridgeResponse::Failed(format!("Unrecognized wallet reply: {}", e)),
        };

        match raw {
            RawResponse::Plain(text) if text.trim().is_empty() => BridgeResponse::Empty,
            RawResponse::Plain(text) => match expect {
                Expect::Address => BridgeResponse::Address(text),
                Expect::SignedTransaction => BridgeResponse::SignedTransaction(text),
            },
            RawResponse::Object(object) => {
                if let Some(error) = object.error {
                    let message = match error {
                        RawError::Message(message) => message,
                        RawError::Detailed { message } => message,
                    };
                    return Self::from_error_message(message);
                }
                if let Some(xdr) = object.signed_tx_xdr.filter(|xdr| !xdr.is_empty()) {
                    return BridgeResponse::SignedTransaction(xdr);
                }
                if let Some(address) = object
                    .address
                    .filter(|a| !a.is_empty())
                    .or(object.public_key.filter(|k| !k.is_empty()))
                {
                    return BridgeResponse::Address(address);
                }
                if let Some(flag) = object.is_connected {
                    return BridgeResponse::Connected(flag);
                }
                BridgeResponse::Empty
            }
        }
    }

    /// Interpret as the answer to an access prompt.
    pub fn into_access_address(self) -> WalletResult<Address> {
        match self {
            BridgeResponse::Address(address) => Address::from_string(&address).map_err(|e| {
                WalletError::WalletConnectionFailed(format!("Wallet returned a bad address: {}", e))
            }),
            BridgeResponse::Rejected(message) | BridgeResponse::Failed(message) => {
                Err(WalletError::WalletConnectionFailed(message))
            }
            _ => Err(WalletError::WalletConnectionFailed(
                "Failed to retrieve public key".to_string(),
            )),
        }
    }

    /// Interpret as a passive address query; "nothing shared" is not an error.
    pub fn into_current_address(self) -> WalletResult<Option<Address>> {
        match self {
            BridgeResponse::Address(address) => Address::from_string(&address).map(Some),
            BridgeResponse::Empty | BridgeResponse::Connected(_) => Ok(None),
            BridgeResponse::Rejected(message) | BridgeResponse::Failed(message) => {
                Err(WalletError::WalletConnectionFailed(message))
            }
            BridgeResponse::SignedTransaction(_) => Err(WalletError::InvalidResponse(
                "Unexpected signed transaction in address reply".to_string(),
            )),
        }
    }

    /// Interpret as the answer to a signing request.
    pub fn into_signed_xdr(self) -> WalletResult<String> {
        match self {
            BridgeResponse::SignedTransaction(xdr) => Ok(xdr),
            BridgeResponse::Rejected(_) => Err(WalletError::UserRejectedSigning),
            BridgeResponse::Failed(message) => Err(WalletError::SigningFailed(message)),
            _ => Err(WalletError::SigningFailed(
                "No signed transaction returned from wallet".to_string(),
            )),
        }
    }

    /// Interpret as an availability probe.
    pub fn is_connected(&self) -> bool {
        match self {
            BridgeResponse::Connected(flag) => *flag,
            BridgeResponse::Address(_) => true,
            _ => false,
        }
    }
}
