use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::Amount;

pub const MSG_WALLET_NOT_INSTALLED: &str =
    "Freighter wallet is not installed. Please install it from https://www.freighter.app/";
pub const MSG_CONNECTION_FAILED: &str = "Failed to connect to Freighter wallet";
pub const MSG_TRANSACTION_FAILED: &str = "Transaction failed. Please try again.";
pub const MSG_INSUFFICIENT_BALANCE: &str = "Insufficient XLM balance";
pub const MSG_INVALID_ADDRESS: &str = "Invalid Stellar address";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletError {
    // Wallet extension errors
    WalletNotInstalled,
    WalletConnectionFailed(String),
    UserRejectedSigning,
    SigningFailed(String),

    // Validation errors
    ValidationError(String),
    InvalidAddress(String),
    InvalidAmount(String),
    InvalidMemo(String),
    SameAccount,
    InsufficientBalance { requested: Amount, available: Amount },

    // Network errors
    NetworkError(String),
    NetworkSubmitFailed(String),
    InvalidResponse(String),

    // Storage errors
    StorageError(String),

    // Application errors
    NotFound(String),

    // Generic errors
    Unknown(String),
}

impl WalletError {
    /// Text rendered to the user at the UI boundary.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::WalletNotInstalled => MSG_WALLET_NOT_INSTALLED.to_string(),
            WalletError::WalletConnectionFailed(_) => MSG_CONNECTION_FAILED.to_string(),
            WalletError::UserRejectedSigning => "Transaction was rejected by user".to_string(),
            WalletError::InvalidAddress(_) => MSG_INVALID_ADDRESS.to_string(),
            WalletError::SameAccount => "Cannot send a payment to your own address".to_string(),
            WalletError::InvalidAmount(_) => "Please enter a valid amount".to_string(),
            WalletError::InsufficientBalance { .. } => MSG_INSUFFICIENT_BALANCE.to_string(),
            WalletError::InvalidMemo(msg) | WalletError::ValidationError(msg) => msg.clone(),
            WalletError::NetworkSubmitFailed(msg) => {
                format!("{} ({})", MSG_TRANSACTION_FAILED, msg)
            }
            _ => MSG_TRANSACTION_FAILED.to_string(),
        }
    }

    /// Stable identifier for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::WalletNotInstalled => "WalletNotInstalled",
            WalletError::WalletConnectionFailed(_) => "WalletConnectionFailed",
            WalletError::UserRejectedSigning => "UserRejectedSigning",
            WalletError::SigningFailed(_) => "SigningFailed",
            WalletError::ValidationError(_) => "ValidationError",
            WalletError::InvalidAddress(_) => "InvalidAddress",
            WalletError::InvalidAmount(_) => "InvalidAmount",
            WalletError::InvalidMemo(_) => "InvalidMemo",
            WalletError::SameAccount => "SameAccount",
            WalletError::InsufficientBalance { .. } => "InsufficientBalance",
            WalletError::NetworkError(_) => "NetworkError",
            WalletError::NetworkSubmitFailed(_) => "NetworkSubmitFailed",
            WalletError::InvalidResponse(_) => "InvalidResponse",
            WalletError::StorageError(_) => "StorageError",
            WalletError::NotFound(_) => "NotFound",
            WalletError::Unknown(_) => "Unknown",
        }
    }

    /// True for errors raised before any network call was issued.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            WalletError::ValidationError(_)
                | WalletError::InvalidAddress(_)
                | WalletError::InvalidAmount(_)
                | WalletError::InvalidMemo(_)
                | WalletError::SameAccount
                | WalletError::InsufficientBalance { .. }
        )
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::WalletNotInstalled => write!(f, "Wallet extension not installed"),
            WalletError::WalletConnectionFailed(msg) => {
                write!(f, "Wallet connection failed: {}", msg)
            }
            WalletError::UserRejectedSigning => write!(f, "Signing rejected by user"),
            WalletError::SigningFailed(msg) => write!(f, "Signing failed: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            WalletError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            WalletError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            WalletError::InvalidMemo(msg) => write!(f, "Invalid memo: {}", msg),
            WalletError::SameAccount => write!(f, "Destination equals source account"),
            WalletError::InsufficientBalance {
                requested,
                available,
            } => write!(
                f,
                "Insufficient balance: requested {}, available {}",
                requested, available
            ),

            WalletError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            WalletError::NetworkSubmitFailed(msg) => write!(f, "Submission failed: {}", msg),
            WalletError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            WalletError::StorageError(msg) => write!(f, "Storage error: {}", msg),

            WalletError::NotFound(msg) => write!(f, "Not found: {}", msg),

            WalletError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        WalletError::StorageError(error.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::InvalidResponse(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(error: reqwest::Error) -> Self {
        WalletError::NetworkError(format!("HTTP request failed: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_follow_ui_copy() {
        assert_eq!(
            WalletError::WalletNotInstalled.user_message(),
            MSG_WALLET_NOT_INSTALLED
        );
        assert_eq!(
            WalletError::InvalidAddress("bad".into()).user_message(),
            MSG_INVALID_ADDRESS
        );
        let insufficient = WalletError::InsufficientBalance {
            requested: Amount::ONE_XLM,
            available: Amount::ZERO,
        };
        assert_eq!(insufficient.user_message(), MSG_INSUFFICIENT_BALANCE);
        assert!(insufficient.is_local_rejection());
        assert!(!WalletError::NetworkSubmitFailed("tx_bad_seq".into()).is_local_rejection());
    }
}
