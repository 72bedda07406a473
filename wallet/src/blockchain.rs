/// Core ledger types for the Stellar payment client
///
/// Account identifiers use the StrKey encoding (`G...`), amounts are kept as
/// fixed-point stroop counts so balances never pass through floating point.
use crate::errors::{WalletError, WalletResult};
use crc::{Crc, CRC_16_XMODEM};
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// StrKey version byte for ed25519 account ids (renders as 'G').
const VERSION_BYTE_ACCOUNT_ID: u8 = 6 << 3;
const PUBLIC_KEY_LEN: usize = 32;
/// version byte + key + crc16
const STRKEY_PAYLOAD_LEN: usize = 1 + PUBLIC_KEY_LEN + 2;
/// 35 bytes encode to exactly 56 base32 characters, no padding.
pub const ADDRESS_LEN: usize = 56;

const STRKEY_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// A Stellar account address
///
/// Immutable once created; construction guarantees the checksum and version
/// byte are valid, so holders never need to re-validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    public_key: [u8; PUBLIC_KEY_LEN],
    encoded: String,
}

impl Address {
    /// Build an address from a raw ed25519 public key
    pub fn from_public_key(public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        let mut payload = Vec::with_capacity(STRKEY_PAYLOAD_LEN);
        payload.push(VERSION_BYTE_ACCOUNT_ID);
        payload.extend_from_slice(&public_key);
        let checksum = STRKEY_CRC.checksum(&payload);
        payload.extend_from_slice(&checksum.to_le_bytes());

        Address {
            public_key,
            encoded: BASE32_NOPAD.encode(&payload),
        }
    }

    /// Parse a StrKey account id
    pub fn from_string(address: &str) -> WalletResult<Self> {
        if address.is_empty() {
            return Err(WalletError::InvalidAddress(
                "Address cannot be empty".to_string(),
            ));
        }

        if address.len() != ADDRESS_LEN {
            return Err(WalletError::InvalidAddress(format!(
                "Invalid address length: expected {} characters, got {}",
                ADDRESS_LEN,
                address.len()
            )));
        }

        let payload = BASE32_NOPAD
            .decode(address.as_bytes())
            .map_err(|e| WalletError::InvalidAddress(format!("Invalid base32 in address: {}", e)))?;
        if payload.len() != STRKEY_PAYLOAD_LEN {
            return Err(WalletError::InvalidAddress(
                "Invalid decoded address length".to_string(),
            ));
        }

        if payload[0] != VERSION_BYTE_ACCOUNT_ID {
            return Err(WalletError::InvalidAddress(
                "Address is not an account public key".to_string(),
            ));
        }

        let (body, checksum) = payload.split_at(1 + PUBLIC_KEY_LEN);
        let expected = STRKEY_CRC.checksum(body).to_le_bytes();
        if checksum != expected {
            return Err(WalletError::InvalidAddress(
                "Address checksum mismatch".to_string(),
            ));
        }

        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&body[1..]);
        Ok(Address {
            public_key,
            encoded: address.to_string(),
        })
    }

    /// Raw ed25519 public key bytes
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Last four key bytes, used as the signature hint in envelopes
    pub fn signature_hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.public_key[PUBLIC_KEY_LEN - 4..]);
        hint
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

/// Address format check used by forms; never errors.
pub fn is_valid_address(address: &str) -> bool {
    Address::from_string(address).is_ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_string(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.encoded
    }
}

/// Represents an amount of XLM
///
/// Stored as stroops (1 XLM = 10_000_000 stroops), the ledger's own unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount {
    stroops: i64,
}

impl Amount {
    /// Number of decimal places the ledger tracks
    pub const DECIMALS: u8 = 7;
    pub const STROOPS_PER_XLM: i64 = 10_000_000;
    pub const ZERO: Amount = Amount { stroops: 0 };
    pub const ONE_XLM: Amount = Amount {
        stroops: Self::STROOPS_PER_XLM,
    };

    pub fn from_stroops(stroops: i64) -> WalletResult<Self> {
        if stroops < 0 {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be negative".to_string(),
            ));
        }
        Ok(Amount { stroops })
    }

    /// Parse a decimal string with at most seven fractional digits
    pub fn from_string(amount_str: &str) -> WalletResult<Self> {
        if amount_str.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        let (whole_str, fractional_str) = match amount_str.split_once('.') {
            Some((whole, fractional)) => (whole, Some(fractional)),
            None => (amount_str, None),
        };

        if whole_str.is_empty() || !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WalletError::InvalidAmount(
                "Invalid number format".to_string(),
            ));
        }

        let whole: i64 = whole_str
            .parse()
            .map_err(|_| WalletError::InvalidAmount("Amount too large".to_string()))?;

        let fractional = match fractional_str {
            Some(fraction) => {
                if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(WalletError::InvalidAmount(
                        "Invalid decimal format".to_string(),
                    ));
                }
                if fraction.len() > Self::DECIMALS as usize {
                    return Err(WalletError::InvalidAmount(
                        "Too many decimal places".to_string(),
                    ));
                }
                let padded = format!("{:0<7}", fraction);
                padded.parse::<i64>().map_err(|_| {
                    WalletError::InvalidAmount("Invalid fractional part".to_string())
                })?
            }
            None => 0,
        };

        let stroops = whole
            .checked_mul(Self::STROOPS_PER_XLM)
            .and_then(|w| w.checked_add(fractional))
            .ok_or_else(|| WalletError::InvalidAmount("Amount overflow".to_string()))?;

        Ok(Amount { stroops })
    }

    pub fn stroops(&self) -> i64 {
        self.stroops
    }

    pub fn is_zero(&self) -> bool {
        self.stroops == 0
    }

    /// Lossy conversion for cosmetic use only (animations, charts)
    pub fn as_xlm_f64(&self) -> f64 {
        self.stroops as f64 / Self::STROOPS_PER_XLM as f64
    }

    pub fn checked_add(&self, other: &Amount) -> WalletResult<Amount> {
        self.stroops
            .checked_add(other.stroops)
            .map(|stroops| Amount { stroops })
            .ok_or_else(|| WalletError::InvalidAmount("Amount overflow in addition".to_string()))
    }

    pub fn checked_sub(&self, other: &Amount) -> WalletResult<Amount> {
        if self.stroops < other.stroops {
            return Err(WalletError::InvalidAmount(
                "Insufficient amount for subtraction".to_string(),
            ));
        }
        Ok(Amount {
            stroops: self.stroops - other.stroops,
        })
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        Amount {
            stroops: (self.stroops - other.stroops).max(0),
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

/// Horizon form: always seven decimals, e.g. `100.0000000`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:07}",
            self.stroops / Self::STROOPS_PER_XLM,
            self.stroops % Self::STROOPS_PER_XLM
        )
    }
}

impl FromStr for Amount {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::from_string(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_string(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

/// One entry of an account's balance list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_code: Option<String>,
    pub balance: Amount,
}

impl BalanceLine {
    pub fn is_native(&self) -> bool {
        self.asset_type == "native"
    }
}

/// Ledger view of an existing account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: Address,
    /// Current sequence number; the next transaction must use `sequence + 1`.
    pub sequence: i64,
    pub balances: Vec<BalanceLine>,
}

impl AccountRecord {
    pub fn native_balance(&self) -> Amount {
        self.balances
            .iter()
            .find(|line| line.is_native())
            .map(|line| line.balance)
            .unwrap_or(Amount::ZERO)
    }

    pub fn next_sequence(&self) -> WalletResult<i64> {
        self.sequence
            .checked_add(1)
            .ok_or_else(|| WalletError::InvalidResponse("Sequence number overflow".to_string()))
    }
}
