// lib.rs - Core library structure for the payment client

pub mod animation;
pub mod blockchain;
pub mod blockchain_client;
pub mod bridge;
pub mod config;
pub mod errors;
pub mod format;
pub mod payment;
pub mod session;
pub mod storage;
pub mod transaction;
pub mod validation;

// Re-export common types
pub use animation::CountUp;
pub use blockchain::{is_valid_address, AccountRecord, Address, Amount, BalanceLine};
pub use blockchain_client::{fetch_balance, HorizonClient, LedgerGateway, SubmitResponse};
pub use bridge::{BridgeResponse, WalletBridge};
pub use config::{NetworkConfig, NetworkKind, SessionConfig, TxConfig, WalletConfig};
pub use errors::{WalletError, WalletResult};
pub use format::{explorer_tx_url, format_xlm, max_sendable, shorten_address};
pub use payment::{PaymentBuilder, PaymentIntent, PaymentReceipt, PaymentService};
pub use session::{ConnectionStatus, SessionSnapshot, WalletSession};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore, WalletPaths};
pub use transaction::{Memo, Operation, SignedEnvelope, Transaction, UnsignedEnvelope};
pub use validation::{InputValidator, ValidatedPayment};
