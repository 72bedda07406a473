//! Payment building and submission.
//!
//! A payment to an account that already exists on the ledger is a native
//! `Payment` operation. A payment to an unknown account has to create it, so
//! the builder switches to `CreateAccount` with the amount as the starting
//! balance. Both variants carry the same fee and validity window.

use serde::{Deserialize, Serialize};

use crate::blockchain::{AccountRecord, Address, Amount};
use crate::blockchain_client::LedgerGateway;
use crate::bridge::WalletBridge;
use crate::config::{NetworkConfig, TxConfig};
use crate::errors::{WalletError, WalletResult};
use crate::transaction::{Memo, Operation, TimeBounds, Transaction, UnsignedEnvelope};
use crate::validation::InputValidator;

/// Raw form input for one submit action. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub source: String,
    pub destination: String,
    pub amount: String,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Outcome of an accepted payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub hash: String,
    pub explorer_url: String,
    pub destination: Address,
    pub amount: Amount,
    /// True when the payment funded a new account.
    pub created_account: bool,
}

/// Composes unsigned envelopes for one network
#[derive(Debug, Clone)]
pub struct PaymentBuilder {
    network: NetworkConfig,
    tx: TxConfig,
}

impl PaymentBuilder {
    pub fn new(network: NetworkConfig, tx: TxConfig) -> Self {
        Self { network, tx }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Look up the destination and compose the matching envelope.
    ///
    /// Returns the envelope and whether the destination had to be created.
    pub async fn build<G: LedgerGateway + ?Sized>(
        &self,
        gateway: &G,
        source: &AccountRecord,
        destination: &Address,
        amount: Amount,
        memo: Memo,
        now: u64,
    ) -> WalletResult<(UnsignedEnvelope, bool)> {
        let destination_exists = gateway.load_account(destination).await?.is_some();
        if !destination_exists {
            log::info!("Destination {} not found, creating account", destination);
        }
        let envelope = self.compose(source, destination, destination_exists, amount, memo, now)?;
        Ok((envelope, !destination_exists))
    }

    /// Pure composition once the destination's existence is known.
    pub fn compose(
        &self,
        source: &AccountRecord,
        destination: &Address,
        destination_exists: bool,
        amount: Amount,
        memo: Memo,
        now: u64,
    ) -> WalletResult<UnsignedEnvelope> {
        if amount.is_zero() {
            return Err(WalletError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let operation = if destination_exists {
            Operation::Payment {
                destination: destination.clone(),
                amount,
            }
        } else {
            Operation::CreateAccount {
                destination: destination.clone(),
                starting_balance: amount,
            }
        };
        let operations = vec![operation];

        let fee = u32::try_from(operations.len())
            .ok()
            .and_then(|count| self.tx.base_fee.checked_mul(count))
            .ok_or_else(|| WalletError::ValidationError("Fee overflow".to_string()))?;

        let max_time = now
            .checked_add(self.tx.timeout_secs)
            .ok_or_else(|| WalletError::ValidationError("Invalid time bounds".to_string()))?;

        let tx = Transaction {
            source: source.account_id.clone(),
            fee,
            sequence: source.next_sequence()?,
            time_bounds: Some(TimeBounds {
                min_time: 0,
                max_time,
            }),
            memo,
            operations,
        };

        Ok(UnsignedEnvelope::new(tx, self.network.network_id()))
    }
}

/// Runs one payment end to end: validate, build, sign, submit.
pub struct PaymentService<'a, B: ?Sized, G: ?Sized> {
    bridge: &'a B,
    gateway: &'a G,
    builder: &'a PaymentBuilder,
    validator: &'a InputValidator,
}

impl<'a, B, G> PaymentService<'a, B, G>
where
    B: WalletBridge + ?Sized,
    G: LedgerGateway + ?Sized,
{
    pub fn new(
        bridge: &'a B,
        gateway: &'a G,
        builder: &'a PaymentBuilder,
        validator: &'a InputValidator,
    ) -> Self {
        Self {
            bridge,
            gateway,
            builder,
            validator,
        }
    }

    /// Send a payment. Local validation failures never reach the network;
    /// the envelope is submitted at most once.
    pub async fn send(
        &self,
        intent: &PaymentIntent,
        available: Amount,
        now: u64,
    ) -> WalletResult<PaymentReceipt> {
        let validated = self.validator.validate_payment(intent, available)?;

        let source = self
            .gateway
            .load_account(&validated.source)
            .await?
            .ok_or_else(|| {
                WalletError::NotFound(format!(
                    "Source account {} is not funded",
                    validated.source
                ))
            })?;
        log::debug!("Loaded source {} at sequence {}", source.account_id, source.sequence);

        let (unsigned, created_account) = self
            .builder
            .build(
                self.gateway,
                &source,
                &validated.destination,
                validated.amount,
                validated.memo,
                now,
            )
            .await?;
        log::info!(
            "Built transaction {} (seq {})",
            unsigned.hash_hex(),
            unsigned.transaction().sequence
        );

        log::debug!("Requesting signature for {}", unsigned.hash_hex());
        let signed_xdr = self
            .bridge
            .sign(&unsigned, &self.builder.network().network_passphrase)
            .await?;
        let signed = unsigned.into_signed(&signed_xdr)?;

        let response = self.gateway.submit(&signed).await?;
        if response.hash != signed.hash_hex() {
            log::warn!(
                "Ledger reported hash {} for transaction {}",
                response.hash,
                signed.hash_hex()
            );
        }
        log::info!("Transaction {} accepted", response.hash);

        Ok(PaymentReceipt {
            explorer_url: self.builder.network().explorer_tx_url(&response.hash),
            hash: response.hash,
            destination: validated.destination,
            amount: validated.amount,
            created_account,
        })
    }
}
