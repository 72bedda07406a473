use crate::blockchain::{Address, Amount, ADDRESS_LEN};
use crate::errors::{WalletError, WalletResult};
use crate::payment::PaymentIntent;
use crate::transaction::{Memo, MAX_MEMO_TEXT_BYTES};
use regex::Regex;

/// Longest raw input accepted before any parsing.
const MAX_INPUT_LEN: usize = 256;

/// A payment that passed every local check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub source: Address,
    pub destination: Address,
    pub amount: Amount,
    pub memo: Memo,
}

/// Input validation for the payment form
pub struct InputValidator {
    // Compiled once, reused for every submission
    address_pattern: Regex,
    amount_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> WalletResult<Self> {
        let address_pattern = Regex::new(r"^G[A-Z2-7]{55}$")
            .map_err(|e| WalletError::ValidationError(format!("Invalid address regex: {}", e)))?;

        let amount_pattern = Regex::new(r"^\d+(\.\d{1,7})?$")
            .map_err(|e| WalletError::ValidationError(format!("Invalid amount regex: {}", e)))?;

        Ok(InputValidator {
            address_pattern,
            amount_pattern,
        })
    }

    /// Validate an account address and decode it
    pub fn validate_address(&self, address: &str) -> WalletResult<Address> {
        self.check_length(address)?;

        if address.is_empty() {
            return Err(WalletError::InvalidAddress(
                "Address cannot be empty".to_string(),
            ));
        }

        if address.len() != ADDRESS_LEN || !self.address_pattern.is_match(address) {
            return Err(WalletError::InvalidAddress(
                "Address format is invalid".to_string(),
            ));
        }

        // Checksum and version byte
        Address::from_string(address)
    }

    /// Validate a decimal amount string; must be strictly positive
    pub fn validate_amount(&self, amount: &str) -> WalletResult<Amount> {
        self.check_length(amount)?;

        if amount.is_empty() {
            return Err(WalletError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        if !self.amount_pattern.is_match(amount) {
            return Err(WalletError::InvalidAmount(
                "Please enter a valid amount".to_string(),
            ));
        }

        let parsed = Amount::from_string(amount)?;
        if parsed.is_zero() {
            return Err(WalletError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        Ok(parsed)
    }

    /// Validate an optional memo. Blank input means no memo.
    pub fn validate_memo(&self, memo: Option<&str>) -> WalletResult<Memo> {
        match memo {
            None => Ok(Memo::None),
            Some(text) if text.is_empty() => Ok(Memo::None),
            Some(text) if text.len() > MAX_MEMO_TEXT_BYTES => Err(WalletError::InvalidMemo(
                format!("Memo must be at most {} bytes", MAX_MEMO_TEXT_BYTES),
            )),
            Some(text) => Memo::text(text),
        }
    }

    /// Run every local check on a payment intent against the balance the
    /// user currently sees.
    ///
    /// Checks run in a fixed order so the first failing rule is reported:
    /// required fields, destination format, self-payment, amount, memo and
    /// finally the balance.
    pub fn validate_payment(
        &self,
        intent: &PaymentIntent,
        available: Amount,
    ) -> WalletResult<ValidatedPayment> {
        if intent.destination.trim().is_empty() || intent.amount.trim().is_empty() {
            return Err(WalletError::ValidationError(
                "Please fill in all required fields".to_string(),
            ));
        }

        let destination = self.validate_address(intent.destination.trim())?;
        let source = Address::from_string(&intent.source).map_err(|_| {
            WalletError::WalletConnectionFailed("Connected account is invalid".to_string())
        })?;

        if destination == source {
            return Err(WalletError::SameAccount);
        }

        let amount = self.validate_amount(intent.amount.trim())?;
        let memo = self.validate_memo(intent.memo.as_deref())?;

        if amount > available {
            return Err(WalletError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        Ok(ValidatedPayment {
            source,
            destination,
            amount,
            memo,
        })
    }

    fn check_length(&self, input: &str) -> WalletResult<()> {
        if input.len() > MAX_INPUT_LEN {
            return Err(WalletError::ValidationError("Input too long".to_string()));
        }
        Ok(())
    }
}
