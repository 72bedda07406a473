#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::json;
use tokio::sync::Semaphore;
use sha2::{Digest, Sha256};

use stellar_pay_lib::transaction::{DecoratedSignature, TransactionEnvelope};
use stellar_pay_lib::{
    AccountRecord, Address, Amount, BalanceLine, BridgeResponse, LedgerGateway, MemorySessionStore,
    NetworkKind, Operation, SignedEnvelope, SubmitResponse, UnsignedEnvelope, WalletBridge,
    WalletConfig, WalletError, WalletResult, WalletSession,
};

pub type TestSession = WalletSession<FakeExtension, FakeLedger, MemorySessionStore>;

pub fn test_config() -> WalletConfig {
    WalletConfig::for_network(NetworkKind::Testnet)
}

pub fn xlm(whole: i64) -> Amount {
    Amount::from_stroops(whole * Amount::STROOPS_PER_XLM).unwrap()
}

pub fn address(seed: u8) -> Address {
    Address::from_public_key([seed; 32])
}

#[derive(Default)]
struct LedgerInner {
    accounts: Mutex<HashMap<String, AccountRecord>>,
    submissions: Mutex<Vec<SignedEnvelope>>,
    load_calls: AtomicUsize,
    fail_loads: AtomicBool,
    submit_error: Mutex<Option<WalletError>>,
    load_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// In-memory ledger that verifies signatures and applies native payments.
#[derive(Clone, Default)]
pub struct FakeLedger {
    inner: Arc<LedgerInner>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, account: &Address, balance: Amount, sequence: i64) {
        self.inner.accounts.lock().unwrap().insert(
            account.to_string(),
            AccountRecord {
                account_id: account.clone(),
                sequence,
                balances: vec![BalanceLine {
                    asset_type: "native".to_string(),
                    asset_code: None,
                    balance,
                }],
            },
        );
    }

    pub fn account(&self, account: &Address) -> Option<AccountRecord> {
        self.inner
            .accounts
            .lock()
            .unwrap()
            .get(account.as_str())
            .cloned()
    }

    pub fn balance(&self, account: &Address) -> Option<Amount> {
        self.account(account).map(|record| record.native_balance())
    }

    pub fn submissions(&self) -> Vec<SignedEnvelope> {
        self.inner.submissions.lock().unwrap().clone()
    }

    pub fn load_calls(&self) -> usize {
        self.inner.load_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.fail_loads.store(failing, Ordering::SeqCst);
    }

    /// Park later loads of `account` until a permit is added to the
    /// returned semaphore. Other accounts load normally.
    pub fn hold_loads(&self, account: &Address) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.inner
            .load_gates
            .lock()
            .unwrap()
            .insert(account.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn fail_next_submit(&self, error: WalletError) {
        *self.inner.submit_error.lock().unwrap() = Some(error);
    }

    fn apply(&self, envelope: &SignedEnvelope) -> WalletResult<()> {
        let tx = &envelope.envelope().tx;
        let network_id = NetworkKind::Testnet.config().network_id();
        let hash = tx.hash(&network_id);

        let key = VerifyingKey::from_bytes(tx.source.public_key())
            .map_err(|_| WalletError::NetworkSubmitFailed("tx_bad_auth".to_string()))?;
        let verified = envelope.envelope().signatures.iter().any(|decorated| {
            Signature::from_slice(&decorated.signature)
                .map(|signature| key.verify(&hash, &signature).is_ok())
                .unwrap_or(false)
        });
        if !verified {
            return Err(WalletError::NetworkSubmitFailed("tx_bad_auth".to_string()));
        }

        let mut accounts = self.inner.accounts.lock().unwrap();
        let source = accounts
            .get_mut(tx.source.as_str())
            .ok_or_else(|| WalletError::NetworkSubmitFailed("tx_no_source_account".to_string()))?;
        if tx.sequence != source.sequence + 1 {
            return Err(WalletError::NetworkSubmitFailed("tx_bad_seq".to_string()));
        }
        source.sequence = tx.sequence;

        let total: i64 = tx.operations.iter().map(|op| op.amount().stroops()).sum();
        let debit = total + i64::from(tx.fee);
        let line = &mut source.balances[0];
        line.balance = line
            .balance
            .checked_sub(&Amount::from_stroops(debit).unwrap())
            .map_err(|_| WalletError::NetworkSubmitFailed("op_underfunded".to_string()))?;

        for operation in &tx.operations {
            match operation {
                Operation::Payment {
                    destination,
                    amount,
                } => {
                    let record = accounts.get_mut(destination.as_str()).ok_or_else(|| {
                        WalletError::NetworkSubmitFailed("op_no_destination".to_string())
                    })?;
                    let line = &mut record.balances[0];
                    line.balance = line.balance.checked_add(amount).unwrap();
                }
                Operation::CreateAccount {
                    destination,
                    starting_balance,
                } => {
                    accounts.insert(
                        destination.to_string(),
                        AccountRecord {
                            account_id: destination.clone(),
                            sequence: 0,
                            balances: vec![BalanceLine {
                                asset_type: "native".to_string(),
                                asset_code: None,
                                balance: *starting_balance,
                            }],
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl LedgerGateway for FakeLedger {
    async fn load_account(&self, address: &Address) -> WalletResult<Option<AccountRecord>> {
        self.inner.load_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .inner
            .load_gates
            .lock()
            .unwrap()
            .get(address.as_str())
            .cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(WalletError::NetworkError("HTTP 503: Service Unavailable".to_string()));
        }
        Ok(self.account(address))
    }

    async fn submit(&self, envelope: &SignedEnvelope) -> WalletResult<SubmitResponse> {
        self.inner.submissions.lock().unwrap().push(envelope.clone());
        if let Some(error) = self.inner.submit_error.lock().unwrap().take() {
            return Err(error);
        }
        self.apply(envelope)?;
        Ok(SubmitResponse {
            hash: envelope.hash_hex(),
            ledger: Some(1),
        })
    }
}

struct ExtensionInner {
    key: SigningKey,
    installed: AtomicBool,
    shared: AtomicBool,
    decline_access: AtomicBool,
    decline_signing: AtomicBool,
    sign_calls: AtomicUsize,
}

/// Stand-in for the browser extension; holds the only key.
#[derive(Clone)]
pub struct FakeExtension {
    inner: Arc<ExtensionInner>,
}

impl FakeExtension {
    pub fn new(seed: u8) -> Self {
        Self::with_key(SigningKey::from_bytes(&[seed; 32]))
    }

    pub fn random() -> Self {
        Self::with_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    fn with_key(key: SigningKey) -> Self {
        Self {
            inner: Arc::new(ExtensionInner {
                key,
                installed: AtomicBool::new(true),
                shared: AtomicBool::new(false),
                decline_access: AtomicBool::new(false),
                decline_signing: AtomicBool::new(false),
                sign_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self.inner.key.verifying_key().to_bytes())
    }

    pub fn uninstall(&self) {
        self.inner.installed.store(false, Ordering::SeqCst);
    }

    /// User already granted access in an earlier visit.
    pub fn share(&self) {
        self.inner.shared.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        self.inner.shared.store(false, Ordering::SeqCst);
    }

    pub fn decline_access(&self) {
        self.inner.decline_access.store(true, Ordering::SeqCst);
    }

    pub fn decline_signing(&self) {
        self.inner.decline_signing.store(true, Ordering::SeqCst);
    }

    pub fn sign_calls(&self) -> usize {
        self.inner.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl WalletBridge for FakeExtension {
    async fn is_available(&self) -> bool {
        self.inner.installed.load(Ordering::SeqCst)
    }

    async fn request_access(&self) -> WalletResult<Address> {
        let reply = if self.inner.decline_access.load(Ordering::SeqCst) {
            json!({ "error": "User declined access" })
        } else {
            self.share();
            json!({ "address": self.address().to_string() })
        };
        BridgeResponse::from_access(reply).into_access_address()
    }

    async fn current_address(&self) -> WalletResult<Option<Address>> {
        let reply = if self.inner.shared.load(Ordering::SeqCst) {
            json!({ "address": self.address().to_string() })
        } else {
            json!({ "address": "" })
        };
        BridgeResponse::from_access(reply).into_current_address()
    }

    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network_passphrase: &str,
    ) -> WalletResult<String> {
        self.inner.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.decline_signing.load(Ordering::SeqCst) {
            return BridgeResponse::from_sign(json!({ "error": "User declined to sign" }))
                .into_signed_xdr();
        }

        let mut network_id = [0u8; 32];
        network_id.copy_from_slice(&Sha256::digest(network_passphrase.as_bytes()));
        let tx = envelope.transaction().clone();
        let signature = self.inner.key.sign(&tx.hash(&network_id));
        let signed = TransactionEnvelope {
            signatures: vec![DecoratedSignature {
                hint: self.address().signature_hint(),
                signature: signature.to_bytes().to_vec(),
            }],
            tx,
        };
        BridgeResponse::from_sign(json!({ "signedTxXdr": signed.to_xdr_base64() }))
            .into_signed_xdr()
    }
}

pub fn session(extension: &FakeExtension, ledger: &FakeLedger, store: &MemorySessionStore) -> TestSession {
    WalletSession::new(extension.clone(), ledger.clone(), store.clone(), &test_config()).unwrap()
}
