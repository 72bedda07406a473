use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::{Address, Amount};
use crate::blockchain_client::{fetch_balance, LedgerGateway};
use crate::bridge::WalletBridge;
use crate::config::{SessionConfig, WalletConfig};
use crate::errors::{WalletError, WalletResult};
use crate::payment::{PaymentBuilder, PaymentIntent, PaymentReceipt, PaymentService};
use crate::storage::SessionStore;
use crate::validation::InputValidator;

/// Connection lifecycle of a session.
///
/// `Restoring` is the optimistic phase entered from a persisted address; it
/// behaves as connected until [`WalletSession::reconcile`] confirms or
/// revokes it against the live extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Unchecked,
    Checking,
    Restoring,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionStatus::Restoring | ConnectionStatus::Connected)
    }
}

/// Read-only view handed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub address: Option<String>,
    pub balance: Amount,
    pub is_loading: bool,
    pub error: Option<String>,
    pub wallet_installed: bool,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }
}

#[derive(Debug)]
struct SessionState {
    status: ConnectionStatus,
    address: Option<Address>,
    balance: Amount,
    is_loading: bool,
    error: Option<String>,
    wallet_installed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Unchecked,
            address: None,
            balance: Amount::ZERO,
            is_loading: false,
            error: None,
            wallet_installed: false,
        }
    }
}

impl SessionState {
    fn reset(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.address = None;
        self.balance = Amount::ZERO;
        self.is_loading = false;
    }
}

/// Wallet connection, balance and payment actions for one user.
///
/// Clones share state. The lock is never held across an `.await`; each
/// action reads what it needs, awaits, then writes back. Overlapping
/// refreshes resolve last-writer-wins, and a result for an address that is
/// no longer current is dropped.
pub struct WalletSession<B, G, S> {
    state: Arc<RwLock<SessionState>>,
    bridge: Arc<B>,
    gateway: Arc<G>,
    store: Arc<S>,
    builder: Arc<PaymentBuilder>,
    validator: Arc<InputValidator>,
    config: SessionConfig,
}

impl<B, G, S> Clone for WalletSession<B, G, S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            bridge: Arc::clone(&self.bridge),
            gateway: Arc::clone(&self.gateway),
            store: Arc::clone(&self.store),
            builder: Arc::clone(&self.builder),
            validator: Arc::clone(&self.validator),
            config: self.config,
        }
    }
}

impl<B, G, S> WalletSession<B, G, S>
where
    B: WalletBridge,
    G: LedgerGateway,
    S: SessionStore,
{
    pub fn new(bridge: B, gateway: G, store: S, config: &WalletConfig) -> WalletResult<Self> {
        Ok(Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            bridge: Arc::new(bridge),
            gateway: Arc::new(gateway),
            store: Arc::new(store),
            builder: Arc::new(PaymentBuilder::new(config.network.clone(), config.tx)),
            validator: Arc::new(InputValidator::new()?),
            config: config.session,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            status: state.status,
            address: state.address.as_ref().map(|a| a.to_string()),
            balance: state.balance,
            is_loading: state.is_loading,
            error: state.error.clone(),
            wallet_installed: state.wallet_installed,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.read().status
    }

    pub fn address(&self) -> Option<Address> {
        self.state.read().address.clone()
    }

    pub fn balance(&self) -> Amount {
        self.state.read().balance
    }

    pub fn network(&self) -> &crate::config::NetworkConfig {
        self.builder.network()
    }

    /// Delay to wait after a confirmed payment before refreshing.
    pub fn post_payment_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.config.post_payment_refresh_ms)
    }

    /// Restore from storage, then reconcile with the extension.
    pub async fn initialize(&self) -> SessionSnapshot {
        self.restore().await;
        self.reconcile().await;
        self.snapshot()
    }

    /// Phase one: trust the persisted address and show its balance.
    pub async fn restore(&self) {
        self.state.write().status = ConnectionStatus::Checking;

        let persisted = match self.store.load() {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not read persisted session: {}", e);
                None
            }
        };

        let address = match persisted.as_deref().map(Address::from_string) {
            Some(Ok(address)) => address,
            Some(Err(e)) => {
                log::warn!("Discarding invalid persisted address: {}", e);
                if let Err(e) = self.store.clear() {
                    log::warn!("Could not clear persisted session: {}", e);
                }
                return;
            }
            None => return,
        };

        log::info!("Restoring session for {}", address);
        {
            let mut state = self.state.write();
            state.status = ConnectionStatus::Restoring;
            state.address = Some(address.clone());
        }
        self.update_balance(&address).await;
    }

    /// Phase two: the live extension decides the final state.
    pub async fn reconcile(&self) {
        let installed = self.bridge.is_available().await;
        self.state.write().wallet_installed = installed;

        if !installed {
            log::info!("Wallet extension not available");
            let mut state = self.state.write();
            if state.status != ConnectionStatus::Connected {
                state.reset();
            }
            state.error = Some(WalletError::WalletNotInstalled.user_message());
            return;
        }

        let live = match self.bridge.current_address().await {
            Ok(live) => live,
            Err(e) => {
                log::warn!("Could not query wallet connection: {}", e);
                let mut state = self.state.write();
                if state.status != ConnectionStatus::Connected {
                    state.reset();
                }
                return;
            }
        };

        match live {
            Some(live) => {
                let changed = {
                    let mut state = self.state.write();
                    let changed = state.address.as_ref() != Some(&live);
                    if changed {
                        log::info!("Wallet reports account {}", live);
                        state.address = Some(live.clone());
                        state.balance = Amount::ZERO;
                    }
                    state.status = ConnectionStatus::Connected;
                    changed
                };
                if changed {
                    self.persist(&live);
                    self.update_balance(&live).await;
                }
            }
            None => {
                log::info!("Wallet shares no account, session closed");
                self.state.write().reset();
                if let Err(e) = self.store.clear() {
                    log::warn!("Could not clear persisted session: {}", e);
                }
            }
        }
    }

    /// Ask the extension for access and start a session.
    pub async fn connect(&self) -> WalletResult<Address> {
        {
            let mut state = self.state.write();
            state.is_loading = true;
            state.error = None;
            if !state.status.is_connected() {
                state.status = ConnectionStatus::Checking;
            }
        }

        match self.request_address().await {
            Ok(address) => {
                self.persist(&address);
                {
                    let mut state = self.state.write();
                    if state.address.as_ref() != Some(&address) {
                        state.balance = Amount::ZERO;
                    }
                    state.status = ConnectionStatus::Connected;
                    state.address = Some(address.clone());
                    state.wallet_installed = true;
                }
                log::info!("Connected {}", address);
                self.update_balance(&address).await;
                self.state.write().is_loading = false;
                Ok(address)
            }
            Err(e) => {
                log::warn!("Wallet connection failed: {}", e);
                let mut state = self.state.write();
                if !state.status.is_connected() {
                    state.status = ConnectionStatus::Disconnected;
                }
                state.is_loading = false;
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    async fn request_address(&self) -> WalletResult<Address> {
        if !self.bridge.is_available().await {
            self.state.write().wallet_installed = false;
            return Err(WalletError::WalletNotInstalled);
        }
        self.bridge.request_access().await
    }

    /// Forget the account. No network call.
    pub fn disconnect(&self) {
        if let Err(e) = self.store.clear() {
            log::warn!("Could not clear persisted session: {}", e);
        }
        let mut state = self.state.write();
        state.reset();
        state.error = None;
        log::info!("Disconnected");
    }

    /// Re-read the balance; no-op without a connected account.
    pub async fn refresh_balance(&self) {
        let address = {
            let state = self.state.read();
            if !state.status.is_connected() {
                return;
            }
            state.address.clone()
        };
        if let Some(address) = address {
            self.update_balance(&address).await;
        }
    }

    /// Refresh once `delay` has passed.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn refresh_after(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
        self.refresh_balance().await;
    }

    /// Validate against the displayed balance, then build, sign and submit.
    pub async fn send_payment(
        &self,
        destination: &str,
        amount: &str,
        memo: Option<&str>,
    ) -> WalletResult<PaymentReceipt> {
        let (source, available) = {
            let mut state = self.state.write();
            let source = match (&state.address, state.status.is_connected()) {
                (Some(address), true) => address.clone(),
                _ => {
                    let error = WalletError::WalletConnectionFailed(
                        "Wallet not connected".to_string(),
                    );
                    state.error = Some(error.user_message());
                    return Err(error);
                }
            };
            state.is_loading = true;
            state.error = None;
            (source, state.balance)
        };

        let intent = PaymentIntent {
            source: source.to_string(),
            destination: destination.to_string(),
            amount: amount.to_string(),
            memo: memo.map(str::to_string),
        };
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);

        let service = PaymentService::new(
            self.bridge.as_ref(),
            self.gateway.as_ref(),
            self.builder.as_ref(),
            self.validator.as_ref(),
        );
        let result = service.send(&intent, available, now).await;

        let mut state = self.state.write();
        state.is_loading = false;
        match &result {
            Ok(receipt) => log::info!("Payment sent: {}", receipt.hash),
            Err(e) => {
                log::warn!("Payment failed: {}", e);
                state.error = Some(e.user_message());
            }
        }
        result
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    fn persist(&self, address: &Address) {
        if let Err(e) = self.store.save(address.as_str()) {
            log::warn!("Could not persist session: {}", e);
        }
    }

    /// Fetch and apply a balance; failures keep the previous value.
    async fn update_balance(&self, address: &Address) {
        match fetch_balance(self.gateway.as_ref(), address).await {
            Ok(balance) => {
                let mut state = self.state.write();
                if state.address.as_ref() == Some(address) {
                    state.balance = balance;
                } else {
                    log::debug!("Dropping balance for stale account {}", address);
                }
            }
            Err(e) => log::warn!("Balance refresh failed for {}: {}", address, e),
        }
    }
}
