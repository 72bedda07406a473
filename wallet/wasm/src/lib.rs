//! Stellar Pay WebAssembly Library
//!
//! Browser entry points for the payment client: the Freighter bridge, the
//! `localStorage` session store and the display helpers used by the UI.

use serde::Serialize;
use std::time::Duration;
use stellar_pay_lib::{
    Amount, CountUp, HorizonClient, NetworkKind, WalletConfig, WalletError, WalletSession,
};
use wasm_bindgen::prelude::*;

mod freighter;
mod local_storage;
mod logger;

pub use freighter::FreighterBridge;
pub use local_storage::LocalStorageSessionStore;

type BrowserSession = WalletSession<FreighterBridge, HorizonClient, LocalStorageSessionStore>;

// Module initialization
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init(log::LevelFilter::Info);
    log::info!("Stellar Pay WASM module loaded");
}

/// Raise or lower console verbosity ("error" through "trace").
#[wasm_bindgen(js_name = setLogLevel)]
pub fn set_log_level(level: &str) {
    let filter = level.parse().unwrap_or(log::LevelFilter::Info);
    logger::init(filter);
}

/// Wallet session exposed to the page.
#[wasm_bindgen]
pub struct WasmWallet {
    session: BrowserSession,
}

#[wasm_bindgen]
impl WasmWallet {
    /// `network` is "testnet" or "public"; omitted means the build default.
    #[wasm_bindgen(constructor)]
    pub fn new(network: Option<String>) -> Result<WasmWallet, JsValue> {
        let kind = network
            .as_deref()
            .map(NetworkKind::parse)
            .unwrap_or_else(NetworkKind::build_default);
        let config = WalletConfig::for_network(kind);

        let gateway = HorizonClient::new(config.network.horizon_url.clone()).map_err(to_js_error)?;
        let session = WalletSession::new(
            FreighterBridge::new(),
            gateway,
            LocalStorageSessionStore::new(),
            &config,
        )
        .map_err(to_js_error)?;

        Ok(WasmWallet { session })
    }

    /// Restore the persisted session and reconcile it with Freighter.
    pub async fn initialize(&self) -> Result<JsValue, JsValue> {
        let snapshot = self.session.initialize().await;
        to_js(&snapshot)
    }

    pub async fn connect(&self) -> Result<JsValue, JsValue> {
        self.session.connect().await.map_err(to_js_error)?;
        to_js(&self.session.snapshot())
    }

    pub fn disconnect(&self) -> Result<JsValue, JsValue> {
        self.session.disconnect();
        to_js(&self.session.snapshot())
    }

    #[wasm_bindgen(js_name = refreshBalance)]
    pub async fn refresh_balance(&self) -> Result<JsValue, JsValue> {
        self.session.refresh_balance().await;
        to_js(&self.session.snapshot())
    }

    /// Resolves with the receipt; rejects with an `Error` whose `name` is
    /// the error code and whose message is ready to show.
    #[wasm_bindgen(js_name = sendPayment)]
    pub async fn send_payment(
        &self,
        destination: String,
        amount: String,
        memo: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let receipt = self
            .session
            .send_payment(&destination, &amount, memo.as_deref())
            .await
            .map_err(to_js_error)?;
        to_js(&receipt)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.snapshot())
    }

    #[wasm_bindgen(js_name = clearError)]
    pub fn clear_error(&self) {
        self.session.clear_error();
    }

    pub fn network(&self) -> Result<JsValue, JsValue> {
        to_js(self.session.network())
    }

    /// Milliseconds to wait before calling `refreshBalance` after a payment.
    #[wasm_bindgen(js_name = postPaymentRefreshMs)]
    pub fn post_payment_refresh_ms(&self) -> f64 {
        self.session.post_payment_refresh_delay().as_millis() as f64
    }
}

#[wasm_bindgen(js_name = formatXlm)]
pub fn format_xlm(balance: &str) -> String {
    stellar_pay_lib::format_xlm(balance)
}

#[wasm_bindgen(js_name = isValidAddress)]
pub fn is_valid_address(address: &str) -> bool {
    stellar_pay_lib::is_valid_address(address)
}

#[wasm_bindgen(js_name = shortenAddress)]
pub fn shorten_address(address: &str, chars: Option<usize>) -> String {
    stellar_pay_lib::shorten_address(address, chars.unwrap_or(4))
}

/// Balance minus the 1 XLM reserve; unparsable input gives "0.0000000".
#[wasm_bindgen(js_name = maxSendable)]
pub fn max_sendable(balance: &str) -> String {
    Amount::from_string(balance)
        .map(stellar_pay_lib::max_sendable)
        .unwrap_or(Amount::ZERO)
        .to_string()
}

/// Count-up value `elapsed_ms` into an animation from `start` to `end`.
#[wasm_bindgen(js_name = countUpValue)]
pub fn count_up_value(start: f64, end: f64, duration_ms: f64, elapsed_ms: f64) -> f64 {
    CountUp::new(start, end, millis(duration_ms)).value_at(millis(elapsed_ms))
}

fn millis(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value / 1000.0)
    } else {
        Duration::ZERO
    }
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js_error(error: WalletError) -> JsValue {
    let js_error = js_sys::Error::new(&error.user_message());
    js_error.set_name(error.code());
    js_error.into()
}
