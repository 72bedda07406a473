//! Freighter extension bridge.
//!
//! Calls go through `@stellar/freighter-api`. Every reply is converted to
//! JSON and normalized by [`BridgeResponse`]; thrown exceptions are folded
//! the same way through their message.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use stellar_pay_lib::{Address, BridgeResponse, UnsignedEnvelope, WalletBridge, WalletResult};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen(module = "@stellar/freighter-api")]
extern "C" {
    #[wasm_bindgen(catch, js_name = isConnected)]
    async fn freighter_is_connected() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = requestAccess)]
    async fn freighter_request_access() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = getAddress)]
    async fn freighter_get_address() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_name = signTransaction)]
    async fn freighter_sign_transaction(xdr: &str, opts: JsValue) -> Result<JsValue, JsValue>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignOptions<'a> {
    network_passphrase: &'a str,
}

/// Wallet bridge backed by the Freighter browser extension.
#[derive(Debug, Clone, Default)]
pub struct FreighterBridge;

impl FreighterBridge {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl WalletBridge for FreighterBridge {
    async fn is_available(&self) -> bool {
        match freighter_is_connected().await {
            Ok(reply) => BridgeResponse::from_access(to_json(reply)).is_connected(),
            Err(error) => {
                log::debug!("Freighter probe failed: {}", js_error_message(&error));
                false
            }
        }
    }

    async fn request_access(&self) -> WalletResult<Address> {
        let response = match freighter_request_access().await {
            Ok(reply) => BridgeResponse::from_access(to_json(reply)),
            Err(error) => BridgeResponse::from_error_message(js_error_message(&error)),
        };
        response.into_access_address()
    }

    async fn current_address(&self) -> WalletResult<Option<Address>> {
        let response = match freighter_get_address().await {
            Ok(reply) => BridgeResponse::from_access(to_json(reply)),
            Err(error) => BridgeResponse::from_error_message(js_error_message(&error)),
        };
        response.into_current_address()
    }

    async fn sign(
        &self,
        envelope: &UnsignedEnvelope,
        network_passphrase: &str,
    ) -> WalletResult<String> {
        let options = serde_wasm_bindgen::to_value(&SignOptions { network_passphrase })
            .unwrap_or(JsValue::UNDEFINED);
        let xdr = envelope.to_xdr_base64();

        let response = match freighter_sign_transaction(&xdr, options).await {
            Ok(reply) => BridgeResponse::from_sign(to_json(reply)),
            Err(error) => BridgeResponse::from_error_message(js_error_message(&error)),
        };
        response.into_signed_xdr()
    }
}

fn to_json(value: JsValue) -> Value {
    if value.is_undefined() || value.is_null() {
        return Value::Null;
    }
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

/// Best-effort text of a thrown JS value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Some(text) = value.as_string() {
        return text;
    }
    "Unknown wallet error".to_string()
}
