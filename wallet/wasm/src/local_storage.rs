use stellar_pay_lib::storage::SESSION_ADDRESS_KEY;
use stellar_pay_lib::{SessionStore, WalletError, WalletResult};
use wasm_bindgen::JsValue;
use web_sys::Storage;

/// Session persistence in `window.localStorage`.
#[derive(Debug, Clone, Default)]
pub struct LocalStorageSessionStore;

impl LocalStorageSessionStore {
    pub fn new() -> Self {
        Self
    }

    fn storage(&self) -> WalletResult<Storage> {
        let window = web_sys::window()
            .ok_or_else(|| WalletError::StorageError("No window available".to_string()))?;
        window
            .local_storage()
            .map_err(storage_error)?
            .ok_or_else(|| WalletError::StorageError("localStorage is disabled".to_string()))
    }
}

impl SessionStore for LocalStorageSessionStore {
    fn load(&self) -> WalletResult<Option<String>> {
        self.storage()?
            .get_item(SESSION_ADDRESS_KEY)
            .map_err(storage_error)
    }

    fn save(&self, address: &str) -> WalletResult<()> {
        self.storage()?
            .set_item(SESSION_ADDRESS_KEY, address)
            .map_err(storage_error)
    }

    fn clear(&self) -> WalletResult<()> {
        self.storage()?
            .remove_item(SESSION_ADDRESS_KEY)
            .map_err(storage_error)
    }
}

fn storage_error(value: JsValue) -> WalletError {
    WalletError::StorageError(crate::freighter::js_error_message(&value))
}
