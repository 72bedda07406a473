pub mod paths;
pub mod session_store;

pub use paths::WalletPaths;
pub use session_store::{
    FileSessionStore, MemorySessionStore, SessionStore, SESSION_ADDRESS_KEY,
};
