mod common;

use common::{address, session, xlm, FakeExtension, FakeLedger};
use stellar_pay_lib::{
    ConnectionStatus, FileSessionStore, MemorySessionStore, SessionStore, WalletError,
    WalletSession,
};
use tempfile::TempDir;

#[tokio::test]
async fn connect_persists_address_and_loads_balance() {
    let extension = FakeExtension::new(1);
    let ledger = FakeLedger::new();
    let store = MemorySessionStore::new();
    ledger.fund(&extension.address(), xlm(250), 7);

    let session = session(&extension, &ledger, &store);
    let connected = session.connect().await.unwrap();

    assert_eq!(connected, extension.address());
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(snapshot.balance, xlm(250));
    assert!(!snapshot.is_loading);
    assert_eq!(snapshot.error, None);
    assert_eq!(store.load().unwrap(), Some(extension.address().to_string()));
}

#[tokio::test]
async fn connect_to_unfunded_account_shows_zero() {
    let extension = FakeExtension::new(1);
    let ledger = FakeLedger::new();
    let session = session(&extension, &ledger, &MemorySessionStore::new());

    session.connect().await.unwrap();
    assert!(session.snapshot().is_connected());
    assert!(session.balance().is_zero());
}

#[tokio::test]
async fn connect_without_extension_reports_not_installed() {
    let extension = FakeExtension::new(1);
    extension.uninstall();
    let store = MemorySessionStore::new();
    let session = session(&extension, &FakeLedger::new(), &store);

    let result = session.connect().await;

    assert_eq!(result, Err(WalletError::WalletNotInstalled));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert!(!snapshot.wallet_installed);
    assert!(snapshot.error.unwrap().contains("not installed"));
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn declined_access_stays_disconnected() {
    let extension = FakeExtension::new(1);
    extension.decline_access();
    let session = session(&extension, &FakeLedger::new(), &MemorySessionStore::new());

    let result = session.connect().await;

    assert!(matches!(result, Err(WalletError::WalletConnectionFailed(_))));
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert!(session.snapshot().error.is_some());
    assert_eq!(session.address(), None);
}

#[tokio::test]
async fn restore_is_optimistic_until_reconciled() {
    let extension = FakeExtension::new(1);
    extension.share();
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(40), 1);
    let store = MemorySessionStore::with_address(extension.address().to_string());
    let session = session(&extension, &ledger, &store);

    session.restore().await;
    assert_eq!(session.status(), ConnectionStatus::Restoring);
    assert!(session.snapshot().is_connected());
    assert_eq!(session.balance(), xlm(40));

    session.reconcile().await;
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(session.address(), Some(extension.address()));
    assert_eq!(session.balance(), xlm(40));
}

#[tokio::test]
async fn bridge_address_wins_over_persisted_one() {
    let extension = FakeExtension::new(2);
    extension.share();
    let ledger = FakeLedger::new();
    let stale = address(9);
    ledger.fund(&stale, xlm(1), 1);
    ledger.fund(&extension.address(), xlm(75), 1);
    let store = MemorySessionStore::with_address(stale.to_string());
    let session = session(&extension, &ledger, &store);

    let snapshot = session.initialize().await;

    assert_eq!(snapshot.status, ConnectionStatus::Connected);
    assert_eq!(snapshot.address, Some(extension.address().to_string()));
    assert_eq!(snapshot.balance, xlm(75));
    assert_eq!(store.load().unwrap(), Some(extension.address().to_string()));
}

#[tokio::test]
async fn revoked_access_closes_restored_session() {
    let extension = FakeExtension::new(3);
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(10), 1);
    let store = MemorySessionStore::with_address(extension.address().to_string());
    let session = session(&extension, &ledger, &store);

    let snapshot = session.initialize().await;

    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.address, None);
    assert!(snapshot.balance.is_zero());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn missing_extension_blocks_restore_but_keeps_storage() {
    let extension = FakeExtension::new(3);
    extension.uninstall();
    let store = MemorySessionStore::with_address(extension.address().to_string());
    let session = session(&extension, &FakeLedger::new(), &store);

    let snapshot = session.initialize().await;

    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert!(!snapshot.wallet_installed);
    assert_eq!(
        snapshot.error.as_deref(),
        Some(WalletError::WalletNotInstalled.user_message().as_str())
    );
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn fresh_visit_without_history_ends_disconnected() {
    let extension = FakeExtension::new(4);
    let ledger = FakeLedger::new();
    let session = session(&extension, &ledger, &MemorySessionStore::new());

    let snapshot = session.initialize().await;

    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert!(snapshot.wallet_installed);
    assert_eq!(snapshot.error, None);
    assert_eq!(ledger.load_calls(), 0);
}

#[tokio::test]
async fn garbage_in_storage_is_discarded() {
    let extension = FakeExtension::new(4);
    let store = MemorySessionStore::with_address("not-an-address");
    let session = session(&extension, &FakeLedger::new(), &store);

    session.initialize().await;

    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn disconnect_then_refresh_is_a_noop() {
    let extension = FakeExtension::new(5);
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(12), 1);
    let store = MemorySessionStore::new();
    let session = session(&extension, &ledger, &store);
    session.connect().await.unwrap();

    session.disconnect();
    let calls = ledger.load_calls();
    session.refresh_balance().await;

    assert_eq!(ledger.load_calls(), calls);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert!(snapshot.balance.is_zero());
    assert_eq!(snapshot.address, None);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn refresh_errors_keep_previous_balance() {
    let extension = FakeExtension::new(6);
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(30), 1);
    let session = session(&extension, &ledger, &MemorySessionStore::new());
    session.connect().await.unwrap();

    ledger.set_failing(true);
    session.refresh_balance().await;

    assert_eq!(session.balance(), xlm(30));
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(session.snapshot().error, None);

    ledger.set_failing(false);
    ledger.fund(&extension.address(), xlm(31), 1);
    session.refresh_balance().await;
    assert_eq!(session.balance(), xlm(31));
}

#[tokio::test]
async fn balance_landing_after_disconnect_is_dropped() {
    let extension = FakeExtension::new(8);
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(20), 1);
    let store = MemorySessionStore::new();
    let session = session(&extension, &ledger, &store);
    session.connect().await.unwrap();
    ledger.fund(&extension.address(), xlm(500), 1);

    let gate = ledger.hold_loads(&extension.address());
    let interrupt = async {
        tokio::task::yield_now().await;
        session.disconnect();
        gate.add_permits(1);
    };
    tokio::join!(session.refresh_balance(), interrupt);

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Disconnected);
    assert_eq!(snapshot.address, None);
    assert!(snapshot.balance.is_zero());
}

#[tokio::test]
async fn balance_for_replaced_account_is_dropped() {
    let extension = FakeExtension::new(9);
    extension.share();
    let ledger = FakeLedger::new();
    let previous = address(30);
    ledger.fund(&previous, xlm(900), 1);
    ledger.fund(&extension.address(), xlm(15), 1);
    let store = MemorySessionStore::with_address(previous.to_string());
    let session = session(&extension, &ledger, &store);

    let gate = ledger.hold_loads(&previous);
    let release = async {
        while session.status() != ConnectionStatus::Connected {
            tokio::task::yield_now().await;
        }
        gate.add_permits(1);
    };
    // The restored account's load resolves after the extension switched accounts.
    tokio::join!(session.restore(), session.reconcile(), release);

    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert_eq!(session.address(), Some(extension.address()));
    assert_eq!(session.balance(), xlm(15));
}

#[tokio::test]
async fn clones_share_state() {
    let extension = FakeExtension::new(7);
    let session = session(&extension, &FakeLedger::new(), &MemorySessionStore::new());
    let handle = session.clone();

    session.connect().await.unwrap();
    assert_eq!(handle.address(), Some(extension.address()));
}

#[tokio::test]
async fn persisted_file_session_survives_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("session.json");
    let extension = FakeExtension::new(8);
    let ledger = FakeLedger::new();
    ledger.fund(&extension.address(), xlm(5), 1);
    let config = common::test_config();

    let first = WalletSession::new(
        extension.clone(),
        ledger.clone(),
        FileSessionStore::new(&path),
        &config,
    )
    .unwrap();
    first.connect().await.unwrap();

    let second = WalletSession::new(
        extension.clone(),
        ledger.clone(),
        FileSessionStore::new(&path),
        &config,
    )
    .unwrap();
    second.restore().await;

    assert_eq!(second.address(), Some(extension.address()));
    assert_eq!(second.status(), ConnectionStatus::Restoring);
}
