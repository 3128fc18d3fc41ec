//! End-to-end tests of the JSON-RPC server through the `RpcLedger` client.

use std::sync::Arc;
use std::time::Duration;

use bequest_core::accounts::{CustodialAccount, Record};
use bequest_core::address::custodial_address;
use bequest_core::crypto::KeyPair;
use bequest_core::error::{LedgerError, ProgramError};
use bequest_core::instruction::{AccountTarget, Instruction, SignedTransaction, Transaction};
use bequest_core::traits::{Ledger, ManualClock};
use bequest_core::types::{HeirShare, Identity, Percentage};
use bequest_ledger::{start_rpc_server, LocalLedger, RocksStore, RpcLedger};

fn signed(kp: &KeyPair, ix: Instruction, nonce: u64) -> SignedTransaction {
    Transaction::new(ix, kp.identity(), nonce).sign(kp).unwrap()
}

struct Harness {
    client: RpcLedger,
    clock: Arc<ManualClock>,
    _handle: jsonrpsee::server::ServerHandle,
    _dir: tempfile::TempDir,
}

async fn harness(airdrop: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = RocksStore::open(dir.path().join("accounts")).unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let ledger = Arc::new(LocalLedger::new(store, clock.clone()));
    let (addr, handle) = start_rpc_server("127.0.0.1:0", ledger, airdrop).await.unwrap();
    let client = RpcLedger::connect(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    Harness { client, clock, _handle: handle, _dir: dir }
}

#[tokio::test]
async fn lifecycle_over_rpc() {
    let h = harness(true).await;
    let admin = KeyPair::from_secret_bytes([1u8; 32]);
    let owner = KeyPair::from_secret_bytes([2u8; 32]);
    let heir = Identity([3u8; 32]);

    assert_eq!(h.client.unix_timestamp().await.unwrap(), 1_000);
    assert_eq!(h.client.airdrop(&owner.identity().wallet(), 10_000).await.unwrap(), 10_000);

    h.client.submit_and_confirm(&signed(&admin, Instruction::Initialize, 0)).await.unwrap();
    h.client
        .submit_and_confirm(&signed(&owner, Instruction::CreateUserProfile { is_premium: true }, 0))
        .await
        .unwrap();
    h.client
        .submit_and_confirm(&signed(
            &owner,
            Instruction::CreateCustodialAccount {
                heirs: vec![HeirShare::new(heir, Percentage::FULL)],
                inactivity_period_seconds: 60,
            },
            1,
        ))
        .await
        .unwrap();
    h.client
        .submit_and_confirm(&signed(
            &owner,
            Instruction::Deposit { target: AccountTarget::Custodial, amount: 10_000 },
            2,
        ))
        .await
        .unwrap();

    let listed = h.client.list_accounts(CustodialAccount::DISCRIMINATOR).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, custodial_address(&owner.identity()));
    let record = CustodialAccount::from_bytes(&listed[0].1).unwrap();
    assert_eq!(h.client.native_balance(&record.vault_address()).await.unwrap(), 10_000);

    let keeper = KeyPair::from_secret_bytes([9u8; 32]);
    let execute = Instruction::ExecuteInheritance { account: listed[0].0 };
    let err = h.client.submit_and_confirm(&signed(&keeper, execute.clone(), 0)).await.unwrap_err();
    assert_eq!(err, LedgerError::Rejected(ProgramError::NotYetInactive { inactive_at: 1_061 }));

    h.clock.advance(61);
    let receipt = h.client.submit_and_confirm(&signed(&keeper, execute.clone(), 1)).await.unwrap();
    assert_eq!(receipt.total_to(&heir.wallet()), 9_950);

    let err = h.client.submit_and_confirm(&signed(&keeper, execute, 2)).await.unwrap_err();
    assert_eq!(err, LedgerError::Rejected(ProgramError::AlreadyExecuted));

    let analytics = h.client.analytics().await.unwrap();
    assert_eq!(analytics.total_inheritances_executed, 1);
    assert_eq!(analytics.treasury_balance, 50);
}

#[tokio::test]
async fn duplicate_submission_detected() {
    let h = harness(false).await;
    let admin = KeyPair::from_secret_bytes([1u8; 32]);
    let tx = signed(&admin, Instruction::Initialize, 0);
    h.client.submit_and_confirm(&tx).await.unwrap();
    assert!(matches!(
        h.client.submit_and_confirm(&tx).await,
        Err(LedgerError::DuplicateTransaction(_))
    ));
}

#[tokio::test]
async fn airdrop_disabled_by_default() {
    let h = harness(false).await;
    let err = h.client.airdrop(&Identity([5u8; 32]).wallet(), 1).await.unwrap_err();
    assert!(err.is_transient() || matches!(err, LedgerError::Unavailable(_)));
}

#[tokio::test]
async fn missing_account_reads_none() {
    let h = harness(false).await;
    assert_eq!(h.client.read_account(&Identity([5u8; 32]).wallet()).await.unwrap(), None);
    assert_eq!(h.client.native_balance(&Identity([5u8; 32]).wallet()).await.unwrap(), 0);
}

#[tokio::test]
async fn unreachable_node_is_transient() {
    let client = RpcLedger::connect("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let err = client.unix_timestamp().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
}
