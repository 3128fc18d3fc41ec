//! Keeper against a RocksDB-backed node over JSON-RPC.

use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::server::ServerHandle;

use bequest_core::address::custodial_address;
use bequest_core::crypto::KeyPair;
use bequest_core::instruction::{AccountTarget, Instruction, Transaction};
use bequest_core::traits::{Ledger, ManualClock};
use bequest_core::types::Address;
use bequest_keeper::{Keeper, KeeperConfig, KeeperOutcome};
use bequest_ledger::{start_rpc_server, LocalLedger, RocksStore, RpcLedger};
use bequest_tests::helpers::*;

struct Node {
    ledger: Arc<LocalLedger<RocksStore>>,
    clock: Arc<ManualClock>,
    url: String,
    nonce: u64,
    _handle: ServerHandle,
    _dir: tempfile::TempDir,
}

impl Node {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("accounts")).unwrap();
        let clock = Arc::new(ManualClock::new(GENESIS));
        let ledger = Arc::new(LocalLedger::new(store, clock.clone()));
        let (addr, handle) = start_rpc_server("127.0.0.1:0", ledger.clone(), false).await.unwrap();
        Self {
            ledger,
            clock,
            url: format!("http://{addr}"),
            nonce: 0,
            _handle: handle,
            _dir: dir,
        }
    }

    fn submit(&mut self, kp: &KeyPair, ix: Instruction) {
        self.nonce += 1;
        let tx = Transaction::new(ix, kp.identity(), self.nonce).sign(kp).unwrap();
        self.ledger.execute(&tx).unwrap();
    }

    fn account(&mut self, seed: u8, amount: u64, period: i64) -> Address {
        let owner = keypair(seed);
        self.ledger.airdrop(&owner.identity().wallet(), amount).unwrap();
        self.submit(&owner, Instruction::CreateUserProfile { is_premium: true });
        self.submit(
            &owner,
            Instruction::CreateCustodialAccount { heirs: vec![share(seed + 100, 100)], inactivity_period_seconds: period },
        );
        self.submit(&owner, Instruction::Deposit { target: AccountTarget::Custodial, amount });
        custodial_address(&owner.identity())
    }

    fn keeper(&self, seed: u8, config: KeeperConfig) -> Keeper<RpcLedger> {
        let client = RpcLedger::connect(&self.url, Duration::from_secs(5)).unwrap();
        Keeper::new(Arc::new(client), keypair(seed), config).unwrap()
    }
}

#[tokio::test]
async fn keeper_cycle_over_rpc() {
    let mut node = Node::start().await;
    node.submit(&keypair(1), Instruction::Initialize);
    let due = node.account(2, 50_000, 100);
    let later = node.account(3, 50_000, 1_000);
    node.clock.advance(101);

    let keeper = node.keeper(9, fast_keeper_config());
    let eligible = keeper.list_eligible_accounts(GENESIS + 101).await.unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].address, due);

    let report = keeper.run_once().await.unwrap();
    assert_eq!((report.scanned, report.eligible, report.executed), (2, 1, 1));
    assert_eq!(report.distributed, 50_000);

    let client = RpcLedger::connect(&node.url, Duration::from_secs(5)).unwrap();
    assert_eq!(client.native_balance(&identity(102).wallet()).await.unwrap(), 49_750);
    assert_eq!(client.native_balance(&identity(103).wallet()).await.unwrap(), 0);

    assert_eq!(keeper.execute_inheritance(due).await, KeeperOutcome::AlreadyExecuted);
    assert!(matches!(keeper.execute_inheritance(later).await, KeeperOutcome::NotYetInactive { .. }));
}

#[tokio::test]
async fn sharded_keepers_split_the_work() {
    let mut node = Node::start().await;
    node.submit(&keypair(1), Instruction::Initialize);
    let accounts: Vec<_> = (2..12u8).map(|seed| node.account(seed, 1_000, 10)).collect();
    node.clock.advance(11);

    let mut executed = 0;
    for shard_index in 0..3 {
        let config = KeeperConfig { shard_index, shard_count: 3, ..fast_keeper_config() };
        let report = node.keeper(9, config).run_once().await.unwrap();
        assert_eq!(report.executed, report.eligible);
        assert_eq!(report.scanned, accounts.len());
        executed += report.executed;
    }
    assert_eq!(executed, accounts.len());
    assert_eq!(node.ledger.analytics().unwrap().total_inheritances_executed, accounts.len() as u64);
}

#[tokio::test]
async fn unreachable_node_aborts_the_cycle() {
    let config = KeeperConfig { attempt_timeout_ms: 500, ..fast_keeper_config() };
    let client = RpcLedger::connect("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
    let keeper = Keeper::new(Arc::new(client), keypair(9), config).unwrap();
    let err = keeper.run_once().await.unwrap_err();
    assert!(err.is_transient());
}
