//! JSON-RPC server for the reference ledger.
//!
//! Uses jsonrpsee 0.24. Binary payloads travel as hex, keys as base58.
//! Ledger errors carry their typed cause in the error object's `data` field
//! so [`RpcLedger`](crate::client::RpcLedger) can rebuild them.

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use bequest_core::error::LedgerError;
use bequest_core::instruction::{Receipt, SignedTransaction};
use bequest_core::store::AccountStore;
use bequest_core::traits::Ledger;
use bequest_core::types::Address;
use bequest_program::admin::PlatformAnalytics;

use crate::ledger::LocalLedger;

pub const RPC_MISC_ERROR: i32 = -1;
pub const RPC_INVALID_PARAMETER: i32 = -8;
pub const RPC_METHOD_DISABLED: i32 = -9;
pub const RPC_DESERIALIZATION_ERROR: i32 = -22;
pub const RPC_VERIFY_REJECTED: i32 = -26;
pub const RPC_VERIFY_ALREADY_IN_CHAIN: i32 = -27;

/// JSON representation of one ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountJson {
    /// Base58 address.
    pub address: String,
    /// Hex-encoded record bytes, empty for plain wallets and vaults.
    pub data: String,
    pub balance: u64,
}

pub fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    s.parse()
        .map_err(|e| rpc_error(RPC_INVALID_PARAMETER, &format!("invalid address: {e}")))
}

/// Parse a 16-character hex discriminator.
pub fn parse_discriminator(s: &str) -> Result<[u8; 8], ErrorObjectOwned> {
    let bytes = hex::decode(s).map_err(|_| rpc_error(RPC_INVALID_PARAMETER, "invalid hex in discriminator"))?;
    bytes
        .try_into()
        .map_err(|_| rpc_error(RPC_INVALID_PARAMETER, "discriminator must be 8 bytes"))
}

fn rpc_error(code: i32, msg: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Map a ledger error onto a JSON-RPC error, keeping the typed cause as data.
pub fn ledger_error(e: LedgerError) -> ErrorObjectOwned {
    let msg = e.to_string();
    match e {
        LedgerError::Rejected(p) => ErrorObjectOwned::owned(RPC_VERIFY_REJECTED, msg, Some(p)),
        LedgerError::InvalidTransaction(c) => ErrorObjectOwned::owned(RPC_DESERIALIZATION_ERROR, msg, Some(c)),
        LedgerError::DuplicateTransaction(_) => rpc_error(RPC_VERIFY_ALREADY_IN_CHAIN, &msg),
        LedgerError::Store(s) => ErrorObjectOwned::owned(RPC_MISC_ERROR, msg, Some(s)),
        LedgerError::Timeout | LedgerError::Unavailable(_) | LedgerError::Encoding(_) => rpc_error(RPC_MISC_ERROR, &msg),
    }
}

#[rpc(server)]
pub trait BequestRpc {
    /// Returns the account at a base58 address, or null.
    #[method(name = "getaccount")]
    async fn get_account(&self, address: String) -> Result<Option<AccountJson>, ErrorObjectOwned>;

    /// Returns the native balance held at an address.
    #[method(name = "getbalance")]
    async fn get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Returns every account whose record starts with the hex discriminator.
    #[method(name = "listaccounts")]
    async fn list_accounts(&self, discriminator: String) -> Result<Vec<AccountJson>, ErrorObjectOwned>;

    /// Returns the ledger clock in unix seconds.
    #[method(name = "gettime")]
    async fn get_time(&self) -> Result<i64, ErrorObjectOwned>;

    /// Executes a hex-encoded bincode signed transaction and returns its receipt.
    #[method(name = "sendtransaction")]
    async fn send_transaction(&self, hex_data: String) -> Result<Receipt, ErrorObjectOwned>;

    /// Credits an address out of thin air (development networks only).
    #[method(name = "airdrop")]
    async fn airdrop(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned>;

    /// Returns the platform analytics summary.
    #[method(name = "getanalytics")]
    async fn get_analytics(&self) -> Result<PlatformAnalytics, ErrorObjectOwned>;
}

pub struct RpcServerImpl<S: AccountStore> {
    ledger: Arc<LocalLedger<S>>,
    airdrop_enabled: bool,
}

impl<S: AccountStore> RpcServerImpl<S> {
    pub fn new(ledger: Arc<LocalLedger<S>>, airdrop_enabled: bool) -> Self {
        Self { ledger, airdrop_enabled }
    }
}

#[async_trait]
impl<S: AccountStore + 'static> BequestRpcServer for RpcServerImpl<S> {
    async fn get_account(&self, address: String) -> Result<Option<AccountJson>, ErrorObjectOwned> {
        let addr = parse_address(&address)?;
        let data = self.ledger.read_account(&addr).await.map_err(ledger_error)?;
        let balance = self.ledger.native_balance(&addr).await.map_err(ledger_error)?;
        if data.is_none() && balance == 0 {
            return Ok(None);
        }
        Ok(Some(AccountJson {
            address,
            data: hex::encode(data.unwrap_or_default()),
            balance,
        }))
    }

    async fn get_balance(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let addr = parse_address(&address)?;
        self.ledger.native_balance(&addr).await.map_err(ledger_error)
    }

    async fn list_accounts(&self, discriminator: String) -> Result<Vec<AccountJson>, ErrorObjectOwned> {
        let disc = parse_discriminator(&discriminator)?;
        let accounts = self.ledger.list_accounts(disc).await.map_err(ledger_error)?;
        let mut out = Vec::with_capacity(accounts.len());
        for (address, data) in accounts {
            let balance = self.ledger.native_balance(&address).await.map_err(ledger_error)?;
            out.push(AccountJson { address: address.to_string(), data: hex::encode(data), balance });
        }
        Ok(out)
    }

    async fn get_time(&self) -> Result<i64, ErrorObjectOwned> {
        Ok(self.ledger.now())
    }

    async fn send_transaction(&self, hex_data: String) -> Result<Receipt, ErrorObjectOwned> {
        let tx = SignedTransaction::from_hex(&hex_data)
            .map_err(|e| rpc_error(RPC_DESERIALIZATION_ERROR, &format!("invalid transaction: {e}")))?;
        self.ledger.execute(&tx).map_err(ledger_error)
    }

    async fn airdrop(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned> {
        if !self.airdrop_enabled {
            return Err(rpc_error(RPC_METHOD_DISABLED, "airdrop is disabled on this node"));
        }
        let addr = parse_address(&address)?;
        self.ledger.airdrop(&addr, amount).map_err(ledger_error)
    }

    async fn get_analytics(&self) -> Result<PlatformAnalytics, ErrorObjectOwned> {
        self.ledger.analytics().map_err(ledger_error)
    }
}

/// Start the JSON-RPC server on `addr`, returning the bound address and handle.
pub async fn start_rpc_server<S: AccountStore + 'static>(
    addr: &str,
    ledger: Arc<LocalLedger<S>>,
    airdrop_enabled: bool,
) -> Result<(SocketAddr, ServerHandle), LedgerError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| LedgerError::Unavailable(format!("RPC server error: {e}")))?;
    let local = server
        .local_addr()
        .map_err(|e| LedgerError::Unavailable(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(ledger, airdrop_enabled);
    let handle = server.start(rpc_impl.into_rpc());
    Ok((local, handle))
}
