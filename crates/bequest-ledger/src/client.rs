//! [`Ledger`] implementation over the JSON-RPC interface.

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::core::ClientError;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::types::ErrorObjectOwned;
use serde::de::DeserializeOwned;
use serde::Serialize;

use bequest_core::error::{CryptoError, LedgerError, ProgramError, StoreError};
use bequest_core::instruction::{Receipt, SignedTransaction};
use bequest_core::traits::Ledger;
use bequest_core::types::Address;
use bequest_program::admin::PlatformAnalytics;

use crate::rpc::{
    AccountJson, RPC_DESERIALIZATION_ERROR, RPC_MISC_ERROR, RPC_VERIFY_ALREADY_IN_CHAIN, RPC_VERIFY_REJECTED,
};

pub struct RpcLedger {
    client: HttpClient,
}

impl RpcLedger {
    /// Connect to `url` with a per-request timeout.
    pub fn connect(url: &str, request_timeout: Duration) -> Result<Self, LedgerError> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url)
            .map_err(|e| LedgerError::Unavailable(format!("failed to build RPC client: {e}")))?;
        Ok(Self { client })
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: ArrayParams) -> Result<R, LedgerError> {
        self.client.request(method, params).await.map_err(client_error)
    }

    pub async fn airdrop(&self, address: &Address, amount: u64) -> Result<u64, LedgerError> {
        self.call("airdrop", params(&[&address.to_string()], Some(amount))?).await
    }

    pub async fn analytics(&self) -> Result<PlatformAnalytics, LedgerError> {
        self.call("getanalytics", ArrayParams::new()).await
    }
}

fn params(strings: &[&str], amount: Option<u64>) -> Result<ArrayParams, LedgerError> {
    let mut p = ArrayParams::new();
    for s in strings {
        insert(&mut p, s)?;
    }
    if let Some(amount) = amount {
        insert(&mut p, amount)?;
    }
    Ok(p)
}

fn insert<T: Serialize>(p: &mut ArrayParams, value: T) -> Result<(), LedgerError> {
    p.insert(value).map_err(|e| LedgerError::Encoding(e.to_string()))
}

fn client_error(e: ClientError) -> LedgerError {
    match e {
        ClientError::Call(obj) => call_error(&obj),
        ClientError::RequestTimeout => LedgerError::Timeout,
        ClientError::ParseError(e) => LedgerError::Encoding(e.to_string()),
        other => LedgerError::Unavailable(other.to_string()),
    }
}

fn typed_data<T: DeserializeOwned>(obj: &ErrorObjectOwned) -> Option<T> {
    obj.data().and_then(|raw| serde_json::from_str(raw.get()).ok())
}

/// Rebuild the ledger error a server-side call failed with.
fn call_error(obj: &ErrorObjectOwned) -> LedgerError {
    let msg = obj.message().to_string();
    match obj.code() {
        RPC_VERIFY_REJECTED => typed_data::<ProgramError>(obj)
            .map(LedgerError::Rejected)
            .unwrap_or(LedgerError::Encoding(msg)),
        RPC_DESERIALIZATION_ERROR => LedgerError::InvalidTransaction(
            typed_data::<CryptoError>(obj).unwrap_or(CryptoError::Serialization(msg)),
        ),
        RPC_VERIFY_ALREADY_IN_CHAIN => LedgerError::DuplicateTransaction(msg),
        RPC_MISC_ERROR => match typed_data::<StoreError>(obj) {
            Some(s) => LedgerError::Store(s),
            None => LedgerError::Unavailable(msg),
        },
        _ => LedgerError::Unavailable(msg),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(s).map_err(|e| LedgerError::Encoding(e.to_string()))
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn read_account(&self, address: &Address) -> Result<Option<Vec<u8>>, LedgerError> {
        let account: Option<AccountJson> = self.call("getaccount", params(&[&address.to_string()], None)?).await?;
        match account {
            Some(a) if !a.data.is_empty() => Ok(Some(decode_hex(&a.data)?)),
            _ => Ok(None),
        }
    }

    async fn native_balance(&self, address: &Address) -> Result<u64, LedgerError> {
        self.call("getbalance", params(&[&address.to_string()], None)?).await
    }

    async fn list_accounts(&self, discriminator: [u8; 8]) -> Result<Vec<(Address, Vec<u8>)>, LedgerError> {
        let accounts: Vec<AccountJson> =
            self.call("listaccounts", params(&[&hex::encode(discriminator)], None)?).await?;
        accounts
            .into_iter()
            .map(|a| {
                let address: Address = a.address.parse().map_err(|e| LedgerError::Encoding(format!("{e}")))?;
                Ok((address, decode_hex(&a.data)?))
            })
            .collect()
    }

    async fn unix_timestamp(&self) -> Result<i64, LedgerError> {
        self.call("gettime", ArrayParams::new()).await
    }

    async fn submit_and_confirm(&self, tx: &SignedTransaction) -> Result<Receipt, LedgerError> {
        let hex_data = tx.to_hex()?;
        self.call("sendtransaction", params(&[&hex_data], None)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ledger_error;

    #[test]
    fn call_errors_roundtrip() {
        let cases = [
            LedgerError::Rejected(ProgramError::NotYetInactive { inactive_at: 9 }),
            LedgerError::InvalidTransaction(CryptoError::VerificationFailed),
            LedgerError::Store(StoreError::Backend("disk".into())),
        ];
        for case in cases {
            assert_eq!(call_error(&ledger_error(case.clone())), case);
        }
    }

    #[test]
    fn duplicate_keeps_message() {
        let obj = ledger_error(LedgerError::DuplicateTransaction("ab".into()));
        assert!(matches!(call_error(&obj), LedgerError::DuplicateTransaction(m) if m.contains("ab")));
    }

    #[test]
    fn unknown_code_is_unavailable() {
        let obj = ErrorObjectOwned::owned(-32000, "boom".to_string(), None::<()>);
        assert!(call_error(&obj).is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        assert_eq!(client_error(ClientError::RequestTimeout), LedgerError::Timeout);
    }
}
